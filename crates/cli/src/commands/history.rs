use std::process::ExitCode;

use reliquary_verifier::ArchiveVerifier;

use crate::OutputFormat;

pub async fn run(
    verifier: &ArchiveVerifier,
    record_number: &str,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let entries = verifier.verification_history(record_number).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            println!("{} verifications of {record_number}:", entries.len());
            for entry in &entries {
                let outcome = match (&entry.error, entry.matched) {
                    (Some(error), _) => format!("ERROR   {error}"),
                    (None, true) => "MATCH".to_owned(),
                    (None, false) => format!(
                        "MISMATCH computed {}",
                        entry.computed_hash.as_deref().unwrap_or("-")
                    ),
                };
                println!(
                    "  {} by {} | {outcome}",
                    entry.verified_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.verified_by,
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

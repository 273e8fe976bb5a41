use std::process::ExitCode;

use reliquary_verifier::ArchiveVerifier;

use crate::OutputFormat;

pub async fn run(
    verifier: &ArchiveVerifier,
    record_number: &str,
    hold: bool,
    actor: &str,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let record = verifier.set_legal_hold(record_number, hold, actor).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            let state = if record.legal_hold { "placed on" } else { "released from" };
            println!(
                "Record {} ({}) {state} legal hold",
                record.record_number, record.filename
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

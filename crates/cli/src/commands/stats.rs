use std::io::Write;
use std::process::ExitCode;

use reliquary_core::RecordStats;
use reliquary_verifier::ArchiveVerifier;

use crate::OutputFormat;

pub async fn run(verifier: &ArchiveVerifier, format: &OutputFormat) -> anyhow::Result<ExitCode> {
    let stats = verifier.get_record_stats().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => render_text(&stats, &mut std::io::stdout().lock())?,
    }
    Ok(ExitCode::SUCCESS)
}

pub fn render_text(stats: &RecordStats, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Total records:   {}", stats.total)?;
    writeln!(out, "Legal hold:      {}", stats.with_legal_hold)?;
    writeln!(out, "Expired:         {}", stats.expired)?;
    writeln!(out, "By status:")?;
    for (status, count) in &stats.by_status {
        writeln!(out, "  {:<9} {count}", status.as_str())?;
    }
    if !stats.by_category.is_empty() {
        writeln!(out, "By category:")?;
        for (category, count) in &stats.by_category {
            writeln!(out, "  {category:<20} {count}")?;
        }
    }
    Ok(())
}

use std::io::Write;
use std::process::ExitCode;

use reliquary_verifier::{ArchiveVerifier, DisposalReport};

use crate::OutputFormat;

/// Per-record failures are reported but never change the exit status.
pub async fn run(
    verifier: &ArchiveVerifier,
    actor: &str,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let report = verifier.dispose_expired_records(actor).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => render_text(&report, &mut std::io::stdout().lock())?,
    }
    Ok(ExitCode::SUCCESS)
}

pub fn render_text(report: &DisposalReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Disposed {} records", report.count())?;
    for disposed in &report.disposed {
        let record = &disposed.record;
        let content = if disposed.content_deleted {
            "content deleted"
        } else {
            "content retained"
        };
        writeln!(
            out,
            "  {} {} [{}] | {content}",
            record.record_number, record.filename, record.category
        )?;
    }
    if report.held_expired > 0 {
        writeln!(
            out,
            "{} expired records kept under legal hold",
            report.held_expired
        )?;
    }
    if !report.failures.is_empty() {
        writeln!(out, "{} records could not be disposed:", report.failures.len())?;
        for failure in &report.failures {
            writeln!(
                out,
                "  {} {} | {}",
                failure.record_number, failure.filename, failure.reason
            )?;
        }
    }
    Ok(())
}

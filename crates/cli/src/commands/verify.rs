use std::io::Write;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use reliquary_verifier::{ArchiveVerifier, VerificationReport};

use crate::{EXIT_PROBLEMS, OutputFormat};

pub async fn run(
    verifier: &ArchiveVerifier,
    actor: &str,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing in-flight records");
            on_interrupt.cancel();
        }
    });

    let report = verifier.verify_all_records_until(actor, &cancel).await;
    interrupt.abort();
    let report = report?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => render_text(&report, &mut std::io::stdout().lock())?,
    }
    Ok(ExitCode::from(exit_status(&report)))
}

/// 0 when every record verified, 1 when any failed, errored, or was skipped.
pub fn exit_status(report: &VerificationReport) -> u8 {
    if report.is_clean() && !report.cancelled {
        0
    } else {
        EXIT_PROBLEMS
    }
}

pub fn render_text(report: &VerificationReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "Verified {} records: {} verified, {} failed, {} errors",
        report.total, report.verified, report.failed, report.errors
    )?;
    if report.cancelled {
        writeln!(out, "Run interrupted: {} records not checked", report.skipped)?;
    }
    for row in report.problems() {
        writeln!(
            out,
            "  {:<7} {} {} | {}",
            row.status.as_str(),
            row.record_number,
            row.filename,
            row.detail.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

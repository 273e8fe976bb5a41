use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{Duration, Utc};

use reliquary_core::NewRecord;
use reliquary_verifier::ArchiveVerifier;

use crate::OutputFormat;

pub struct IngestArgs {
    /// Content path, relative to the configured content root unless absolute.
    pub path: PathBuf,
    pub category: Option<String>,
    pub retention_days: Option<u32>,
    pub record_number: Option<String>,
}

impl IngestArgs {
    fn to_new_record(&self) -> anyhow::Result<NewRecord> {
        let storage_path = self
            .path
            .to_str()
            .with_context(|| format!("path is not valid UTF-8: {}", self.path.display()))?
            .to_owned();

        Ok(NewRecord {
            storage_path,
            category: self
                .category
                .clone()
                .unwrap_or_else(|| "general".to_owned()),
            record_number: self.record_number.clone(),
            retention_expires_at: self
                .retention_days
                .map(|days| Utc::now() + Duration::days(i64::from(days))),
            ..NewRecord::default()
        })
    }
}

pub async fn run(
    verifier: &ArchiveVerifier,
    args: &IngestArgs,
    actor: &str,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let record = verifier.ingest_record(args.to_new_record()?, actor).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("Ingested {} ({})", record.record_number, record.filename);
            println!("  ID:       {}", super::short_id(&record.id));
            println!("  Category: {}", record.category);
            println!("  Digest:   {} {}", record.digest_algorithm, record.original_hash);
            match record.retention_expires_at {
                Some(at) => println!("  Expires:  {}", at.format("%Y-%m-%d")),
                None => println!("  Expires:  never"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

//! Reliquary CLI
//!
//! Verifies archived records against the digests captured at ingestion and
//! disposes of records whose retention period has lapsed.

mod commands;
mod config;
mod store_factory;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

use reliquary_store::StoreError;
use reliquary_verifier::{ArchiveVerifier, FsContentStore, VerifierError};

use crate::config::ReliquaryConfig;
use crate::store_factory::open_store;

/// Exit status for a run that found problems, or for a usage error.
pub const EXIT_PROBLEMS: u8 = 1;
/// Exit status when the archive could not be reached or configured.
pub const EXIT_SYSTEMIC: u8 = 2;

/// Reliquary: verify archived records and enforce retention.
#[derive(Parser, Debug)]
#[command(
    name = "reliquary",
    version,
    about,
    group(
        ArgGroup::new("action")
            .args(["verify", "dispose", "stats", "ingest", "hold", "release", "history"])
            .multiple(false)
    )
)]
struct Cli {
    /// Re-hash every record and compare with its ingestion digest.
    /// Exits 1 if any record failed or errored.
    #[arg(long)]
    verify: bool,

    /// Dispose of expired records that are not under legal hold.
    #[arg(long)]
    dispose: bool,

    /// Print record statistics.
    #[arg(long)]
    stats: bool,

    /// Archive a file as a new record.
    #[arg(long, value_name = "FILE")]
    ingest: Option<PathBuf>,

    /// Category for the ingested record.
    #[arg(long, requires = "ingest")]
    category: Option<String>,

    /// Retention period for the ingested record, in days.
    #[arg(long, requires = "ingest")]
    retention_days: Option<u32>,

    /// Explicit record number for the ingested record.
    #[arg(long, requires = "ingest")]
    record_number: Option<String>,

    /// Place a legal hold on a record.
    #[arg(long, value_name = "RECORD_NUMBER")]
    hold: Option<String>,

    /// Release the legal hold on a record.
    #[arg(long, value_name = "RECORD_NUMBER")]
    release: Option<String>,

    /// Show the verification history of a record.
    #[arg(long, value_name = "RECORD_NUMBER")]
    history: Option<String>,

    /// Path to the TOML configuration file.
    #[arg(long, env = "RELIQUARY_CONFIG", default_value = "reliquary.toml")]
    config: PathBuf,

    /// Who is performing the operation, recorded in the audit trail.
    #[arg(long, env = "RELIQUARY_ACTOR", default_value = "system")]
    actor: String,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Verify,
    Dispose,
    Stats,
    Ingest(PathBuf),
    Hold(String),
    Release(String),
    History(String),
}

impl Action {
    /// Whether the action writes to the archive.
    fn mutates(&self) -> bool {
        !matches!(self, Self::Stats | Self::History(_))
    }
}

impl Cli {
    fn action(&self) -> Option<Action> {
        if self.verify {
            Some(Action::Verify)
        } else if self.dispose {
            Some(Action::Dispose)
        } else if self.stats {
            Some(Action::Stats)
        } else if let Some(path) = &self.ingest {
            Some(Action::Ingest(path.clone()))
        } else if let Some(number) = &self.hold {
            Some(Action::Hold(number.clone()))
        } else if let Some(number) = &self.release {
            Some(Action::Release(number.clone()))
        } else {
            self.history.clone().map(Action::History)
        }
    }
}

/// Failures that happen before the archive can be used.
#[derive(Debug, thiserror::Error)]
enum SetupError {
    #[error("invalid configuration in {path}: {reason}")]
    Config { path: String, reason: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return parse_failure(&e),
    };

    let Some(action) = cli.action() else {
        return match Cli::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: writing usage: {e}");
                ExitCode::from(EXIT_PROBLEMS)
            }
        };
    };

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli, action).await {
        Ok(code) => code,
        Err(e) => {
            let status = exit_status_for(&e);
            if status == EXIT_SYSTEMIC {
                error!(error = %e, "archive unavailable");
            }
            eprintln!("error: {e:#}");
            ExitCode::from(status)
        }
    }
}

/// Help and version go to stdout with status 0; anything else clap rejects
/// is reported with usage and status 1.
fn parse_failure(e: &clap::Error) -> ExitCode {
    if let Err(io) = e.print() {
        eprintln!("error: writing usage: {io}");
    }
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_PROBLEMS),
    }
}

async fn run(cli: &Cli, action: Action) -> anyhow::Result<ExitCode> {
    let config = ReliquaryConfig::load(&cli.config).map_err(|e| SetupError::Config {
        path: cli.config.display().to_string(),
        reason: format!("{e:#}"),
    })?;

    let opened = open_store(&config.store).await?;
    let verifier = ArchiveVerifier::builder()
        .store(Arc::clone(&opened.store))
        .content(Arc::new(FsContentStore::new(&config.archive.content_root)))
        .config(config.archive.verifier_config())
        .build()
        .map_err(|e| SetupError::Config {
            path: cli.config.display().to_string(),
            reason: e.to_string(),
        })?;

    let mutates = action.mutates();
    let actor = cli.actor.as_str();
    let format = &cli.format;

    let result = match action {
        Action::Verify => commands::verify::run(&verifier, actor, format).await,
        Action::Dispose => commands::dispose::run(&verifier, actor, format).await,
        Action::Stats => commands::stats::run(&verifier, format).await,
        Action::Ingest(path) => {
            let args = commands::ingest::IngestArgs {
                path,
                category: cli.category.clone(),
                retention_days: cli.retention_days,
                record_number: cli.record_number.clone(),
            };
            commands::ingest::run(&verifier, &args, actor, format).await
        }
        Action::Hold(number) => commands::hold::run(&verifier, &number, true, actor, format).await,
        Action::Release(number) => {
            commands::hold::run(&verifier, &number, false, actor, format).await
        }
        Action::History(number) => commands::history::run(&verifier, &number, format).await,
    };

    // Whatever a command managed to change is written back, even when it
    // failed part-way.
    if mutates {
        opened.persist().await?;
    }
    result
}

fn exit_status_for(err: &anyhow::Error) -> u8 {
    let systemic = err.downcast_ref::<SetupError>().is_some()
        || err
            .downcast_ref::<VerifierError>()
            .is_some_and(VerifierError::is_systemic)
        || err
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::is_systemic);
    if systemic { EXIT_SYSTEMIC } else { EXIT_PROBLEMS }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("reliquary").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_selects_no_action() {
        assert_eq!(parse(&[]).unwrap().action(), None);
    }

    #[test]
    fn flags_select_actions() {
        assert_eq!(parse(&["--verify"]).unwrap().action(), Some(Action::Verify));
        assert_eq!(parse(&["--dispose"]).unwrap().action(), Some(Action::Dispose));
        assert_eq!(parse(&["--stats"]).unwrap().action(), Some(Action::Stats));
        assert_eq!(
            parse(&["--hold", "MR-1"]).unwrap().action(),
            Some(Action::Hold("MR-1".into()))
        );
        assert_eq!(
            parse(&["--ingest", "a.pdf", "--category", "contract"]).unwrap().action(),
            Some(Action::Ingest(PathBuf::from("a.pdf")))
        );
    }

    #[test]
    fn help_and_version_are_not_failures() {
        let e = parse(&["--help"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::DisplayHelp);
        let e = parse(&["-h"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let e = parse(&["--purge"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn actions_are_exclusive() {
        let e = parse(&["--verify", "--dispose"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn ingest_options_require_ingest() {
        let e = parse(&["--verify", "--category", "contract"]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn only_stats_and_history_are_read_only() {
        assert!(!Action::Stats.mutates());
        assert!(!Action::History("MR-1".into()).mutates());
        assert!(Action::Verify.mutates());
        assert!(Action::Dispose.mutates());
        assert!(Action::Release("MR-1".into()).mutates());
    }

    #[test]
    fn exit_status_classification() {
        let unreachable = anyhow::Error::new(StoreError::Connection("refused".into()));
        assert_eq!(exit_status_for(&unreachable), EXIT_SYSTEMIC);

        let config = anyhow::Error::new(SetupError::Config {
            path: "reliquary.toml".into(),
            reason: "bad digest".into(),
        });
        assert_eq!(exit_status_for(&config), EXIT_SYSTEMIC);

        let missing = anyhow::Error::new(VerifierError::RecordNotFound("MR-404".into()));
        assert_eq!(exit_status_for(&missing), EXIT_PROBLEMS);

        let outage = anyhow::Error::new(VerifierError::Store(StoreError::Backend("down".into())));
        assert_eq!(exit_status_for(&outage), EXIT_SYSTEMIC);
    }
}

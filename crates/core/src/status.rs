use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Outcome of the most recent verification run for a record.
///
/// A record starts out `Pending` and moves to one of the three terminal-looking
/// states on its first verification. None of them is final: every later run
/// overwrites the status with its own outcome.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Never verified since ingestion.
    #[default]
    Pending,
    /// Content hash matched the hash captured at ingestion.
    Verified,
    /// Content hash differs from the ingestion hash (tamper signal).
    Failed,
    /// Content could not be read or hashed (operational failure).
    Error,
}

impl VerificationStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Verified, Self::Failed, Self::Error];

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "VERIFIED" => Ok(Self::Verified),
            "FAILED" => Ok(Self::Failed),
            "ERROR" => Ok(Self::Error),
            _ => Err(CoreError::InvalidStatus(s.to_owned())),
        }
    }
}

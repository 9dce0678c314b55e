//! Process-wide configuration, resolved once at startup and passed into
//! each stage explicitly.

use std::{env, path::PathBuf};

use crate::error::Error;

/// Environment variable holding the UPRN to query.
pub static UPRN_VAR: &str = "SGC_UPRN";

static DEFAULT_OUTPUT: &str = "docs/bin_collections.ics";
static DEFAULT_HORIZON_WEEKS: i64 = 26;
static DEFAULT_ALARM_HOUR: u32 = 17;

/// Everything a single run needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique Property Reference Number identifying the household.
    pub uprn: String,
    /// Where the generated calendar file is written.
    pub output_path: PathBuf,
    /// How many weeks of collections to project.
    pub horizon_weeks: i64,
    /// Hour of the evening before a collection at which the reminder fires.
    pub alarm_hour: u32,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// The UPRN comes from [`UPRN_VAR`] so it is never stored in the code or
    /// in the repository.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_uprn(env::var(UPRN_VAR).ok())
    }

    fn from_uprn(uprn: Option<String>) -> Result<Self, Error> {
        let uprn = uprn.unwrap_or_default().trim().to_string();
        if uprn.is_empty() {
            return Err(Error::MissingUprn);
        }
        Ok(Self {
            uprn,
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            horizon_weeks: DEFAULT_HORIZON_WEEKS,
            alarm_hour: DEFAULT_ALARM_HOUR,
        })
    }

    /// The projection horizon in days.
    pub fn horizon_days(&self) -> i64 {
        self.horizon_weeks * 7
    }
}

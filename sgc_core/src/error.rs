//! Errors that end a run. None of them are retried here; the nightly
//! automation decides whether to try again.

use std::{io, path::PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No UPRN was supplied via the environment.
    #[error("no UPRN supplied, set the SGC_UPRN environment variable")]
    MissingUprn,
    /// Network layer failed or the council API returned an error status.
    #[error("collection lookup failed: {0}")]
    Fetch(#[from] reqwest::Error),
    /// The council response was not the expected JSON shape.
    #[error("could not decode the council response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The council API answered but listed no collection services.
    #[error("the council API returned no collection services, it may have changed")]
    NoCollectionsReturned,
    /// A schedule description did not map to a known collection interval.
    #[error("unrecognized collection frequency {frequency:?} for service {service:?}")]
    UnrecognizedFrequency { service: String, frequency: String },
    /// A non-positive recurrence interval reached the projector.
    #[error("invalid recurrence interval {interval} for service {service:?}")]
    InvalidInterval { service: String, interval: i64 },
    /// The calendar file could not be written or replaced.
    #[error("could not write calendar to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

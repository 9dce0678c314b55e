//! This crate generates a subscribable iCalendar of South Gloucestershire bin collection dates.
//! It fetches the next known collection date per service, projects the recurring schedule
//! forward, and emits one all-day event with a reminder alarm per collection.
//!
//! The dates are read from <https://api.southglos.gov.uk/wastecomp/GetCollectionDetails>.

pub use ical;

pub mod calendar;
pub mod collection_client;
pub mod config;
pub mod error;
pub mod schedule;

pub use error::Error;

//! Projection of collection services onto concrete future collection dates.

use chrono::{Duration, NaiveDate};

use crate::{collection_client::CollectionService, error::Error};

/// A single projected collection date for a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Name of the owning service.
    pub service: String,
    /// Date the collection takes place.
    pub date: NaiveDate,
}

/// Project every service onto its collection dates up to `today + horizon_days`.
///
/// Each service contributes the arithmetic progression starting at its next
/// known collection date and stepping by its interval. A date on the horizon
/// boundary is included. The first date is emitted even when it already lies
/// in the past, so stale upstream data stays visible; the serializer drops
/// duplicates through its stable event ids.
pub fn project(
    services: &[CollectionService],
    today: NaiveDate,
    horizon_days: i64,
) -> Result<Vec<Occurrence>, Error> {
    let end = today + Duration::days(horizon_days);
    let mut occurrences = vec![];
    for service in services {
        if service.interval_days <= 0 {
            return Err(Error::InvalidInterval {
                service: service.name.clone(),
                interval: service.interval_days,
            });
        }
        let mut date = service.next_collection;
        while date <= end {
            occurrences.push(Occurrence {
                service: service.name.clone(),
                date,
            });
            date = date + Duration::days(service.interval_days);
        }
    }
    Ok(occurrences)
}

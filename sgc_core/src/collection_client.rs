//! This client fetches collection details and parses them into collection services.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate};
use reqwest::header::{ACCEPT, ORIGIN, REFERER, USER_AGENT};
use serde::Deserialize;

use crate::error::Error;

static URL: &str = "https://api.southglos.gov.uk/wastecomp/GetCollectionDetails";
static ORIGIN_URL: &str = "https://apps.southglos.gov.uk";
static AGENT: &str = "Mozilla/5.0 (compatible; BinCalendarBot/1.0)";
static TIMEOUT_SECONDS: u64 = 15;

/// A waste stream with a known next collection date and recurrence interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionService {
    /// Display name as reported by the council, e.g. "Refuse".
    pub name: String,
    /// The next collection date known upstream.
    pub next_collection: NaiveDate,
    /// Days between collections, derived from the schedule description.
    pub interval_days: i64,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    value: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    #[serde(default)]
    hso_servicename: String,
    #[serde(default)]
    hso_nextcollection: String,
    #[serde(default)]
    hso_scheduledescription: String,
}

/// Get the collection services for a specific UPRN.
pub async fn get(uprn: &str) -> Result<Vec<CollectionService>, Error> {
    if uprn.trim().is_empty() {
        return Err(Error::MissingUprn);
    }
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(TIMEOUT_SECONDS))
        .build()?;
    let response = client
        .get(URL)
        .query(&[("uprn", uprn)])
        .header(USER_AGENT, AGENT)
        .header(ACCEPT, "application/json")
        .header(ORIGIN, ORIGIN_URL)
        .header(REFERER, format!("{ORIGIN_URL}/"))
        .send()
        .await?
        .error_for_status()?;
    parse(&response.text().await?)
}

/// Parse the council JSON into collection services.
fn parse(body: &str) -> Result<Vec<CollectionService>, Error> {
    let response: CollectionResponse = serde_json::from_str(body)?;
    // The API returns both a Task and a RoundLegInstance entry per service.
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    let mut services: Vec<CollectionService> = vec![];
    for entry in response.value {
        let name = entry.hso_servicename.trim();
        if entry.hso_nextcollection.is_empty() {
            continue;
        }
        let Some(next_collection) = parse_collection_date(&entry.hso_nextcollection) else {
            log::warn!(
                "could not parse date {:?} for service {:?}, skipping",
                entry.hso_nextcollection,
                name
            );
            continue;
        };
        let interval_days = interval_days(name, &entry.hso_scheduledescription)?;
        if !seen.insert((name.to_string(), next_collection)) {
            continue;
        }
        services.push(CollectionService {
            name: name.to_string(),
            next_collection,
            interval_days,
        });
    }
    if services.is_empty() {
        return Err(Error::NoCollectionsReturned);
    }
    services.sort_by_key(|service| service.next_collection);
    Ok(services)
}

/// Parse a next collection date.
///
/// The date arrives as e.g. `2026-02-23T00:00:00+00:00`, but a bare date
/// prefix is tolerated too.
fn parse_collection_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    raw.get(0..10).and_then(|prefix| prefix.parse::<NaiveDate>().ok())
}

/// Map a schedule description like "Monday every other week" to an interval in days.
fn interval_days(service: &str, schedule: &str) -> Result<i64, Error> {
    let schedule_lower = schedule.to_lowercase();
    match () {
        _ if schedule_lower.contains("every other week") => Ok(14),
        _ if schedule_lower.contains("every week") => Ok(7),
        _ => Err(Error::UnrecognizedFrequency {
            service: service.to_string(),
            frequency: schedule.to_string(),
        }),
    }
}

//! Building the iCalendar document and replacing the published file.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use bitmask_enum::bitmask;
use chrono::NaiveDate;
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEventBuilder, Property},
    ical_param, ical_property,
    parser::ical::component::IcalAlarm,
};
use regex::Regex;

use crate::{error::Error, schedule::Occurrence};

static PROD_ID: &str = "-//SGC Bin Calendar//EN";
static CALENDAR_NAME: &str = "South Glos Bin Collections";
static TIMEZONE: &str = "Europe/London";
static FORMAT: &str = "%Y%m%d";

#[bitmask]
pub enum ServiceBitmask {
    Refuse,
    Recycling,
    Food,
    Garden,
}

/// Build the calendar from projected occurrences.
///
/// Occurrences of excluded services are dropped, as are duplicates of an
/// already seen (service, date) pair. Everything in the output is derived
/// from the arguments, so identical inputs emit identical text.
pub fn build(
    occurrences: &[Occurrence],
    today: NaiveDate,
    excluded_services: ServiceBitmask,
    alarm_hour: u32,
) -> IcalCalendar {
    let changed = format!("{}T000000Z", today.format(FORMAT));
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    calendar.properties.push(ical_property!("METHOD", "PUBLISH"));
    calendar
        .properties
        .push(ical_property!("X-WR-CALNAME", CALENDAR_NAME));
    calendar
        .properties
        .push(ical_property!("X-WR-TIMEZONE", TIMEZONE));
    calendar
        .properties
        .push(ical_property!("X-PUBLISHED-TTL", "P1D"));
    calendar.properties.push(ical_property!(
        "REFRESH-INTERVAL",
        "P1D",
        ical_param!("VALUE", "DURATION")
    ));
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();
    for occurrence in occurrences {
        if service_flag(&occurrence.service)
            .is_some_and(|flag| excluded_services.contains(flag))
        {
            continue;
        }
        if !seen.insert((occurrence.service.clone(), occurrence.date)) {
            continue;
        }
        let summary = summary(&occurrence.service);
        let mut event = IcalEventBuilder::tzid(TIMEZONE)
            .uid(uid(&occurrence.service, &occurrence.date))
            .changed(&changed)
            .one_day(occurrence.date.format(FORMAT).to_string())
            .set(ical_property!("SUMMARY", &summary))
            .set(ical_property!("DESCRIPTION", "Put your bin out by 7am."))
            .set(ical_property!("TRANSP", "TRANSPARENT"))
            .build();
        event.alarms.push(alarm(&summary, alarm_hour));
        calendar.events.push(event);
    }
    calendar
}

/// Write the calendar text, replacing any previous file in one step.
///
/// The content goes to a sibling temporary path first and is renamed over
/// the target, so a polling calendar client never sees a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), Error> {
    let write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);
    fs::write(&temporary, contents).map_err(write_error)?;
    fs::rename(&temporary, path).map_err(write_error)?;
    Ok(())
}

/// Human-readable event title for a service.
fn summary(service: &str) -> String {
    let service_upper = service.to_uppercase();
    match () {
        _ if service_upper.contains("REFUSE") => String::from("🗑️ Refuse (black bin) collection"),
        _ if service_upper.contains("RECYCLING") => String::from("♻️ Recycling collection"),
        _ if service_upper.contains("FOOD") => String::from("🍎 Food waste collection"),
        _ if service_upper.contains("GARDEN") => String::from("🌿 Garden waste collection"),
        _ => format!("🗑 {service} collection"),
    }
}

/// Map a service to its exclusion flag. Unknown services are never excluded.
fn service_flag(service: &str) -> Option<ServiceBitmask> {
    let service_upper = service.to_uppercase();
    match () {
        _ if service_upper.contains("REFUSE") => Some(ServiceBitmask::Refuse),
        _ if service_upper.contains("RECYCLING") => Some(ServiceBitmask::Recycling),
        _ if service_upper.contains("FOOD") => Some(ServiceBitmask::Food),
        _ if service_upper.contains("GARDEN") => Some(ServiceBitmask::Garden),
        _ => None,
    }
}

/// Get a unique id for a specific collection service on a specific date.
///
/// Calendar apps update rather than duplicate events with a known id, so
/// regenerating the file from unchanged data is idempotent.
/// Changing this function is a breaking change!
fn uid(service: &str, date: &NaiveDate) -> String {
    let whitespace_regex = Regex::new(r"\s+").unwrap();
    let service = whitespace_regex.replace_all(service.trim(), "-");
    format!("{}-{date}@southglos-bins", service.to_lowercase())
}

/// Build the reminder fired the evening before a collection.
fn alarm(summary: &str, alarm_hour: u32) -> IcalAlarm {
    // TRIGGER is relative to the event's midnight start, so 17:00 the
    // evening before is seven hours before DTSTART.
    let hours_before = 24 - alarm_hour % 24;
    let mut alarm = IcalAlarm::new();
    alarm.properties.push(ical_property!("ACTION", "DISPLAY"));
    alarm
        .properties
        .push(ical_property!("TRIGGER", format!("-PT{hours_before}H")));
    alarm
        .properties
        .push(ical_property!("DESCRIPTION", format!("Tomorrow: {summary}")));
    alarm
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufReader, Cursor},
        str::FromStr,
    };

    use chrono::NaiveDate;
    use ical::{
        generator::{Emitter, IcalCalendar, IcalEvent},
        IcalParser,
    };

    use crate::{
        calendar::{build, uid, write_atomic, ServiceBitmask},
        error::Error,
        schedule::Occurrence,
    };

    fn occurrence(service: &str, date: &str) -> Occurrence {
        Occurrence {
            service: service.to_string(),
            date: NaiveDate::from_str(date).unwrap(),
        }
    }

    fn get_test_occurrences() -> Vec<Occurrence> {
        vec![
            occurrence("Refuse", "2024-06-03"),
            occurrence("Refuse", "2024-06-17"),
            occurrence("Recycling", "2024-06-03"),
            occurrence("Recycling", "2024-06-10"),
            occurrence("Food", "2024-06-03"),
            occurrence("Garden Waste", "2024-06-05"),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_str("2024-06-01").unwrap()
    }

    fn find_event<'a>(calendar: &'a IcalCalendar, summary: &str) -> Option<&'a IcalEvent> {
        calendar.events.iter().find(|event| {
            event
                .properties
                .iter()
                .any(|property| {
                    property.name == "SUMMARY"
                        && property
                            .value
                            .as_ref()
                            .is_some_and(|value| value == summary)
                })
        })
    }

    fn get_property_value_of_event<'a>(
        calendar: &'a IcalCalendar,
        property_name: &str,
        summary: &str,
    ) -> &'a str {
        find_event(calendar, summary)
            .unwrap()
            .properties
            .iter()
            .find(|property| property.name == property_name)
            .unwrap()
            .value
            .as_ref()
            .unwrap()
    }

    #[test]
    fn test_build() {
        let calendar = build(&get_test_occurrences(), today(), ServiceBitmask::none(), 17);
        assert_eq!(calendar.events.len(), 6);
        let refuse_dtstart =
            get_property_value_of_event(&calendar, "DTSTART", "🗑️ Refuse (black bin) collection");
        assert_eq!(refuse_dtstart, "20240603");
        let garden_uid =
            get_property_value_of_event(&calendar, "UID", "🌿 Garden waste collection");
        assert_eq!(garden_uid, "garden-waste-2024-06-05@southglos-bins");
    }

    #[test]
    fn test_build_deduplicates() {
        let mut occurrences = get_test_occurrences();
        occurrences.push(occurrence("Refuse", "2024-06-03"));
        let calendar = build(&occurrences, today(), ServiceBitmask::none(), 17);
        assert_eq!(calendar.events.len(), 6);
    }

    #[test]
    fn test_build_exclusion() {
        let occurrences = get_test_occurrences();
        let calendar = build(&occurrences, today(), ServiceBitmask::Garden, 17);
        assert_eq!(calendar.events.len(), 5);
        assert!(find_event(&calendar, "🌿 Garden waste collection").is_none());

        let calendar = build(
            &occurrences,
            today(),
            ServiceBitmask::Refuse | ServiceBitmask::Recycling,
            17,
        );
        assert_eq!(calendar.events.len(), 2);
        assert!(find_event(&calendar, "🗑️ Refuse (black bin) collection").is_none());
        assert!(find_event(&calendar, "♻️ Recycling collection").is_none());
    }

    #[test]
    fn test_build_is_idempotent() {
        let occurrences = get_test_occurrences();
        let first = build(&occurrences, today(), ServiceBitmask::none(), 17).generate();
        let second = build(&occurrences, today(), ServiceBitmask::none(), 17).generate();
        assert_eq!(first, second);
    }

    /// Re-parse the generated text and compare it against the input.
    #[test]
    fn test_round_trip() {
        let occurrences = get_test_occurrences();
        let generated = build(&occurrences, today(), ServiceBitmask::none(), 17).generate();
        let parser = IcalParser::new(BufReader::new(Cursor::new(generated)));
        let mut dates: Vec<NaiveDate> = vec![];
        for ical_calendar_result in parser {
            let ical_calendar = ical_calendar_result.unwrap();
            for ical_event in ical_calendar.events {
                let dtstart = ical_event
                    .properties
                    .iter()
                    .find(|property| property.name == "DTSTART")
                    .unwrap()
                    .value
                    .clone()
                    .unwrap();
                dates.push(
                    NaiveDate::from_ymd_opt(
                        dtstart[0..4].parse().unwrap(),
                        dtstart[4..6].parse().unwrap(),
                        dtstart[6..8].parse().unwrap(),
                    )
                    .unwrap(),
                );
                assert_eq!(ical_event.alarms.len(), 1);
                let trigger = ical_event.alarms[0]
                    .properties
                    .iter()
                    .find(|property| property.name == "TRIGGER")
                    .unwrap()
                    .value
                    .clone()
                    .unwrap();
                assert_eq!(trigger, "-PT7H");
            }
        }
        let expected: Vec<NaiveDate> = occurrences
            .iter()
            .map(|occurrence| occurrence.date)
            .collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn test_uid_is_stable() {
        let date = NaiveDate::from_str("2024-06-03").unwrap();
        assert_eq!(uid("Refuse", &date), "refuse-2024-06-03@southglos-bins");
        assert_eq!(
            uid(" Garden Waste ", &date),
            "garden-waste-2024-06-03@southglos-bins"
        );
        assert_eq!(uid("Refuse", &date), uid("Refuse", &date));
    }

    #[test]
    fn test_write_atomic() {
        let path = std::env::temp_dir().join("sgc_calendar_write_test.ics");
        write_atomic(&path, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"
        );
        write_atomic(&path, "replaced").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "replaced");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_atomic_failure() {
        let blocker = std::env::temp_dir().join("sgc_calendar_blocker_test");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("calendar.ics");
        assert!(matches!(
            write_atomic(&path, "data"),
            Err(Error::Write { .. })
        ));
        std::fs::remove_file(&blocker).unwrap();
    }
}

//! Nightly batch run: fetch the collection schedule, project it forward,
//! and replace the published calendar file.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use sgc_core::{
    calendar::{self, ServiceBitmask},
    collection_client,
    config::Config,
    ical::generator::Emitter,
    schedule,
};

#[derive(Debug, Parser)]
pub struct Arguments {
    /// write the calendar to this path instead of the default
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// project this many weeks of collections
    #[arg(long)]
    pub horizon_weeks: Option<i64>,
    /// fire the reminder at this hour of the evening before a collection
    #[arg(long)]
    pub alarm_hour: Option<u32>,
    /// exclude refuse collection dates
    #[arg(long)]
    pub exclude_refuse: bool,
    /// exclude recycling collection dates
    #[arg(long)]
    pub exclude_recycling: bool,
    /// exclude food waste collection dates
    #[arg(long)]
    pub exclude_food: bool,
    /// exclude garden waste collection dates
    #[arg(long)]
    pub exclude_garden: bool,
}

impl From<&Arguments> for ServiceBitmask {
    fn from(value: &Arguments) -> Self {
        let mut service_bitmask = ServiceBitmask::none();
        if value.exclude_refuse {
            service_bitmask |= ServiceBitmask::Refuse;
        }
        if value.exclude_recycling {
            service_bitmask |= ServiceBitmask::Recycling;
        }
        if value.exclude_food {
            service_bitmask |= ServiceBitmask::Food;
        }
        if value.exclude_garden {
            service_bitmask |= ServiceBitmask::Garden;
        }
        service_bitmask
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Arguments::parse();
    let mut config = Config::from_env()?;
    if let Some(output) = args.output.clone() {
        config.output_path = output;
    }
    if let Some(horizon_weeks) = args.horizon_weeks {
        config.horizon_weeks = horizon_weeks;
    }
    if let Some(alarm_hour) = args.alarm_hour {
        config.alarm_hour = alarm_hour;
    }
    log::info!("fetching collection dates for UPRN {}", config.uprn);
    let services = collection_client::get(&config.uprn).await?;
    log::info!("found {} collection service(s)", services.len());
    let today = Local::now().date_naive();
    let occurrences = schedule::project(&services, today, config.horizon_days())?;
    let calendar = calendar::build(
        &occurrences,
        today,
        ServiceBitmask::from(&args),
        config.alarm_hour,
    );
    calendar::write_atomic(&config.output_path, &calendar.generate())?;
    log::info!("calendar written to {}", config.output_path.display());
    Ok(())
}

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use focusdaily_core::SessionStore;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's aggregate
    Today,
    /// Aggregate for one local calendar day
    Day {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SessionStore::open()?;

    let date = match action {
        StatsAction::Today => Local::now().date_naive(),
        StatsAction::Day { date } => date,
    };
    let aggregate = store.daily_aggregate(date)?;
    println!("{}", serde_json::to_string_pretty(&aggregate)?);
    Ok(())
}

use std::error::Error;

use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use journey_planner::domain::FareTable;
use journey_planner::planner::{JourneyPlanner, JourneyQuery, SearchConfig};
use journey_planner::sample::{
    REFERENCE_DEPARTURE, REFERENCE_DESTINATION, REFERENCE_ORIGIN, gangnam_with,
};

const DEFAULT_LEVEL: &str = "info";

fn init_logger() {
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|err| {
        eprintln!(
            "invalid {}, falling back to level '{DEFAULT_LEVEL}' - {err}",
            EnvFilter::DEFAULT_ENV
        );
        EnvFilter::new(DEFAULT_LEVEL)
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger();

    let config = SearchConfig::default();
    let sample = gangnam_with(&config)?;
    info!(network = %sample.index.summary(), docks = sample.stations.len(), "sample loaded");

    let fares = FareTable::default();
    let planner = JourneyPlanner::new(
        &sample.index,
        &sample.road,
        &sample.stations,
        &config,
        &fares,
    )?;

    let query = JourneyQuery::new(REFERENCE_ORIGIN, REFERENCE_DESTINATION, REFERENCE_DEPARTURE);
    let result = planner.plan(&query)?;

    for (i, journey) in result.journeys.iter().enumerate() {
        println!(
            "{}. {} {} -> {}, {} min, {} KRW, {} transfers",
            i + 1,
            journey.category(),
            journey.departure_time(),
            journey.arrival_time(),
            journey.total_time_mins(),
            journey.total_cost(),
            journey.total_transfers(),
        );
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

//! The query facade.
//!
//! [`JourneyPlanner`] borrows the shared network, road graph and bike
//! inventory, runs every mode generator and the transit engine for a
//! query, and hands the combined candidates to the selector.

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Coord, FareTable, Journey, TimeOfDay};
use crate::network::{BikeStation, NetworkError, NetworkIndex};
use crate::spatial::RoadGraph;

use super::access::resolve;
use super::config::{Preferences, SearchConfig};
use super::modes::{self, PlanContext};
use super::rank::{ResultSummary, select_journeys};
use super::raptor::Raptor;

/// Error from planner construction or a query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    /// The transit network could not be indexed
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The road graph has no nodes
    #[error("road graph is empty")]
    EmptyRoadGraph,

    /// Query parameters out of range
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// A door-to-door query.
#[derive(Debug, Clone)]
pub struct JourneyQuery {
    pub origin: Coord,
    pub destination: Coord,
    pub departure: TimeOfDay,
    /// Upper bound on returned journeys.
    pub max_routes: usize,
    /// Whether bike-only, bike access and bike+transit journeys are tried.
    pub include_bike: bool,
    pub preferences: Preferences,
}

impl JourneyQuery {
    /// A query returning up to five journeys, bikes included, with default
    /// preferences.
    pub fn new(origin: Coord, destination: Coord, departure: TimeOfDay) -> Self {
        Self {
            origin,
            destination,
            departure,
            max_routes: 5,
            include_bike: true,
            preferences: Preferences::default(),
        }
    }

    pub fn max_routes(mut self, max_routes: usize) -> Self {
        self.max_routes = max_routes;
        self
    }

    pub fn include_bike(mut self, include_bike: bool) -> Self {
        self.include_bike = include_bike;
        self
    }

    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Validate the query.
    pub fn validate(&self) -> Result<(), PlannerError> {
        for (what, point) in [("origin", self.origin), ("destination", self.destination)] {
            Coord::checked(point.lat, point.lon)
                .map_err(|e| PlannerError::InvalidQuery(format!("{what}: {e}")))?;
        }

        if self.max_routes == 0 {
            return Err(PlannerError::InvalidQuery(
                "max_routes must be at least 1".to_string(),
            ));
        }

        let prefs = &self.preferences;
        for (what, weight) in [
            ("time_weight", prefs.time_weight),
            ("cost_weight", prefs.cost_weight),
            ("transfer_weight", prefs.transfer_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PlannerError::InvalidQuery(format!(
                    "{what} must be a non-negative number"
                )));
            }
        }

        Ok(())
    }
}

/// Result of a query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Selected journeys, best first.
    pub journeys: Vec<Journey>,
    pub summary: ResultSummary,
    /// Transit engine rounds run (zero when no stop was in reach).
    pub rounds: usize,
    /// Candidates produced by all modes before selection.
    pub candidates: usize,
}

/// Multi-modal journey planner over shared, read-only inputs.
///
/// Holds no per-query state, so one planner can serve queries from several
/// threads at once.
pub struct JourneyPlanner<'a> {
    index: &'a NetworkIndex,
    road: &'a RoadGraph,
    stations: &'a [BikeStation],
    config: &'a SearchConfig,
    fares: &'a FareTable,
}

impl<'a> JourneyPlanner<'a> {
    /// Create a planner.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::EmptyRoadGraph`] if `road` has no nodes.
    pub fn new(
        index: &'a NetworkIndex,
        road: &'a RoadGraph,
        stations: &'a [BikeStation],
        config: &'a SearchConfig,
        fares: &'a FareTable,
    ) -> Result<Self, PlannerError> {
        if road.is_empty() {
            return Err(PlannerError::EmptyRoadGraph);
        }
        Ok(Self {
            index,
            road,
            stations,
            config,
            fares,
        })
    }

    /// Selected journeys for `query`, best first.
    ///
    /// An unreachable destination gives an empty list.
    pub fn find_journeys(&self, query: &JourneyQuery) -> Result<Vec<Journey>, PlannerError> {
        Ok(self.plan(query)?.journeys)
    }

    /// Run a query and report what the search did along with the journeys.
    pub fn plan(&self, query: &JourneyQuery) -> Result<SearchResult, PlannerError> {
        query.validate()?;

        let ctx = PlanContext {
            index: self.index,
            road: self.road,
            stations: self.stations,
            config: self.config,
            fares: self.fares,
        };
        let prefs = &query.preferences;
        let (origin, destination, departure) = (query.origin, query.destination, query.departure);

        let mut candidates = modes::walk_only(&ctx, origin, destination, departure, prefs);
        if query.include_bike {
            candidates.extend(modes::bike_only(&ctx, origin, destination, departure));
        }

        let bikes = query.include_bike;
        let access = resolve(self.index, self.stations, origin, bikes, prefs, self.config);
        let egress = resolve(self.index, self.stations, destination, bikes, prefs, self.config);
        debug!(access = access.len(), egress = egress.len(), "access resolved");

        let mut rounds = 0;
        if !access.is_empty() && !egress.is_empty() {
            let raptor = Raptor::new(self.index, self.fares, self.config);
            let outcome = raptor.run(departure, &access, &egress);
            candidates.extend(outcome.candidates.iter().filter_map(|candidate| {
                modes::transit_journey(
                    &ctx,
                    candidate,
                    &access,
                    &egress,
                    origin,
                    destination,
                    departure,
                )
            }));
            rounds = outcome.rounds.len();
        }

        if query.include_bike {
            candidates.extend(modes::mixed(&ctx, origin, destination, departure));
        }

        let total = candidates.len();
        let journeys = select_journeys(candidates, prefs, query.max_routes);
        let summary = ResultSummary::from_journeys(&journeys);

        info!(
            %departure,
            candidates = total,
            rounds,
            selected = journeys.len(),
            "journey query complete"
        );

        Ok(SearchResult {
            journeys,
            summary,
            rounds,
            candidates: total,
        })
    }
}

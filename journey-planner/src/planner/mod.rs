//! Multi-modal journey planning.
//!
//! This module answers: "I'm at this point at this time - how can I get to
//! that point?" Candidates come from four places: a direct walk, a bike
//! ride between docks, bike-then-transit combinations, and a round-based
//! transit search seeded from the stops the rider can reach on foot or by
//! bike. The selector then reduces them to a short, varied list.

mod access;
mod config;
mod modes;
mod rank;
mod raptor;
mod search;

#[cfg(test)]
mod search_tests;

pub use access::{AccessLeg, AccessMode, BikeHop, resolve};
pub use config::{Preferences, SearchConfig};
pub use modes::{DirectRoute, direct_routes};
pub use rank::{
    ResultSummary, are_similar, best_per_category, diversify, remove_similar, score,
    select_journeys,
};
pub use raptor::{Hop, Label, Raptor, RaptorOutcome, RoundStats, TransitCandidate, dominates};
pub use search::{JourneyPlanner, JourneyQuery, PlannerError, SearchResult};

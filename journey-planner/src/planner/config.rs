//! Search configuration for the journey planner.
//!
//! [`SearchConfig`] holds the network-wide tuning constants: speeds, search
//! radii, per-mode ceilings and the round cap. [`Preferences`] holds what a
//! rider may change per query. Both deserialize from partial JSON, with
//! missing fields taking their defaults.

use serde::{Deserialize, Serialize};

use crate::spatial::Profile;

/// Configuration parameters for journey search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of vehicle changes. The engine runs one more round
    /// than this.
    pub max_transfers: usize,

    /// Minimum time between reaching a stop and boarding there (minutes).
    pub boarding_buffer_mins: u32,

    /// A label with fewer transfers replaces one arriving up to this many
    /// minutes earlier.
    pub transfer_tolerance_mins: u32,

    pub walk_speed_kmh: f64,
    pub bike_speed_kmh: f64,

    /// Time to unlock or dock a bike (minutes, each).
    pub bike_dock_mins: u32,

    /// Bike stations considered for access and egress.
    pub access_bike_stations: usize,
    pub access_bike_radius_km: f64,
    /// Stops considered around each access bike station.
    pub access_stops_per_station: usize,
    pub station_stop_radius_km: f64,

    /// Walk-only journeys are tried below this straight-line distance.
    pub walk_only_max_km: f64,

    /// Bike stations considered at each end of a bike-only journey.
    pub bike_only_stations: usize,
    pub bike_only_radius_km: f64,
    pub bike_only_max_mins: u32,
    /// Lower bounds on bike-only legs (minutes).
    pub min_walk_leg_mins: u32,
    pub min_bike_leg_mins: u32,

    pub mixed_stations: usize,
    pub mixed_station_radius_km: f64,
    pub mixed_stops_per_station: usize,
    pub mixed_destination_stops: usize,
    pub mixed_destination_radius_km: f64,
    /// Estimated ride time per pattern position on a direct route (minutes).
    pub mixed_mins_per_stop: u32,
    pub mixed_options_per_stop: usize,
    pub mixed_max_mins: u32,

    /// Stops closer than this get a transfer edge.
    pub transfer_radius_km: f64,
}

impl SearchConfig {
    /// Create a configuration allowing `max_transfers` vehicle changes,
    /// with every other field at its default.
    pub fn new(max_transfers: usize) -> Self {
        Self {
            max_transfers,
            ..Self::default()
        }
    }

    /// Number of engine rounds after the access round.
    pub fn max_rounds(&self) -> usize {
        self.max_transfers + 1
    }

    /// Minutes to walk `distance_km` in a straight line.
    pub fn walk_minutes(&self, distance_km: f64) -> f64 {
        distance_km / self.walk_speed_kmh * 60.0
    }

    /// Minutes to cycle `distance_km` in a straight line.
    pub fn bike_minutes(&self, distance_km: f64) -> f64 {
        distance_km / self.bike_speed_kmh * 60.0
    }

    /// Road profile for walking at the configured speed.
    pub fn walk_profile(&self) -> Profile {
        Profile::Walk {
            speed_kmh: self.walk_speed_kmh,
        }
    }

    /// Road profile for cycling at the configured speed.
    pub fn bike_profile(&self) -> Profile {
        Profile::Bike {
            speed_kmh: self.bike_speed_kmh,
        }
    }

    /// Distance walkable in `minutes`.
    pub fn walk_reach_km(&self, minutes: u32) -> f64 {
        f64::from(minutes) / 60.0 * self.walk_speed_kmh
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_transfers: 4,
            boarding_buffer_mins: 1,
            transfer_tolerance_mins: 5,
            walk_speed_kmh: 4.5,
            bike_speed_kmh: 12.0,
            bike_dock_mins: 2,
            access_bike_stations: 3,
            access_bike_radius_km: 0.5,
            access_stops_per_station: 2,
            station_stop_radius_km: 0.3,
            walk_only_max_km: 2.0,
            bike_only_stations: 3,
            bike_only_radius_km: 0.5,
            bike_only_max_mins: 45,
            min_walk_leg_mins: 2,
            min_bike_leg_mins: 5,
            mixed_stations: 5,
            mixed_station_radius_km: 0.8,
            mixed_stops_per_station: 3,
            mixed_destination_stops: 5,
            mixed_destination_radius_km: 0.8,
            mixed_mins_per_stop: 2,
            mixed_options_per_stop: 3,
            mixed_max_mins: 60,
            transfer_radius_km: 0.3,
        }
    }
}

/// Per-query rider preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Score weight of total time.
    pub time_weight: f64,
    /// Score weight of total cost.
    pub cost_weight: f64,
    /// Score weight of transfer count.
    pub transfer_weight: f64,
    /// Longest acceptable walk, for walk-only journeys and walk access.
    pub max_walk_mins: u32,
    /// Longest acceptable bike access or egress.
    pub max_bike_mins: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            time_weight: 0.5,
            cost_weight: 0.2,
            transfer_weight: 0.3,
            max_walk_mins: 15,
            max_bike_mins: 20,
        }
    }
}

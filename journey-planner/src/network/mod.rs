//! Network index over stops, routes, trips and transfers.
//!
//! Loaders hand over typed records; [`NetworkIndex::build`] validates them
//! once, drops malformed entries, and produces the read-only lookup
//! structures the planner queries:
//!
//! - stop → routes serving it
//! - route → trips sorted by first departure
//! - stop → fixed-time transfers
//!
//! Each route carries a single canonical stop pattern. Routes whose trips
//! branch are flattened to one representative pattern, so stops that only
//! appear on a minority branch are not reachable through that route.

mod transfers;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::domain::{BikeStationId, Coord, RouteId, RouteType, StopId, TimeOfDay, TripId};

pub use transfers::{
    MAX_TRANSFER_MINS, MIN_TRANSFER_MINS, Transfer, TransferEdge, TransferEdges, transfer_minutes,
};

/// Errors raised while building the network index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// No route survived validation
    #[error("network has no usable routes")]
    EmptyNetwork,
}

/// A stop as supplied by the timetable loader.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub id: StopId,
    pub name: String,
    pub coord: Coord,
}

/// A route as supplied by the timetable loader.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub id: RouteId,
    pub name: String,
    pub route_type: RouteType,
    /// Canonical stop order, see [`canonical_pattern`].
    pub pattern: Vec<StopId>,
}

/// One scheduled call of a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    pub stop: StopId,
    pub arrival: TimeOfDay,
    pub departure: TimeOfDay,
    pub sequence: u32,
}

/// A trip as supplied by the timetable loader.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub id: TripId,
    pub route: RouteId,
    pub stop_times: Vec<StopTime>,
}

/// A bike rental station.
///
/// Capacity is informational only; stations are assumed to always have a
/// bike and a free dock.
#[derive(Debug, Clone, PartialEq)]
pub struct BikeStation {
    pub id: BikeStationId,
    pub name: String,
    pub coord: Coord,
    pub capacity: u32,
}

/// An indexed stop.
#[derive(Debug, Clone)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub coord: Coord,
    routes: BTreeSet<RouteId>,
}

impl Stop {
    /// Routes whose pattern includes this stop.
    pub fn routes(&self) -> &BTreeSet<RouteId> {
        &self.routes
    }
}

/// An indexed route.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub route_type: RouteType,
    pattern: Vec<StopId>,
    positions: HashMap<StopId, usize>,
}

impl Route {
    /// Canonical stop order of the route.
    pub fn pattern(&self) -> &[StopId] {
        &self.pattern
    }

    /// Index of `stop` in the pattern (first occurrence).
    pub fn position(&self, stop: &StopId) -> Option<usize> {
        self.positions.get(stop).copied()
    }

    /// Rider-facing label, e.g. "Subway Line 2" or "Bus 146".
    pub fn label(&self) -> String {
        match self.route_type {
            RouteType::Subway => format!("Subway {}", self.name),
            RouteType::Bus => {
                let number: String = self
                    .name
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                if number.is_empty() {
                    format!("Bus {}", self.name)
                } else {
                    format!("Bus {number}")
                }
            }
        }
    }
}

/// An indexed trip with stop-times in sequence order.
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: TripId,
    pub route: RouteId,
    stop_times: Vec<StopTime>,
}

impl Trip {
    pub fn stop_times(&self) -> &[StopTime] {
        &self.stop_times
    }

    /// Departure from the first stop.
    pub fn first_departure(&self) -> TimeOfDay {
        // Safe: trips with fewer than two stop-times are dropped at build
        self.stop_times[0].departure
    }

    /// First call at `stop`, with its index in the trip.
    pub fn call_at(&self, stop: &StopId) -> Option<(usize, &StopTime)> {
        self.stop_times
            .iter()
            .enumerate()
            .find(|(_, st)| &st.stop == stop)
    }
}

/// Counts describing a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub stops: usize,
    pub subway_routes: usize,
    pub bus_routes: usize,
    pub trips: usize,
    pub transfer_pairs: usize,
}

impl fmt::Display for NetworkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stops, {} subway + {} bus routes, {} trips, {} transfer pairs",
            self.stops, self.subway_routes, self.bus_routes, self.trips, self.transfer_pairs
        )
    }
}

/// Immutable lookup structures over the transit network.
#[derive(Debug, Clone)]
pub struct NetworkIndex {
    stops: HashMap<StopId, Stop>,
    routes: HashMap<RouteId, Route>,
    trips: HashMap<TripId, Trip>,
    route_trips: HashMap<RouteId, Vec<TripId>>,
    transfers: TransferEdges,
}

impl NetworkIndex {
    /// Build the index from loader records.
    ///
    /// Malformed records are dropped rather than reported:
    ///
    /// - pattern stops that are not in `stops` are removed; a route whose
    ///   pattern ends up empty is dropped
    /// - trips of unknown routes are dropped
    /// - stop-times are sorted by sequence and calls at unknown stops are
    ///   removed; a trip left with fewer than two calls, or whose times
    ///   decrease along the sequence, is dropped
    /// - transfers touching unknown stops are dropped
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::EmptyNetwork`] if no route survives.
    pub fn build(
        stops: Vec<StopRecord>,
        routes: Vec<RouteRecord>,
        trips: Vec<TripRecord>,
        transfers: Vec<TransferEdge>,
    ) -> Result<Self, NetworkError> {
        let mut stop_map: HashMap<StopId, Stop> = stops
            .into_iter()
            .map(|s| {
                (
                    s.id.clone(),
                    Stop {
                        id: s.id,
                        name: s.name,
                        coord: s.coord,
                        routes: BTreeSet::new(),
                    },
                )
            })
            .collect();

        let mut route_map = HashMap::with_capacity(routes.len());
        for record in routes {
            let pattern: Vec<StopId> = record
                .pattern
                .into_iter()
                .filter(|s| stop_map.contains_key(s))
                .collect();

            if pattern.is_empty() {
                debug!(route = %record.id, "dropping route with empty pattern");
                continue;
            }

            let mut positions = HashMap::with_capacity(pattern.len());
            for (idx, stop) in pattern.iter().enumerate() {
                positions.entry(stop.clone()).or_insert(idx);
                if let Some(s) = stop_map.get_mut(stop) {
                    s.routes.insert(record.id.clone());
                }
            }

            route_map.insert(
                record.id.clone(),
                Route {
                    id: record.id,
                    name: record.name,
                    route_type: record.route_type,
                    pattern,
                    positions,
                },
            );
        }

        if route_map.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }

        let mut trip_map = HashMap::with_capacity(trips.len());
        let mut route_trips: HashMap<RouteId, Vec<TripId>> = HashMap::new();
        for record in trips {
            if !route_map.contains_key(&record.route) {
                debug!(trip = %record.id, route = %record.route, "dropping trip of unknown route");
                continue;
            }

            let mut stop_times: Vec<StopTime> = record
                .stop_times
                .into_iter()
                .filter(|st| stop_map.contains_key(&st.stop))
                .collect();
            stop_times.sort_by_key(|st| st.sequence);

            if stop_times.len() < 2 {
                debug!(trip = %record.id, "dropping trip with fewer than two stop-times");
                continue;
            }
            if !times_non_decreasing(&stop_times) {
                debug!(trip = %record.id, "dropping trip whose times decrease");
                continue;
            }

            route_trips
                .entry(record.route.clone())
                .or_default()
                .push(record.id.clone());
            trip_map.insert(
                record.id.clone(),
                Trip {
                    id: record.id,
                    route: record.route,
                    stop_times,
                },
            );
        }

        for ids in route_trips.values_mut() {
            ids.sort_by(|a, b| {
                let da = trip_map[a].first_departure();
                let db = trip_map[b].first_departure();
                da.cmp(&db).then_with(|| a.cmp(b))
            });
        }

        let transfers: TransferEdges = transfers
            .into_iter()
            .filter(|e| {
                let known = stop_map.contains_key(&e.from) && stop_map.contains_key(&e.to);
                if !known {
                    debug!(from = %e.from, to = %e.to, "dropping transfer touching unknown stop");
                }
                known
            })
            .collect();

        Ok(Self {
            stops: stop_map,
            routes: route_map,
            trips: trip_map,
            route_trips,
            transfers,
        })
    }

    pub fn stop(&self, id: &StopId) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn trip(&self, id: &TripId) -> Option<&Trip> {
        self.trips.get(id)
    }

    /// Routes serving `stop`, in id order. Empty for unknown stops.
    pub fn routes_serving(&self, stop: &StopId) -> impl Iterator<Item = &RouteId> {
        self.stops.get(stop).into_iter().flat_map(|s| s.routes.iter())
    }

    /// Trips of `route` sorted by first departure.
    pub fn trips_of(&self, route: &RouteId) -> impl Iterator<Item = &Trip> {
        self.route_trips
            .get(route)
            .into_iter()
            .flatten()
            .filter_map(|id| self.trips.get(id))
    }

    pub fn transfers(&self) -> &TransferEdges {
        &self.transfers
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn summary(&self) -> NetworkSummary {
        let subway_routes = self
            .routes
            .values()
            .filter(|r| r.route_type == RouteType::Subway)
            .count();
        NetworkSummary {
            stops: self.stops.len(),
            subway_routes,
            bus_routes: self.routes.len() - subway_routes,
            trips: self.trips.len(),
            transfer_pairs: self.transfers.len(),
        }
    }
}

fn times_non_decreasing(stop_times: &[StopTime]) -> bool {
    stop_times.iter().all(|st| st.arrival <= st.departure)
        && stop_times
            .windows(2)
            .all(|w| w[0].departure <= w[1].arrival)
}

/// Pick the canonical pattern of a route: the stop order of its trip with
/// the most calls, ordered by sequence number. Ties go to the first trip.
pub fn canonical_pattern<'a, I>(trips: I) -> Vec<StopId>
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let mut best: Option<&TripRecord> = None;
    for trip in trips {
        if best.is_none_or(|b| trip.stop_times.len() > b.stop_times.len()) {
            best = Some(trip);
        }
    }

    let Some(trip) = best else {
        return Vec::new();
    };

    let mut calls: Vec<&StopTime> = trip.stop_times.iter().collect();
    calls.sort_by_key(|st| st.sequence);
    calls.into_iter().map(|st| st.stop.clone()).collect()
}

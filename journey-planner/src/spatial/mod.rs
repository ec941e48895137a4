//! Spatial queries: nearest stops and bike stations, and road routing.
//!
//! Nearest-neighbour search is a linear haversine scan. It is only used as
//! a pre-filter on a few hundred candidates per query, so no spatial index
//! is kept.

mod road;

use crate::domain::{Coord, StopId};
use crate::network::{BikeStation, NetworkIndex, Stop};

pub use road::{
    Bounds, DETOUR_FACTOR, DEFAULT_SNAP_RADIUS_KM, NodeId, Profile, RoadGraph, RoadGraphBuilder,
    RoutedPath,
};

/// Anything with a position.
pub trait Located {
    fn coord(&self) -> Coord;
}

impl Located for Stop {
    fn coord(&self) -> Coord {
        self.coord
    }
}

impl Located for BikeStation {
    fn coord(&self) -> Coord {
        self.coord
    }
}

/// An item with its straight-line distance from the query point.
#[derive(Debug, Clone, Copy)]
pub struct Nearby<'a, T> {
    pub item: &'a T,
    pub distance_km: f64,
}

/// Items within `max_km` of `point`, nearest first.
///
/// Ties keep the input order.
pub fn nearest<'a, T, I>(items: I, point: Coord, max_km: f64) -> Vec<Nearby<'a, T>>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut found: Vec<Nearby<'a, T>> = items
        .into_iter()
        .filter_map(|item| {
            let distance_km = point.haversine_km(&item.coord());
            (distance_km <= max_km).then_some(Nearby { item, distance_km })
        })
        .collect();
    found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    found
}

/// Stops within `max_km` of `point`, nearest first.
///
/// Equal distances are ordered by stop id so results do not depend on the
/// index's hash order.
pub fn nearest_stops<'a>(
    index: &'a NetworkIndex,
    point: Coord,
    max_km: f64,
) -> Vec<Nearby<'a, Stop>> {
    let mut stops: Vec<&Stop> = index.stops().collect();
    stops.sort_by(|a, b| a.id.cmp(&b.id));
    nearest(stops, point, max_km)
}

/// Bike stations within `max_km` of `point`, nearest first.
pub fn nearest_bike_stations<'a>(
    stations: &'a [BikeStation],
    point: Coord,
    max_km: f64,
) -> Vec<Nearby<'a, BikeStation>> {
    nearest(stations, point, max_km)
}

/// Ids of the stops returned by [`nearest_stops`].
pub fn nearest_stop_ids(index: &NetworkIndex, point: Coord, max_km: f64) -> Vec<(StopId, f64)> {
    nearest_stops(index, point, max_km)
        .into_iter()
        .map(|n| (n.item.id.clone(), n.distance_km))
        .collect()
}

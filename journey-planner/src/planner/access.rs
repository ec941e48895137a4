//! Access and egress resolution.
//!
//! Finds the stops a rider can reach from a point without transit, either
//! on foot or by a short bike hop, and turns a chosen leg back into journey
//! segments once the engine has picked it. The same legs serve the egress
//! side, travelled in reverse.

use std::fmt;

use serde::Serialize;

use crate::domain::{BikeStationId, Coord, FareTable, Place, Segment, StopId};
use crate::network::{BikeStation, NetworkIndex, Stop};
use crate::spatial::{nearest_bike_stations, nearest_stops};

use super::config::{Preferences, SearchConfig};

/// How the first or last stop is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Walk,
    Bike,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Walk => f.write_str("walk"),
            AccessMode::Bike => f.write_str("bike"),
        }
    }
}

/// Details of a bike hop between a station and a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct BikeHop {
    pub station: BikeStationId,
    pub station_name: String,
    pub station_coord: Coord,
    /// Straight-line walk between the query point and the station.
    pub walk_km: f64,
    pub walk_mins: f64,
    /// Straight-line ride between the station and the stop.
    pub ride_km: f64,
    pub ride_mins: f64,
}

/// A way to reach a stop from the query point (or the point from a stop).
#[derive(Debug, Clone, PartialEq)]
pub struct AccessLeg {
    pub stop: StopId,
    pub stop_name: String,
    pub stop_coord: Coord,
    /// Whole minutes, truncated.
    pub minutes: u32,
    pub distance_km: f64,
    /// `None` for a direct walk.
    pub bike: Option<BikeHop>,
}

impl AccessLeg {
    pub fn mode(&self) -> AccessMode {
        match self.bike {
            Some(_) => AccessMode::Bike,
            None => AccessMode::Walk,
        }
    }

    fn stop_place(&self) -> Place {
        Place::Stop {
            id: self.stop.clone(),
            name: self.stop_name.clone(),
        }
    }

    /// Segments from the query origin to the stop.
    ///
    /// Durations add up to [`AccessLeg::minutes`]. The bike hop is charged
    /// as a rental.
    pub fn access_segments(
        &self,
        origin: Coord,
        config: &SearchConfig,
        fares: &FareTable,
    ) -> Vec<Segment> {
        let stop = self.stop_place();
        match &self.bike {
            None => vec![Segment::walk(
                Place::Origin,
                stop,
                self.minutes,
                self.distance_km,
                vec![origin, self.stop_coord],
            )],
            Some(hop) => {
                let station = hop.station_place();
                let (walk_mins, ride_mins) = hop.split(self.minutes, config.bike_dock_mins);
                vec![
                    Segment::walk(
                        Place::Origin,
                        station.clone(),
                        walk_mins,
                        hop.walk_km,
                        vec![origin, hop.station_coord],
                    ),
                    Segment::bike_rental(station.clone(), config.bike_dock_mins),
                    Segment::bike(
                        station,
                        stop.clone(),
                        ride_mins,
                        hop.ride_km,
                        fares.bike_cost(hop.ride_mins),
                        vec![hop.station_coord, self.stop_coord],
                    ),
                    Segment::bike_return(stop, config.bike_dock_mins),
                ]
            }
        }
    }

    /// Segments from the stop to the query destination.
    pub fn egress_segments(
        &self,
        destination: Coord,
        config: &SearchConfig,
        fares: &FareTable,
    ) -> Vec<Segment> {
        let stop = self.stop_place();
        match &self.bike {
            None => vec![Segment::walk(
                stop,
                Place::Destination,
                self.minutes,
                self.distance_km,
                vec![self.stop_coord, destination],
            )],
            Some(hop) => {
                let station = hop.station_place();
                let (walk_mins, ride_mins) = hop.split(self.minutes, config.bike_dock_mins);
                vec![
                    Segment::bike_rental(stop.clone(), config.bike_dock_mins),
                    Segment::bike(
                        stop,
                        station.clone(),
                        ride_mins,
                        hop.ride_km,
                        fares.bike_cost(hop.ride_mins),
                        vec![self.stop_coord, hop.station_coord],
                    ),
                    Segment::bike_return(station.clone(), config.bike_dock_mins),
                    Segment::walk(
                        station,
                        Place::Destination,
                        walk_mins,
                        hop.walk_km,
                        vec![hop.station_coord, destination],
                    ),
                ]
            }
        }
    }
}

impl BikeHop {
    fn station_place(&self) -> Place {
        Place::BikeStation {
            id: self.station.clone(),
            name: self.station_name.clone(),
        }
    }

    /// Split a truncated total into walk and ride minutes so that
    /// walk + dock + ride + dock equals `total`.
    fn split(&self, total: u32, dock_mins: u32) -> (u32, u32) {
        let walk = (self.walk_mins as u32).min(total.saturating_sub(2 * dock_mins));
        let ride = total.saturating_sub(walk + 2 * dock_mins);
        (walk, ride)
    }
}

/// Stops reachable from `point`, quickest first.
///
/// Walk legs cover every stop within walking reach of the rider's walk
/// ceiling. With `include_bike`, bike legs go through the nearest stations
/// to the stops around each one and must fit within the bike ceiling. A
/// stop may appear once per way of reaching it.
pub fn resolve(
    index: &NetworkIndex,
    stations: &[BikeStation],
    point: Coord,
    include_bike: bool,
    prefs: &Preferences,
    config: &SearchConfig,
) -> Vec<AccessLeg> {
    let mut legs = Vec::new();

    let reach_km = config.walk_reach_km(prefs.max_walk_mins);
    for nearby in nearest_stops(index, point, reach_km) {
        let minutes = config.walk_minutes(nearby.distance_km);
        if minutes <= f64::from(prefs.max_walk_mins) {
            legs.push(walk_leg(nearby.item, nearby.distance_km, minutes));
        }
    }

    if include_bike {
        let docks = nearest_bike_stations(stations, point, config.access_bike_radius_km);
        for dock in docks.into_iter().take(config.access_bike_stations) {
            let station = dock.item;
            let stops = nearest_stops(index, station.coord, config.station_stop_radius_km);
            for nearby in stops.into_iter().take(config.access_stops_per_station) {
                let walk_mins = config.walk_minutes(dock.distance_km);
                let ride_mins = config.bike_minutes(nearby.distance_km);
                let total = walk_mins + ride_mins + f64::from(2 * config.bike_dock_mins);
                if total > f64::from(prefs.max_bike_mins) {
                    continue;
                }
                legs.push(AccessLeg {
                    stop: nearby.item.id.clone(),
                    stop_name: nearby.item.name.clone(),
                    stop_coord: nearby.item.coord,
                    minutes: total as u32,
                    distance_km: dock.distance_km + nearby.distance_km,
                    bike: Some(BikeHop {
                        station: station.id.clone(),
                        station_name: station.name.clone(),
                        station_coord: station.coord,
                        walk_km: dock.distance_km,
                        walk_mins,
                        ride_km: nearby.distance_km,
                        ride_mins,
                    }),
                });
            }
        }
    }

    legs.sort_by_key(|leg| leg.minutes);
    legs
}

fn walk_leg(stop: &Stop, distance_km: f64, minutes: f64) -> AccessLeg {
    AccessLeg {
        stop: stop.id.clone(),
        stop_name: stop.name.clone(),
        stop_coord: stop.coord,
        minutes: minutes as u32,
        distance_km,
        bike: None,
    }
}

//! Candidate journeys for each travel mode.
//!
//! Every generator returns complete [`Journey`] values built from the
//! shared read-only inputs. Generators never fail: a mode that does not fit
//! the query simply contributes nothing.

use tracing::debug;

use crate::domain::{
    Coord, FareTable, Journey, Place, RouteId, Segment, StopId, TimeOfDay, TransitInfo,
};
use crate::network::{BikeStation, NetworkIndex, Stop};
use crate::spatial::{RoadGraph, nearest_bike_stations, nearest_stops};

use super::access::AccessLeg;
use super::config::{Preferences, SearchConfig};
use super::raptor::{Hop, TransitCandidate};

/// Shared inputs of a single query.
#[derive(Clone, Copy)]
pub(crate) struct PlanContext<'a> {
    pub index: &'a NetworkIndex,
    pub road: &'a RoadGraph,
    pub stations: &'a [BikeStation],
    pub config: &'a SearchConfig,
    pub fares: &'a FareTable,
}

fn stop_place(stop: &Stop) -> Place {
    Place::Stop {
        id: stop.id.clone(),
        name: stop.name.clone(),
    }
}

fn station_place(station: &BikeStation) -> Place {
    Place::BikeStation {
        id: station.id.clone(),
        name: station.name.clone(),
    }
}

fn path_km(coords: &[Coord]) -> f64 {
    coords.windows(2).map(|w| w[0].haversine_km(&w[1])).sum()
}

/// A single walk from origin to destination.
///
/// Tried only when the two points are close. Identical points give a
/// zero-minute walk.
pub(crate) fn walk_only(
    ctx: &PlanContext<'_>,
    origin: Coord,
    destination: Coord,
    departure: TimeOfDay,
    prefs: &Preferences,
) -> Vec<Journey> {
    if origin == destination {
        let walk = Segment::walk(Place::Origin, Place::Destination, 0, 0.0, vec![origin]);
        return Journey::new(departure, vec![walk]).into_iter().collect();
    }

    if origin.haversine_km(&destination) > ctx.config.walk_only_max_km {
        return Vec::new();
    }

    // Snapping to the road grid is free, so the time covers the graph path only
    let path = ctx.road.shortest_path(origin, destination, ctx.config.walk_profile());
    if path.duration_mins > f64::from(prefs.max_walk_mins) {
        return Vec::new();
    }

    let walk = Segment::walk(
        Place::Origin,
        Place::Destination,
        path.duration_mins as u32,
        path.distance_km,
        path.coords,
    );
    Journey::new(departure, vec![walk]).into_iter().collect()
}

/// Walk to a dock, ride to a dock near the destination, walk on.
pub(crate) fn bike_only(
    ctx: &PlanContext<'_>,
    origin: Coord,
    destination: Coord,
    departure: TimeOfDay,
) -> Vec<Journey> {
    let config = ctx.config;
    let (walk, bike) = (config.walk_profile(), config.bike_profile());
    let starts = nearest_bike_stations(ctx.stations, origin, config.bike_only_radius_km);
    let ends = nearest_bike_stations(ctx.stations, destination, config.bike_only_radius_km);

    let mut journeys = Vec::new();
    for start in starts.iter().take(config.bike_only_stations) {
        for end in ends.iter().take(config.bike_only_stations) {
            if start.item.id == end.item.id {
                continue;
            }
            let (start, end) = (start.item, end.item);

            // Endpoints snap to the nearest road node at no time cost
            let walk_in = ctx.road.shortest_path(origin, start.coord, walk);
            let ride = ctx.road.shortest_path(start.coord, end.coord, bike);
            let walk_out = ctx.road.shortest_path(end.coord, destination, walk);

            let walk_in_mins = (walk_in.duration_mins as u32).max(config.min_walk_leg_mins);
            let ride_mins = (ride.duration_mins as u32).max(config.min_bike_leg_mins);
            let walk_out_mins = (walk_out.duration_mins as u32).max(config.min_walk_leg_mins);
            let total = walk_in_mins + ride_mins + walk_out_mins + 2 * config.bike_dock_mins;
            if total > config.bike_only_max_mins {
                continue;
            }

            let from = station_place(start);
            let to = station_place(end);
            let segments = vec![
                Segment::walk(
                    Place::Origin,
                    from.clone(),
                    walk_in_mins,
                    walk_in.distance_km,
                    walk_in.coords,
                ),
                Segment::bike_rental(from.clone(), config.bike_dock_mins),
                Segment::bike(
                    from,
                    to.clone(),
                    ride_mins,
                    ride.distance_km,
                    ctx.fares.bike_cost(ride.duration_mins),
                    ride.coords,
                ),
                Segment::bike_return(to.clone(), config.bike_dock_mins),
                Segment::walk(
                    to,
                    Place::Destination,
                    walk_out_mins,
                    walk_out.distance_km,
                    walk_out.coords,
                ),
            ];
            journeys.extend(Journey::new(departure, segments));
        }
    }

    debug!(journeys = journeys.len(), "bike-only candidates");
    journeys
}

/// A route serving two stops in travel order.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectRoute {
    pub route: RouteId,
    pub board_position: usize,
    pub alight_position: usize,
    /// Estimated from the number of pattern positions travelled.
    pub ride_mins: u32,
}

/// Routes on which `alight` comes after `board` in the pattern.
pub fn direct_routes(
    index: &NetworkIndex,
    config: &SearchConfig,
    board: &StopId,
    alight: &StopId,
) -> Vec<DirectRoute> {
    let alight_routes: Vec<&RouteId> = index.routes_serving(alight).collect();
    index
        .routes_serving(board)
        .filter(|r| alight_routes.contains(r))
        .filter_map(|id| {
            let route = index.route(id)?;
            let from = route.position(board)?;
            let to = route.position(alight)?;
            (to > from).then(|| DirectRoute {
                route: id.clone(),
                board_position: from,
                alight_position: to,
                ride_mins: (to - from) as u32 * config.mixed_mins_per_stop,
            })
        })
        .collect()
}

struct DirectOption<'a> {
    alight: &'a Stop,
    route: DirectRoute,
    egress_km: f64,
    egress_mins: f64,
}

/// Fastest direct rides from `board` to stops around `destination`.
fn direct_options<'a>(
    ctx: &PlanContext<'a>,
    board: &StopId,
    destination: Coord,
) -> Vec<DirectOption<'a>> {
    let config = ctx.config;
    let mut options = Vec::new();
    let alights = nearest_stops(ctx.index, destination, config.mixed_destination_radius_km);
    for alight in alights.into_iter().take(config.mixed_destination_stops) {
        for route in direct_routes(ctx.index, config, board, &alight.item.id) {
            options.push(DirectOption {
                alight: alight.item,
                route,
                egress_km: alight.distance_km,
                egress_mins: config.walk_minutes(alight.distance_km),
            });
        }
    }
    options.sort_by_key(|o| o.route.ride_mins);
    options.truncate(config.mixed_options_per_stop);
    options
}

/// Bike to a nearby stop, then one direct ride and a walk.
///
/// Ride times are estimates, so the transit segment carries no trip.
pub(crate) fn mixed(
    ctx: &PlanContext<'_>,
    origin: Coord,
    destination: Coord,
    departure: TimeOfDay,
) -> Vec<Journey> {
    let config = ctx.config;
    let dock_mins = f64::from(config.bike_dock_mins);
    let mut journeys = Vec::new();

    let docks = nearest_bike_stations(ctx.stations, origin, config.mixed_station_radius_km);
    for dock in docks.into_iter().take(config.mixed_stations) {
        let station = dock.item;
        // Snapping to the nearest road node is not costed
        let walk = ctx.road.shortest_path(origin, station.coord, config.walk_profile());
        let stops = nearest_stops(ctx.index, station.coord, config.station_stop_radius_km);

        for board in stops.into_iter().take(config.mixed_stops_per_station) {
            let board = board.item;
            let ride = ctx.road.shortest_path(station.coord, board.coord, config.bike_profile());
            let lead_mins = walk.duration_mins + dock_mins + ride.duration_mins + dock_mins;

            for option in direct_options(ctx, &board.id, destination) {
                let total = lead_mins + f64::from(option.route.ride_mins) + option.egress_mins;
                if total > f64::from(config.mixed_max_mins) {
                    continue;
                }
                let Some(route) = ctx.index.route(&option.route.route) else {
                    continue;
                };

                let pattern = &route.pattern()
                    [option.route.board_position..=option.route.alight_position];
                let coords: Vec<Coord> = pattern
                    .iter()
                    .filter_map(|s| ctx.index.stop(s).map(|s| s.coord))
                    .collect();

                let dock_place = station_place(station);
                let board_place = stop_place(board);
                let alight_place = stop_place(option.alight);
                let segments = vec![
                    Segment::walk(
                        Place::Origin,
                        dock_place.clone(),
                        walk.duration_mins as u32,
                        walk.distance_km,
                        walk.coords.clone(),
                    ),
                    Segment::bike_rental(dock_place.clone(), config.bike_dock_mins),
                    Segment::bike(
                        dock_place,
                        board_place.clone(),
                        ride.duration_mins as u32,
                        ride.distance_km,
                        ctx.fares.bike_cost(ride.duration_mins),
                        ride.coords.clone(),
                    ),
                    Segment::bike_return(board_place.clone(), config.bike_dock_mins),
                    Segment::transit(
                        board_place,
                        alight_place.clone(),
                        option.route.ride_mins,
                        path_km(&coords),
                        ctx.fares.base_fare(route.route_type),
                        TransitInfo {
                            route_id: route.id.clone(),
                            route_name: route.label(),
                            route_type: route.route_type,
                            trip_id: None,
                        },
                        coords,
                    ),
                    Segment::walk(
                        alight_place,
                        Place::Destination,
                        option.egress_mins as u32,
                        option.egress_km,
                        vec![option.alight.coord, destination],
                    ),
                ];
                journeys.extend(Journey::new(departure, segments));
            }
        }
    }

    debug!(journeys = journeys.len(), "mixed candidates");
    journeys
}

/// Turn an engine result into a journey.
///
/// Idle time before each boarding becomes a wait segment, so segment
/// durations add up to the candidate's arrival.
pub(crate) fn transit_journey(
    ctx: &PlanContext<'_>,
    candidate: &TransitCandidate,
    access: &[AccessLeg],
    egress: &[AccessLeg],
    origin: Coord,
    destination: Coord,
    departure: TimeOfDay,
) -> Option<Journey> {
    let access_leg = access.get(candidate.label.access_leg())?;
    let egress_leg = egress.get(candidate.egress)?;

    let mut segments = access_leg.access_segments(origin, ctx.config, ctx.fares);
    let mut now = departure + access_leg.minutes;

    for hop in candidate.label.hops() {
        match hop {
            Hop::Access { .. } => {}
            Hop::Ride {
                route,
                trip,
                board_stop,
                board_time,
                alight_stop,
                arrival,
                fare,
            } => {
                let board = ctx.index.stop(&board_stop)?;
                let alight = ctx.index.stop(&alight_stop)?;
                let route = ctx.index.route(&route)?;
                let trip = ctx.index.trip(&trip)?;

                let wait = board_time.minutes_since(now);
                if wait > 0 {
                    segments.push(Segment::wait(stop_place(board), wait));
                }

                let (start, _) = trip.call_at(&board_stop)?;
                let calls = &trip.stop_times()[start..];
                let end = calls.iter().position(|st| st.stop == alight_stop)?;
                let coords: Vec<Coord> = calls[..=end]
                    .iter()
                    .filter_map(|st| ctx.index.stop(&st.stop).map(|s| s.coord))
                    .collect();

                segments.push(Segment::transit(
                    stop_place(board),
                    stop_place(alight),
                    arrival.minutes_since(board_time),
                    path_km(&coords),
                    fare,
                    TransitInfo {
                        route_id: route.id.clone(),
                        route_name: route.label(),
                        route_type: route.route_type,
                        trip_id: Some(trip.id.clone()),
                    },
                    coords,
                ));
                now = arrival;
            }
            Hop::Transfer { from, to, minutes } => {
                let from = ctx.index.stop(&from)?;
                let to = ctx.index.stop(&to)?;
                segments.push(Segment::walk(
                    stop_place(from),
                    stop_place(to),
                    minutes,
                    from.coord.haversine_km(&to.coord),
                    vec![from.coord, to.coord],
                ));
                now = now + minutes;
            }
        }
    }

    segments.extend(egress_leg.egress_segments(destination, ctx.config, ctx.fares));

    match Journey::new(departure, segments) {
        Ok(journey) => Some(journey),
        Err(e) => {
            debug!(error = %e, "dropping unreconstructable transit candidate");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BikeStationId, JourneyCategory, RouteType, SegmentMode, TripId};
    use crate::network::{RouteRecord, StopRecord, StopTime, TripRecord};
    use crate::planner::access::resolve;
    use crate::planner::raptor::Raptor;
    use crate::spatial::Bounds;

    fn stop(id: &str, lat: f64, lon: f64) -> StopRecord {
        StopRecord {
            id: StopId::new(id),
            name: format!("Stop {id}"),
            coord: Coord::new(lat, lon),
        }
    }

    fn dock(id: &str, lat: f64, lon: f64) -> BikeStation {
        BikeStation {
            id: BikeStationId::new(id),
            name: format!("Dock {id}"),
            coord: Coord::new(lat, lon),
            capacity: 20,
        }
    }

    /// A north-south bus line from near the origin to near the destination.
    fn index() -> NetworkIndex {
        let calls = [("N", 0), ("M", 4), ("S", 8)];
        NetworkIndex::build(
            vec![
                stop("N", 37.5200, 127.0200),
                stop("M", 37.5100, 127.0200),
                stop("S", 37.5000, 127.0200),
            ],
            vec![RouteRecord {
                id: RouteId::new("B1"),
                name: "Bus 401".into(),
                route_type: RouteType::Bus,
                pattern: calls.iter().map(|(s, _)| StopId::new(*s)).collect(),
            }],
            vec![TripRecord {
                id: TripId::new("B1-0930"),
                route: RouteId::new("B1"),
                stop_times: calls
                    .iter()
                    .enumerate()
                    .map(|(i, (s, offset))| StopTime {
                        stop: StopId::new(*s),
                        arrival: TimeOfDay::from_minutes(575 + offset),
                        departure: TimeOfDay::from_minutes(575 + offset),
                        sequence: i as u32,
                    })
                    .collect(),
            }],
            vec![],
        )
        .unwrap()
    }

    fn road() -> RoadGraph {
        RoadGraph::grid(
            Bounds::new(Coord::new(37.495, 127.010), Coord::new(37.525, 127.030)),
            0.2,
        )
    }

    fn stations() -> Vec<BikeStation> {
        vec![
            dock("north", 37.5195, 127.0205),
            dock("south", 37.5005, 127.0205),
        ]
    }

    struct Fixture {
        index: NetworkIndex,
        road: RoadGraph,
        stations: Vec<BikeStation>,
        config: SearchConfig,
        fares: FareTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                index: index(),
                road: road(),
                stations: stations(),
                config: SearchConfig::default(),
                fares: FareTable::default(),
            }
        }

        fn ctx(&self) -> PlanContext<'_> {
            PlanContext {
                index: &self.index,
                road: &self.road,
                stations: &self.stations,
                config: &self.config,
                fares: &self.fares,
            }
        }
    }

    const ORIGIN: Coord = Coord::new(37.5198, 127.0202);
    const DESTINATION: Coord = Coord::new(37.5002, 127.0202);
    const NINE_THIRTY: TimeOfDay = TimeOfDay::from_minutes(570);

    #[test]
    fn walk_only_same_point() {
        let f = Fixture::new();
        let journeys = walk_only(&f.ctx(), ORIGIN, ORIGIN, NINE_THIRTY, &Preferences::default());
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].total_time_mins(), 0);
        assert_eq!(journeys[0].total_cost(), 0);
        assert_eq!(journeys[0].category(), JourneyCategory::Walk);
    }

    #[test]
    fn walk_only_limits() {
        let f = Fixture::new();
        let prefs = Preferences::default();

        // ~2.2 km apart: too far to try
        assert!(walk_only(&f.ctx(), ORIGIN, DESTINATION, NINE_THIRTY, &prefs).is_empty());

        // ~450 m: a few minutes on foot
        let near = Coord::new(37.5158, 127.0202);
        let journeys = walk_only(&f.ctx(), ORIGIN, near, NINE_THIRTY, &prefs);
        assert_eq!(journeys.len(), 1);
        let walk = &journeys[0].segments()[0];
        assert_eq!(walk.mode, SegmentMode::Walk);
        assert!(walk.duration_mins >= 5 && walk.duration_mins <= 10);
        assert_eq!(walk.cost, 0);

        // Within 2 km but over the walk ceiling
        let strict = Preferences {
            max_walk_mins: 2,
            ..Preferences::default()
        };
        assert!(walk_only(&f.ctx(), ORIGIN, near, NINE_THIRTY, &strict).is_empty());
    }

    #[test]
    fn walk_only_follows_walk_speed() {
        let mut f = Fixture::new();
        let prefs = Preferences {
            max_walk_mins: 60,
            ..Preferences::default()
        };
        let near = Coord::new(37.5158, 127.0202);

        let brisk = walk_only(&f.ctx(), ORIGIN, near, NINE_THIRTY, &prefs);
        f.config.walk_speed_kmh = 2.25;
        let slow = walk_only(&f.ctx(), ORIGIN, near, NINE_THIRTY, &prefs);

        let (brisk, slow) = (&brisk[0].segments()[0], &slow[0].segments()[0]);
        assert_eq!(brisk.distance_km, slow.distance_km);
        assert!(brisk.duration_mins > 0);
        assert!(slow.duration_mins >= 2 * brisk.duration_mins);
        assert!(slow.duration_mins <= 2 * brisk.duration_mins + 1);
    }

    #[test]
    fn bike_only_between_docks() {
        let f = Fixture::new();
        let journeys = bike_only(&f.ctx(), ORIGIN, DESTINATION, NINE_THIRTY);
        assert_eq!(journeys.len(), 1);

        let journey = &journeys[0];
        assert_eq!(journey.category(), JourneyCategory::Bike);
        assert_eq!(journey.total_cost(), f.fares.bike_base);
        let modes: Vec<_> = journey.segments().iter().map(|s| s.mode).collect();
        assert_eq!(
            modes,
            vec![
                SegmentMode::Walk,
                SegmentMode::BikeRental,
                SegmentMode::Bike,
                SegmentMode::BikeReturn,
                SegmentMode::Walk,
            ]
        );
        // Short legs are padded to their minimums
        assert!(journey.segments()[0].duration_mins >= 2);
        assert!(journey.segments()[2].duration_mins >= 5);
        assert!(journey.total_time_mins() <= f.config.bike_only_max_mins);
    }

    #[test]
    fn bike_only_needs_two_docks() {
        let mut f = Fixture::new();
        f.stations.truncate(1);
        assert!(bike_only(&f.ctx(), ORIGIN, DESTINATION, NINE_THIRTY).is_empty());
    }

    #[test]
    fn direct_routes_respect_direction() {
        let index = index();
        let config = SearchConfig::default();

        let forward = direct_routes(&index, &config, &StopId::new("N"), &StopId::new("S"));
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].ride_mins, 4);

        assert!(direct_routes(&index, &config, &StopId::new("S"), &StopId::new("N")).is_empty());
        assert!(direct_routes(&index, &config, &StopId::new("N"), &StopId::new("N")).is_empty());
    }

    #[test]
    fn mixed_rides_then_walks() {
        let f = Fixture::new();
        let journeys = mixed(&f.ctx(), ORIGIN, DESTINATION, NINE_THIRTY);
        assert!(!journeys.is_empty());

        for journey in &journeys {
            assert_eq!(journey.category(), JourneyCategory::Mixed);
            assert_eq!(journey.total_transfers(), 1);
            let transit = journey
                .segments()
                .iter()
                .find(|s| s.mode == SegmentMode::Transit)
                .unwrap();
            assert_eq!(transit.cost, f.fares.bus_base);
            assert!(transit.transit.as_ref().unwrap().trip_id.is_none());
            assert_eq!(journey.total_cost(), f.fares.bus_base + f.fares.bike_base);
            assert!(journey.total_time_mins() <= f.config.mixed_max_mins);
        }
    }

    #[test]
    fn transit_journey_adds_waits() {
        let f = Fixture::new();
        let ctx = f.ctx();
        let prefs = Preferences::default();
        let access = resolve(&f.index, &[], ORIGIN, false, &prefs, &f.config);
        let egress = resolve(&f.index, &[], DESTINATION, false, &prefs, &f.config);
        let outcome =
            Raptor::new(&f.index, &f.fares, &f.config).run(NINE_THIRTY, &access, &egress);
        let candidate = outcome
            .candidates
            .iter()
            .find(|c| egress[c.egress].stop == StopId::new("S"))
            .unwrap();

        let journey = transit_journey(
            &ctx,
            candidate,
            &access,
            &egress,
            ORIGIN,
            DESTINATION,
            NINE_THIRTY,
        )
        .unwrap();

        assert_eq!(journey.category(), JourneyCategory::Transit);
        assert_eq!(journey.arrival_time(), candidate.arrival);
        assert_eq!(journey.total_cost(), f.fares.bus_base);
        assert_eq!(journey.origin(), &Place::Origin);
        assert_eq!(journey.destination(), &Place::Destination);

        let modes: Vec<_> = journey.segments().iter().map(|s| s.mode).collect();
        assert_eq!(
            modes,
            vec![
                SegmentMode::Walk,
                SegmentMode::Wait,
                SegmentMode::Transit,
                SegmentMode::Walk,
            ]
        );
        let ride = &journey.segments()[2];
        assert_eq!(ride.duration_mins, 8);
        assert_eq!(ride.coordinates.len(), 3);
        assert_eq!(
            ride.transit.as_ref().unwrap().trip_id,
            Some(TripId::new("B1-0930"))
        );
    }
}

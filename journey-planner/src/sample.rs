//! A built-in demonstration network around Gangnam, Seoul.
//!
//! Two subway lines meeting at Gangnam, one bus route running alongside
//! them, six bike docks and a synthetic street grid. Timetables run from
//! 09:00 to 10:30. Coordinates are approximate.

use crate::domain::{BikeStationId, Coord, RouteId, RouteType, StopId, TimeOfDay, TripId};
use crate::network::{
    BikeStation, NetworkError, NetworkIndex, RouteRecord, StopRecord, StopTime, TransferEdges,
    TripRecord, canonical_pattern,
};
use crate::planner::SearchConfig;
use crate::spatial::{Bounds, RoadGraph};

/// Near Sinsa station.
pub const REFERENCE_ORIGIN: Coord = Coord::new(37.5158, 127.0204);
/// Between Yeoksam and Seolleung.
pub const REFERENCE_DESTINATION: Coord = Coord::new(37.4999, 127.0415);
/// 09:30.
pub const REFERENCE_DEPARTURE: TimeOfDay = TimeOfDay::from_minutes(570);

const SERVICE_START: u32 = 9 * 60;
const SERVICE_END: u32 = 10 * 60 + 30;

const GRID_SPACING_KM: f64 = 0.15;

/// A line: (id, name, type, headway, calls as (stop id, name, lat, lon, offset)).
type Line = (
    &'static str,
    &'static str,
    RouteType,
    u32,
    &'static [(&'static str, &'static str, f64, f64, u32)],
);

const LINES: &[Line] = &[
    (
        "SBD",
        "Shinbundang Line",
        RouteType::Subway,
        5,
        &[
            ("D04", "Sinsa", 37.5163, 127.0203, 0),
            ("D05", "Nonhyeon", 37.5110, 127.0216, 2),
            ("D06", "Sinnonhyeon", 37.5046, 127.0249, 4),
            ("D07", "Gangnam", 37.4966, 127.0283, 6),
        ],
    ),
    (
        "L2",
        "Line 2",
        RouteType::Subway,
        5,
        &[
            ("222", "Gangnam", 37.4979, 127.0276, 0),
            ("221", "Yeoksam", 37.5007, 127.0363, 2),
            ("220", "Seolleung", 37.5045, 127.0490, 4),
            ("219", "Samseong", 37.5088, 127.0631, 6),
        ],
    ),
    (
        "B146",
        "146",
        RouteType::Bus,
        8,
        &[
            ("B-SINSA", "Sinsa Station", 37.5155, 127.0210, 0),
            ("B-NONHYEON", "Nonhyeon Station", 37.5105, 127.0225, 4),
            ("B-SINNONHYEON", "Sinnonhyeon Station", 37.5040, 127.0255, 8),
            ("B-GANGNAM", "Gangnam Station", 37.4985, 127.0285, 13),
            ("B-YEOKSAM", "Yeoksam Station", 37.5002, 127.0370, 18),
            ("B-YEOKSAM-E", "Yeoksam Station East", 37.5010, 127.0410, 21),
            ("B-SEOLLEUNG", "Seolleung Station", 37.5040, 127.0480, 25),
        ],
    ),
];

const DOCKS: &[(&str, &str, f64, f64, u32)] = &[
    ("ST-101", "Sinsa Station Exit 1", 37.5160, 127.0199, 15),
    ("ST-102", "Nonhyeon Station Exit 3", 37.5115, 127.0222, 10),
    ("ST-103", "Sinnonhyeon Station Exit 5", 37.5050, 127.0243, 12),
    ("ST-201", "Yeoksam Station Exit 2", 37.5003, 127.0378, 20),
    ("ST-202", "Yeoksam Tower", 37.5001, 127.0420, 10),
    ("ST-203", "Seolleung Station Exit 8", 37.5043, 127.0485, 15),
];

/// The demonstration inputs for a planner.
#[derive(Debug, Clone)]
pub struct SampleNetwork {
    pub index: NetworkIndex,
    pub road: RoadGraph,
    pub stations: Vec<BikeStation>,
}

/// Build the Gangnam network with the default search configuration.
///
/// # Examples
///
/// ```
/// let sample = journey_planner::sample::gangnam().unwrap();
/// assert_eq!(sample.index.summary().subway_routes, 2);
/// assert_eq!(sample.stations.len(), 6);
/// ```
pub fn gangnam() -> Result<SampleNetwork, NetworkError> {
    gangnam_with(&SearchConfig::default())
}

/// Build the Gangnam network, linking stops within
/// `config.transfer_radius_km` of each other.
pub fn gangnam_with(config: &SearchConfig) -> Result<SampleNetwork, NetworkError> {
    let mut stops = Vec::new();
    let mut routes = Vec::new();
    let mut trips = Vec::new();

    for &(route_id, name, route_type, headway, calls) in LINES {
        stops.extend(calls.iter().map(|&(id, stop_name, lat, lon, _)| StopRecord {
            id: StopId::new(id),
            name: stop_name.to_string(),
            coord: Coord::new(lat, lon),
        }));

        let route = RouteId::new(route_id);
        let route_trips: Vec<TripRecord> = (SERVICE_START..=SERVICE_END)
            .step_by(headway as usize)
            .map(|start| timetabled_trip(&route, start, calls))
            .collect();

        routes.push(RouteRecord {
            id: route,
            name: name.to_string(),
            route_type,
            pattern: canonical_pattern(&route_trips),
        });
        trips.extend(route_trips);
    }

    let transfers = TransferEdges::within_radius(
        stops.iter().map(|s| (&s.id, s.coord)),
        config.transfer_radius_km,
    );

    let stations = DOCKS
        .iter()
        .map(|&(id, name, lat, lon, capacity)| BikeStation {
            id: BikeStationId::new(id),
            name: name.to_string(),
            coord: Coord::new(lat, lon),
            capacity,
        })
        .collect();

    let road = RoadGraph::grid(
        Bounds::new(Coord::new(37.490, 127.010), Coord::new(37.520, 127.070)),
        GRID_SPACING_KM,
    );

    Ok(SampleNetwork {
        index: NetworkIndex::build(stops, routes, trips, transfers)?,
        road,
        stations,
    })
}

fn timetabled_trip(
    route: &RouteId,
    start: u32,
    calls: &[(&str, &str, f64, f64, u32)],
) -> TripRecord {
    let stop_times = calls
        .iter()
        .zip(1..)
        .map(|(&(stop, _, _, _, offset), sequence)| {
            let at = TimeOfDay::from_minutes(start + offset);
            StopTime {
                stop: StopId::new(stop),
                arrival: at,
                departure: at,
                sequence,
            }
        })
        .collect();

    TripRecord {
        id: TripId::new(format!("{route}-{:02}{:02}", start / 60, start % 60)),
        route: route.clone(),
        stop_times,
    }
}

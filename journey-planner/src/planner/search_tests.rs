//! Unit tests for the planner facade, run against the Gangnam sample.

use super::*;
use crate::domain::{Coord, FareTable, JourneyCategory, Place, SegmentMode, TimeOfDay};
use crate::sample::{
    REFERENCE_DEPARTURE, REFERENCE_DESTINATION, REFERENCE_ORIGIN, SampleNetwork, gangnam,
};
use crate::spatial::RoadGraph;

struct Fixture {
    sample: SampleNetwork,
    config: SearchConfig,
    fares: FareTable,
}

impl Fixture {
    fn new() -> Self {
        Self {
            sample: gangnam().unwrap(),
            config: SearchConfig::default(),
            fares: FareTable::default(),
        }
    }

    fn planner(&self) -> JourneyPlanner<'_> {
        JourneyPlanner::new(
            &self.sample.index,
            &self.sample.road,
            &self.sample.stations,
            &self.config,
            &self.fares,
        )
        .unwrap()
    }
}

fn reference_query() -> JourneyQuery {
    JourneyQuery::new(REFERENCE_ORIGIN, REFERENCE_DESTINATION, REFERENCE_DEPARTURE)
}

#[test]
fn reference_query_finds_transit() {
    let f = Fixture::new();
    let journeys = f.planner().find_journeys(&reference_query()).unwrap();

    assert!(!journeys.is_empty());
    assert!(journeys.len() <= 5);

    let transit: Vec<_> = journeys
        .iter()
        .filter(|j| j.category() == JourneyCategory::Transit)
        .collect();
    assert!(!transit.is_empty(), "no transit journey in {journeys:?}");

    for journey in transit {
        let rides: Vec<_> = journey
            .segments()
            .iter()
            .filter(|s| s.mode == SegmentMode::Transit)
            .collect();
        let base: u32 = rides
            .iter()
            .filter_map(|s| s.transit.as_ref())
            .map(|t| f.fares.base_fare(t.route_type))
            .sum();
        let discounts = f.fares.transfer_discount * (rides.len() as u32 - 1);
        assert_eq!(journey.total_cost(), base - discounts);
    }
}

#[test]
fn journeys_run_origin_to_destination() {
    let f = Fixture::new();
    let journeys = f.planner().find_journeys(&reference_query()).unwrap();

    for journey in &journeys {
        assert_eq!(journey.origin(), &Place::Origin);
        assert_eq!(journey.destination(), &Place::Destination);
        assert!(journey.score().is_some());
        let total: u32 = journey.segments().iter().map(|s| s.duration_mins).sum();
        assert_eq!(total, journey.total_time_mins());
    }
    assert!(journeys.windows(2).all(|w| w[0].score() <= w[1].score()));
}

#[test]
fn reference_query_orders_categories_by_score() {
    let f = Fixture::new();
    let result = f.planner().plan(&reference_query()).unwrap();

    let mut order: Vec<JourneyCategory> = Vec::new();
    for journey in &result.journeys {
        if !order.contains(&journey.category()) {
            order.push(journey.category());
        }
    }
    assert_eq!(
        order,
        [
            JourneyCategory::Bike,
            JourneyCategory::Transit,
            JourneyCategory::Mixed
        ]
    );

    // Each category leads with its best-scoring journey
    for category in order {
        let scores: Vec<f64> = result
            .journeys
            .iter()
            .filter(|j| j.category() == category)
            .filter_map(|j| j.score())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{category}: {scores:?}");
    }
}

#[test]
fn same_point_is_a_zero_minute_walk() {
    let f = Fixture::new();
    let query = JourneyQuery::new(REFERENCE_ORIGIN, REFERENCE_ORIGIN, REFERENCE_DEPARTURE);
    let journeys = f.planner().find_journeys(&query).unwrap();

    let first = &journeys[0];
    assert_eq!(first.category(), JourneyCategory::Walk);
    assert_eq!(first.total_time_mins(), 0);
    assert_eq!(first.total_cost(), 0);
    assert_eq!(first.arrival_time(), REFERENCE_DEPARTURE);
}

#[test]
fn without_bikes_no_bike_journeys() {
    let f = Fixture::new();
    let query = reference_query().include_bike(false);
    let journeys = f.planner().find_journeys(&query).unwrap();

    assert!(!journeys.is_empty());
    assert!(journeys.iter().all(|j| {
        !matches!(j.category(), JourneyCategory::Bike | JourneyCategory::Mixed)
    }));
}

#[test]
fn max_routes_is_respected() {
    let f = Fixture::new();
    let journeys = f
        .planner()
        .find_journeys(&reference_query().max_routes(2))
        .unwrap();
    assert!(journeys.len() <= 2);
}

#[test]
fn unreachable_destination_is_empty() {
    let f = Fixture::new();
    // Busan, far outside the network
    let query = JourneyQuery::new(
        REFERENCE_ORIGIN,
        Coord::new(35.1796, 129.0756),
        REFERENCE_DEPARTURE,
    );
    let result = f.planner().plan(&query).unwrap();
    assert!(result.journeys.is_empty());
    assert_eq!(result.summary.journeys, 0);
    assert_eq!(result.rounds, 0);
}

#[test]
fn late_departure_has_no_transit() {
    let f = Fixture::new();
    let query = JourneyQuery::new(
        REFERENCE_ORIGIN,
        REFERENCE_DESTINATION,
        TimeOfDay::from_minutes(23 * 60),
    );
    let journeys = f.planner().find_journeys(&query).unwrap();
    // Only estimated rides remain once the timetable has ended
    let timetabled = journeys
        .iter()
        .flat_map(|j| j.segments())
        .filter_map(|s| s.transit.as_ref())
        .filter(|t| t.trip_id.is_some())
        .count();
    assert_eq!(timetabled, 0);
}

#[test]
fn plan_reports_search_stats() {
    let f = Fixture::new();
    let result = f.planner().plan(&reference_query()).unwrap();

    assert!(result.rounds >= 1);
    assert!(result.candidates >= result.journeys.len());
    assert_eq!(result.summary.journeys, result.journeys.len());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["summary"]["journeys"], result.journeys.len());
    assert_eq!(json["journeys"][0]["segments"][0]["from"]["kind"], "origin");
}

#[test]
fn invalid_queries_rejected() {
    let f = Fixture::new();
    let planner = f.planner();

    let bad_origin =
        JourneyQuery::new(Coord::new(91.0, 0.0), REFERENCE_DESTINATION, REFERENCE_DEPARTURE);
    assert!(matches!(
        planner.find_journeys(&bad_origin),
        Err(PlannerError::InvalidQuery(_))
    ));

    let bad_destination =
        JourneyQuery::new(REFERENCE_ORIGIN, Coord::new(37.5, f64::NAN), REFERENCE_DEPARTURE);
    assert!(matches!(
        planner.find_journeys(&bad_destination),
        Err(PlannerError::InvalidQuery(_))
    ));

    let no_routes = reference_query().max_routes(0);
    assert!(matches!(
        planner.find_journeys(&no_routes),
        Err(PlannerError::InvalidQuery(_))
    ));

    let bad_weight = reference_query().preferences(Preferences {
        cost_weight: -0.1,
        ..Preferences::default()
    });
    let err = planner.find_journeys(&bad_weight).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid query: cost_weight must be a non-negative number"
    );
}

#[test]
fn empty_road_graph_rejected() {
    let f = Fixture::new();
    let road = RoadGraph::builder().build();
    let result = JourneyPlanner::new(
        &f.sample.index,
        &road,
        &f.sample.stations,
        &f.config,
        &f.fares,
    );
    assert!(matches!(result, Err(PlannerError::EmptyRoadGraph)));
}

#[test]
fn planner_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JourneyPlanner<'static>>();

    let f = Fixture::new();
    let planner = f.planner();
    let query = reference_query();
    let expected = planner.find_journeys(&query).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| planner.find_journeys(&query).unwrap()))
            .collect();
        for handle in handles {
            let journeys = handle.join().unwrap();
            assert_eq!(journeys.len(), expected.len());
            for (a, b) in journeys.iter().zip(&expected) {
                assert_eq!(a.total_time_mins(), b.total_time_mins());
                assert_eq!(a.total_cost(), b.total_cost());
            }
        }
    });
}

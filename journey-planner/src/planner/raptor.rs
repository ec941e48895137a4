//! Round-based transit search (RAPTOR).
//!
//! Round 0 seeds one label per access stop. Each later round boards at
//! most one more vehicle: it scans every route touching a stop improved in
//! the previous round, then relaxes the fixed-time transfers out of the
//! stops it just improved. The search stops when a round improves nothing
//! or after `max_transfers + 1` rounds.
//!
//! Each stop keeps a single best label. A label replaces the incumbent when
//! it arrives earlier, or ties on arrival with fewer transfers, or ties on
//! both with a lower cost, or arrives within the transfer tolerance with
//! fewer transfers.
//!
//! Route scanning boards from the labels as they stood at the start of the
//! round, so a label produced in round `r` has exactly `r` boardings.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::domain::{FareTable, RouteId, StopId, TimeOfDay, TripId};
use crate::network::{NetworkIndex, Route, Trip};

use super::access::{AccessLeg, AccessMode};
use super::config::SearchConfig;

/// One step of the path that produced a label.
#[derive(Debug, Clone, PartialEq)]
pub enum Hop {
    /// Reached `stop` from the query point using `access[leg]`.
    Access {
        leg: usize,
        stop: StopId,
        minutes: u32,
        mode: AccessMode,
    },
    /// Rode `trip` from `board_stop` to `alight_stop`.
    Ride {
        route: RouteId,
        trip: TripId,
        board_stop: StopId,
        board_time: TimeOfDay,
        alight_stop: StopId,
        arrival: TimeOfDay,
        fare: u32,
    },
    /// Walked a transfer edge.
    Transfer {
        from: StopId,
        to: StopId,
        minutes: u32,
    },
}

#[derive(Debug)]
struct HopLink {
    hop: Hop,
    prev: Option<Arc<HopLink>>,
}

/// Best known way of reaching a stop.
#[derive(Debug, Clone)]
pub struct Label {
    pub arrival: TimeOfDay,
    /// Vehicle changes so far (boardings minus one).
    pub transfers: usize,
    pub boardings: usize,
    /// Transit fares so far.
    pub cost: u32,
    /// Stop the last hop started from.
    pub parent_stop: Option<StopId>,
    /// Trip of the last ride.
    pub trip: Option<TripId>,
    pub route: Option<RouteId>,
    pub boarding_time: Option<TimeOfDay>,
    pub access_mode: AccessMode,
    hops: Arc<HopLink>,
}

impl Label {
    fn access(leg_index: usize, leg: &AccessLeg, departure: TimeOfDay) -> Self {
        Label {
            arrival: departure + leg.minutes,
            transfers: 0,
            boardings: 0,
            cost: 0,
            parent_stop: None,
            trip: None,
            route: None,
            boarding_time: None,
            access_mode: leg.mode(),
            hops: Arc::new(HopLink {
                hop: Hop::Access {
                    leg: leg_index,
                    stop: leg.stop.clone(),
                    minutes: leg.minutes,
                    mode: leg.mode(),
                },
                prev: None,
            }),
        }
    }

    fn ride(
        &self,
        route: &Route,
        trip: &Trip,
        board: &Boarding<'_>,
        alight: &StopId,
        arrival: TimeOfDay,
        fare: u32,
    ) -> Self {
        Label {
            arrival,
            transfers: self.boardings,
            boardings: self.boardings + 1,
            cost: self.cost + fare,
            parent_stop: Some(board.stop.clone()),
            trip: Some(trip.id.clone()),
            route: Some(route.id.clone()),
            boarding_time: Some(board.departure),
            access_mode: self.access_mode,
            hops: self.extend(Hop::Ride {
                route: route.id.clone(),
                trip: trip.id.clone(),
                board_stop: board.stop.clone(),
                board_time: board.departure,
                alight_stop: alight.clone(),
                arrival,
                fare,
            }),
        }
    }

    fn walk(&self, from: &StopId, to: &StopId, minutes: u32) -> Self {
        Label {
            arrival: self.arrival + minutes,
            parent_stop: Some(from.clone()),
            hops: self.extend(Hop::Transfer {
                from: from.clone(),
                to: to.clone(),
                minutes,
            }),
            ..self.clone()
        }
    }

    fn extend(&self, hop: Hop) -> Arc<HopLink> {
        Arc::new(HopLink {
            hop,
            prev: Some(Arc::clone(&self.hops)),
        })
    }

    /// Hops from the access leg to this stop, in travel order.
    pub fn hops(&self) -> Vec<Hop> {
        let mut hops = Vec::new();
        let mut link = Some(&self.hops);
        while let Some(l) = link {
            hops.push(l.hop.clone());
            link = l.prev.as_ref();
        }
        hops.reverse();
        hops
    }

    /// Index of the access leg this label started from.
    pub fn access_leg(&self) -> usize {
        let mut link = &self.hops;
        while let Some(prev) = &link.prev {
            link = prev;
        }
        match link.hop {
            Hop::Access { leg, .. } => leg,
            // Chains always start with an access hop
            _ => 0,
        }
    }
}

/// Whether `candidate` should replace `incumbent`.
///
/// Criteria are `(arrival, transfers, cost)`. A candidate wins when there is
/// no incumbent, when it arrives strictly earlier, when it ties on arrival
/// with fewer transfers, when it ties on both with a lower cost, or when it
/// arrives at most `tolerance_mins` later with fewer transfers.
///
/// The relation is not acyclic: a later label with fewer transfers and an
/// earlier label with more each beat the other. Inside [`Raptor::run`] the
/// last clause never fires, since every round-`r` candidate carries `r`
/// boardings and so never has fewer transfers than a label kept from an
/// earlier round. Labels therefore only get earlier from round to round.
///
/// # Examples
///
/// ```
/// use journey_planner::planner::dominates;
///
/// // (arrival, transfers, cost)
/// assert!(dominates((600, 1, 1370), None, 5));
/// assert!(dominates((599, 3, 9000), Some((600, 0, 0)), 5));
/// assert!(dominates((604, 0, 1370), Some((600, 1, 2440)), 5));
/// assert!(!dominates((606, 0, 1370), Some((600, 1, 2440)), 5));
/// assert!(!dominates((600, 1, 1370), Some((600, 1, 1370)), 5));
/// ```
pub fn dominates(
    candidate: (u32, usize, u32),
    incumbent: Option<(u32, usize, u32)>,
    tolerance_mins: u32,
) -> bool {
    let Some((arrival, transfers, cost)) = incumbent else {
        return true;
    };
    let (c_arrival, c_transfers, c_cost) = candidate;

    if c_arrival < arrival {
        return true;
    }
    if c_arrival == arrival {
        if c_transfers < transfers {
            return true;
        }
        if c_transfers == transfers && c_cost < cost {
            return true;
        }
    }
    c_arrival <= arrival + tolerance_mins && c_transfers < transfers
}

fn criteria(label: &Label) -> (u32, usize, u32) {
    (label.arrival.minutes(), label.transfers, label.cost)
}

#[derive(Debug)]
struct Boarding<'a> {
    trip: &'a Trip,
    call: usize,
    stop: StopId,
    departure: TimeOfDay,
}

/// A transit path ending at an egress stop.
#[derive(Debug, Clone)]
pub struct TransitCandidate {
    pub label: Label,
    /// Index into the egress legs.
    pub egress: usize,
    /// Arrival at the query destination.
    pub arrival: TimeOfDay,
}

/// Per-round counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundStats {
    pub round: usize,
    pub routes_scanned: usize,
    pub stops_improved: usize,
    pub transfers_improved: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RaptorOutcome {
    /// Label set after each round, starting with round 0.
    pub round_labels: Vec<HashMap<StopId, Label>>,
    pub rounds: Vec<RoundStats>,
    pub candidates: Vec<TransitCandidate>,
}

impl RaptorOutcome {
    /// Labels after the last round.
    pub fn labels(&self) -> Option<&HashMap<StopId, Label>> {
        self.round_labels.last()
    }
}

/// The transit search over a shared index.
pub struct Raptor<'a> {
    index: &'a NetworkIndex,
    fares: &'a FareTable,
    config: &'a SearchConfig,
}

impl<'a> Raptor<'a> {
    pub fn new(index: &'a NetworkIndex, fares: &'a FareTable, config: &'a SearchConfig) -> Self {
        Self {
            index,
            fares,
            config,
        }
    }

    /// Run the search from `access` legs and collect candidates at `egress`
    /// stops.
    ///
    /// Egress stops whose label involves no ride are skipped; reaching the
    /// destination on foot is the walk-only generator's job.
    pub fn run(
        &self,
        departure: TimeOfDay,
        access: &[AccessLeg],
        egress: &[AccessLeg],
    ) -> RaptorOutcome {
        let tolerance = self.config.transfer_tolerance_mins;
        let mut labels: HashMap<StopId, Label> = HashMap::new();
        let mut marked: BTreeSet<StopId> = BTreeSet::new();

        for (i, leg) in access.iter().enumerate() {
            let candidate = Label::access(i, leg, departure);
            if dominates(criteria(&candidate), labels.get(&leg.stop).map(criteria), tolerance) {
                labels.insert(leg.stop.clone(), candidate);
                marked.insert(leg.stop.clone());
            }
        }
        debug!(access = access.len(), seeded = marked.len(), "round 0 seeded");

        let mut round_labels = vec![labels.clone()];
        let mut rounds = Vec::new();

        for round in 1..=self.config.max_rounds() {
            if marked.is_empty() {
                break;
            }
            let snapshot = labels.clone();

            let mut seen = HashSet::new();
            let routes: Vec<&RouteId> = marked
                .iter()
                .flat_map(|stop| self.index.routes_serving(stop))
                .filter(|r| seen.insert(*r))
                .collect();

            let mut improved = BTreeSet::new();
            for route in &routes {
                self.scan_route(route, &marked, &snapshot, &mut labels, &mut improved);
            }

            let walked_from: Vec<(StopId, Label)> = improved
                .iter()
                .filter_map(|s| labels.get(s).map(|l| (s.clone(), l.clone())))
                .collect();
            let mut transferred = BTreeSet::new();
            for (stop, label) in &walked_from {
                for transfer in self.index.transfers().from_stop(stop) {
                    let candidate = label.walk(stop, &transfer.to, transfer.minutes);
                    let incumbent = labels.get(&transfer.to).map(criteria);
                    if dominates(criteria(&candidate), incumbent, tolerance) {
                        labels.insert(transfer.to.clone(), candidate);
                        transferred.insert(transfer.to.clone());
                    }
                }
            }

            let stats = RoundStats {
                round,
                routes_scanned: routes.len(),
                stops_improved: improved.len(),
                transfers_improved: transferred.len(),
            };
            debug!(
                round,
                routes = stats.routes_scanned,
                improved = stats.stops_improved,
                transferred = stats.transfers_improved,
                "round complete"
            );
            rounds.push(stats);
            round_labels.push(labels.clone());

            marked = improved;
            marked.extend(transferred);
        }

        let candidates = egress
            .iter()
            .enumerate()
            .filter_map(|(i, leg)| {
                let label = labels.get(&leg.stop)?;
                (label.boardings > 0).then(|| TransitCandidate {
                    label: label.clone(),
                    egress: i,
                    arrival: label.arrival + leg.minutes,
                })
            })
            .collect();

        RaptorOutcome {
            round_labels,
            rounds,
            candidates,
        }
    }

    /// Board the single earliest departure reachable from the route's marked
    /// stops and ride it to the end.
    fn scan_route(
        &self,
        route_id: &RouteId,
        marked: &BTreeSet<StopId>,
        snapshot: &HashMap<StopId, Label>,
        labels: &mut HashMap<StopId, Label>,
        improved: &mut BTreeSet<StopId>,
    ) {
        let Some(route) = self.index.route(route_id) else {
            return;
        };

        let mut best: Option<(Boarding<'_>, &Label)> = None;
        for stop in route.pattern().iter().filter(|s| marked.contains(*s)) {
            let Some(label) = snapshot.get(stop) else {
                continue;
            };
            let ready = label.arrival + self.config.boarding_buffer_mins;
            let Some(boarding) = self.earliest_trip(route_id, stop, ready) else {
                continue;
            };
            if best.as_ref().is_none_or(|(b, _)| boarding.departure < b.departure) {
                best = Some((boarding, label));
            }
        }

        let Some((board, from)) = best else {
            trace!(route = %route_id, "no boardable trip");
            return;
        };
        trace!(
            route = %route_id,
            trip = %board.trip.id,
            stop = %board.stop,
            departure = %board.departure,
            "boarding"
        );

        let fare = self.fares.boarding_fare(route.route_type, from.boardings > 0);
        for call in &board.trip.stop_times()[board.call + 1..] {
            if call.arrival <= board.departure {
                continue;
            }
            let candidate = from.ride(route, board.trip, &board, &call.stop, call.arrival, fare);
            let incumbent = labels.get(&call.stop).map(criteria);
            if dominates(criteria(&candidate), incumbent, self.config.transfer_tolerance_mins) {
                labels.insert(call.stop.clone(), candidate);
                improved.insert(call.stop.clone());
            }
        }
    }

    /// Earliest trip of `route` leaving `stop` at or after `ready`.
    fn earliest_trip(
        &self,
        route: &RouteId,
        stop: &StopId,
        ready: TimeOfDay,
    ) -> Option<Boarding<'a>> {
        let mut best: Option<Boarding<'a>> = None;
        for trip in self.index.trips_of(route) {
            let Some((call, st)) = trip.call_at(stop) else {
                continue;
            };
            if st.departure < ready {
                continue;
            }
            if best.as_ref().is_none_or(|b| st.departure < b.departure) {
                best = Some(Boarding {
                    trip,
                    call,
                    stop: stop.clone(),
                    departure: st.departure,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coord, RouteType};
    use crate::network::{RouteRecord, StopRecord, StopTime, TransferEdge, TripRecord};

    fn stop(id: &str, lat: f64) -> StopRecord {
        StopRecord {
            id: StopId::new(id),
            name: format!("Stop {id}"),
            coord: Coord::new(lat, 127.0),
        }
    }

    fn route(id: &str, route_type: RouteType, pattern: &[&str]) -> RouteRecord {
        RouteRecord {
            id: RouteId::new(id),
            name: id.to_string(),
            route_type,
            pattern: pattern.iter().map(|s| StopId::new(*s)).collect(),
        }
    }

    fn trip(id: &str, route: &str, calls: &[(&str, u32)]) -> TripRecord {
        TripRecord {
            id: TripId::new(id),
            route: RouteId::new(route),
            stop_times: calls
                .iter()
                .enumerate()
                .map(|(i, (s, t))| StopTime {
                    stop: StopId::new(*s),
                    arrival: TimeOfDay::from_minutes(*t),
                    departure: TimeOfDay::from_minutes(*t),
                    sequence: i as u32,
                })
                .collect(),
        }
    }

    fn leg(stop: &str, minutes: u32) -> AccessLeg {
        AccessLeg {
            stop: StopId::new(stop),
            stop_name: stop.to_string(),
            stop_coord: Coord::new(37.5, 127.0),
            minutes,
            distance_km: 0.0,
            bike: None,
        }
    }

    /// Two lines crossing via a transfer: L1 A→B→C, L2 D→E, transfer C↔D,
    /// plus a slow direct bus A→E.
    fn network() -> NetworkIndex {
        NetworkIndex::build(
            vec![
                stop("A", 37.50),
                stop("B", 37.51),
                stop("C", 37.52),
                stop("D", 37.521),
                stop("E", 37.53),
            ],
            vec![
                route("L1", RouteType::Subway, &["A", "B", "C"]),
                route("L2", RouteType::Subway, &["D", "E"]),
                route("BUS", RouteType::Bus, &["A", "E"]),
            ],
            vec![
                trip("L1-a", "L1", &[("A", 575), ("B", 580), ("C", 585)]),
                trip("L1-b", "L1", &[("A", 585), ("B", 590), ("C", 595)]),
                trip("L2-a", "L2", &[("D", 590), ("E", 595)]),
                trip("L2-b", "L2", &[("D", 600), ("E", 605)]),
                trip("BUS-a", "BUS", &[("A", 580), ("E", 620)]),
            ],
            vec![TransferEdge {
                from: StopId::new("C"),
                to: StopId::new("D"),
                minutes: 3,
            }],
        )
        .unwrap()
    }

    fn run(index: &NetworkIndex, config: &SearchConfig) -> RaptorOutcome {
        let fares = FareTable::default();
        Raptor::new(index, &fares, config).run(
            TimeOfDay::from_minutes(570),
            &[leg("A", 3)],
            &[leg("E", 2)],
        )
    }

    #[test]
    fn finds_transfer_journey() {
        let index = network();
        let outcome = run(&index, &SearchConfig::default());
        let labels = outcome.labels().unwrap();

        // Ready at A 573 + 1, boards L1-a at 575, C at 585, walk to D by 588,
        // board L2-a at 590, E at 595
        let e = &labels[&StopId::new("E")];
        assert_eq!(e.arrival, TimeOfDay::from_minutes(595));
        assert_eq!(e.boardings, 2);
        assert_eq!(e.transfers, 1);
        assert_eq!(e.cost, 1370 + 1070);
        assert_eq!(e.trip, Some(TripId::new("L2-a")));
        assert_eq!(e.parent_stop, Some(StopId::new("D")));
        assert_eq!(e.boarding_time, Some(TimeOfDay::from_minutes(590)));

        let hops = e.hops();
        assert_eq!(hops.len(), 4);
        assert!(matches!(hops[0], Hop::Access { leg: 0, .. }));
        assert!(matches!(&hops[1], Hop::Ride { trip, .. } if trip == &TripId::new("L1-a")));
        assert!(matches!(hops[2], Hop::Transfer { minutes: 3, .. }));
        assert!(matches!(&hops[3], Hop::Ride { fare: 1070, .. }));
        assert_eq!(e.access_leg(), 0);

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].arrival, TimeOfDay::from_minutes(597));
    }

    #[test]
    fn boarding_needs_buffer() {
        let index = network();
        let fares = FareTable::default();
        let config = SearchConfig::default();
        // Arrive at A exactly at 575: L1-a leaves too soon, take L1-b
        let outcome = Raptor::new(&index, &fares, &config).run(
            TimeOfDay::from_minutes(570),
            &[leg("A", 5)],
            &[],
        );
        let c = &outcome.labels().unwrap()[&StopId::new("C")];
        assert_eq!(c.trip, Some(TripId::new("L1-b")));
        assert_eq!(c.arrival, TimeOfDay::from_minutes(595));
    }

    #[test]
    fn round_cap_limits_transfers() {
        let index = network();
        let outcome = run(&index, &SearchConfig::new(0));

        assert!(outcome.rounds.len() <= 1);
        for labels in &outcome.round_labels {
            assert!(labels.values().all(|l| l.transfers == 0));
        }
        // Only the direct bus reaches E
        let e = &outcome.labels().unwrap()[&StopId::new("E")];
        assert_eq!(e.route, Some(RouteId::new("BUS")));
        assert_eq!(e.arrival, TimeOfDay::from_minutes(620));
        assert_eq!(e.cost, 1200);
    }

    #[test]
    fn stops_when_nothing_improves() {
        let index = network();
        let outcome = run(&index, &SearchConfig::new(10));
        // Round 1 rides, round 2 rides again, round 3 finds nothing new
        assert!(outcome.rounds.len() < 11);
        let last = outcome.rounds.last().unwrap();
        assert_eq!(last.stops_improved + last.transfers_improved, 0);
    }

    #[test]
    fn no_access_means_no_candidates() {
        let index = network();
        let fares = FareTable::default();
        let config = SearchConfig::default();
        let outcome = Raptor::new(&index, &fares, &config).run(
            TimeOfDay::from_minutes(570),
            &[],
            &[leg("E", 2)],
        );
        assert!(outcome.candidates.is_empty());
        assert!(outcome.rounds.is_empty());
    }

    #[test]
    fn walk_only_egress_is_skipped() {
        let index = network();
        let fares = FareTable::default();
        let config = SearchConfig::default();
        let outcome = Raptor::new(&index, &fares, &config).run(
            TimeOfDay::from_minutes(570),
            &[leg("A", 3)],
            &[leg("A", 3)],
        );
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn late_departure_finds_nothing() {
        let index = network();
        let fares = FareTable::default();
        let config = SearchConfig::default();
        let outcome = Raptor::new(&index, &fares, &config).run(
            TimeOfDay::from_minutes(700),
            &[leg("A", 3)],
            &[leg("E", 2)],
        );
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn earliest_boarding_across_marked_stops() {
        // Both A and B are access stops; B's earlier label can catch L1-a
        // at 580 while A's cannot catch it at 575
        let index = network();
        let fares = FareTable::default();
        let config = SearchConfig::default();
        let outcome = Raptor::new(&index, &fares, &config).run(
            TimeOfDay::from_minutes(570),
            &[leg("A", 6), leg("B", 4)],
            &[],
        );
        let c = &outcome.labels().unwrap()[&StopId::new("C")];
        assert_eq!(c.trip, Some(TripId::new("L1-a")));
        assert_eq!(c.parent_stop, Some(StopId::new("B")));
        assert_eq!(c.access_leg(), 1);
    }

    #[test]
    fn tolerance_prefers_fewer_transfers() {
        assert!(dominates((603, 0, 1200), Some((600, 1, 2440)), 5));
        assert!(dominates((605, 0, 1200), Some((600, 1, 2440)), 5));
        assert!(!dominates((605, 1, 1200), Some((600, 1, 2440)), 5));
        assert!(!dominates((601, 1, 0), Some((600, 1, 2440)), 0));
    }

    #[test]
    fn near_tie_settles_on_earliest_arrival() {
        // The direct bus reaches E at 598, three minutes after the transfer path
        let index = NetworkIndex::build(
            vec![
                stop("A", 37.50),
                stop("B", 37.51),
                stop("C", 37.52),
                stop("D", 37.521),
                stop("E", 37.53),
            ],
            vec![
                route("L1", RouteType::Subway, &["A", "B", "C"]),
                route("L2", RouteType::Subway, &["D", "E"]),
                route("BUS", RouteType::Bus, &["A", "E"]),
            ],
            vec![
                trip("L1-a", "L1", &[("A", 575), ("B", 580), ("C", 585)]),
                trip("L2-a", "L2", &[("D", 590), ("E", 595)]),
                trip("BUS-a", "BUS", &[("A", 580), ("E", 598)]),
            ],
            vec![TransferEdge {
                from: StopId::new("C"),
                to: StopId::new("D"),
                minutes: 3,
            }],
        )
        .unwrap();

        // Taken alone, each label beats the other
        let direct = (598, 0, 1200);
        let changed = (595, 1, 2440);
        assert!(dominates(direct, Some(changed), 5));
        assert!(dominates(changed, Some(direct), 5));

        let outcome = run(&index, &SearchConfig::new(3));
        let e = StopId::new("E");
        let history: Vec<(u32, usize)> = outcome
            .round_labels
            .iter()
            .filter_map(|labels| labels.get(&e))
            .map(|l| (l.arrival.minutes(), l.transfers))
            .collect();
        assert_eq!(history[0], (598, 0));
        assert!(history.len() >= 2);
        assert!(history[1..].iter().all(|&h| h == (595, 1)), "{history:?}");

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].label.trip, Some(TripId::new("L2-a")));
    }
}

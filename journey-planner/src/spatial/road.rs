//! Road network and shortest-path queries for walking and cycling.
//!
//! Nodes are dense integer ids with a coordinate table. Each undirected
//! edge stores its length, also in whole metres so Dijkstra runs on
//! integers. A profile travels at one constant speed, so the shortest path
//! is the fastest one and durations follow from the distance.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::domain::Coord;

/// Road distance over straight-line distance, used when no graph path exists.
pub const DETOUR_FACTOR: f64 = 1.3;

/// Endpoints further than this from any node are not snapped.
pub const DEFAULT_SNAP_RADIUS_KM: f64 = 0.5;

/// Dense node index into the coordinate table.
pub type NodeId = u32;

/// Travel profile for road queries, with its speed in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Profile {
    Walk { speed_kmh: f64 },
    Bike { speed_kmh: f64 },
}

impl Profile {
    /// Walking at 4.5 km/h.
    pub const WALK: Profile = Profile::Walk { speed_kmh: 4.5 };
    /// Cycling at 12 km/h.
    pub const BIKE: Profile = Profile::Bike { speed_kmh: 12.0 };

    pub fn speed_kmh(self) -> f64 {
        match self {
            Profile::Walk { speed_kmh } | Profile::Bike { speed_kmh } => speed_kmh,
        }
    }

    /// Minutes to cover `distance_km`.
    pub fn minutes(self, distance_km: f64) -> f64 {
        distance_km / self.speed_kmh() * 60.0
    }
}

/// A latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Coord,
    pub max: Coord,
}

impl Bounds {
    pub fn new(min: Coord, max: Coord) -> Self {
        Self { min, max }
    }
}

/// Result of a road query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedPath {
    pub duration_mins: f64,
    pub distance_km: f64,
    pub coords: Vec<Coord>,
    /// True when the straight-line estimate was used instead of the graph.
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: NodeId,
    distance_km: f64,
    length_m: u32,
}

/// Read-only undirected road graph.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    coords: Vec<Coord>,
    adjacency: Vec<Vec<Edge>>,
    snap_radius_km: f64,
}

impl RoadGraph {
    pub fn builder() -> RoadGraphBuilder {
        RoadGraphBuilder::new()
    }

    /// A regular grid over `bounds` with nodes roughly `spacing_km` apart.
    ///
    /// Each node connects to its horizontal, vertical and diagonal
    /// neighbours. Used when no surveyed road network is available.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_planner::domain::Coord;
    /// use journey_planner::spatial::{Bounds, RoadGraph};
    ///
    /// let bounds = Bounds::new(Coord::new(37.49, 127.01), Coord::new(37.50, 127.02));
    /// let graph = RoadGraph::grid(bounds, 0.25);
    /// assert!(graph.node_count() > 16);
    /// ```
    pub fn grid(bounds: Bounds, spacing_km: f64) -> Self {
        let mid_lat = (bounds.min.lat + bounds.max.lat) / 2.0;
        let lat_step = spacing_km / 111.0;
        let lon_step = spacing_km / (111.0 * mid_lat.to_radians().cos());

        let rows = (((bounds.max.lat - bounds.min.lat) / lat_step).ceil() as usize).max(1) + 1;
        let cols = (((bounds.max.lon - bounds.min.lon) / lon_step).ceil() as usize).max(1) + 1;

        let mut builder = RoadGraphBuilder::new();
        let mut ids = vec![vec![0; cols]; rows];
        for (r, row) in ids.iter_mut().enumerate() {
            for (c, id) in row.iter_mut().enumerate() {
                *id = builder.node(Coord::new(
                    bounds.min.lat + r as f64 * lat_step,
                    bounds.min.lon + c as f64 * lon_step,
                ));
            }
        }

        for r in 0..rows {
            for c in 0..cols {
                let here = ids[r][c];
                if c + 1 < cols {
                    builder.connect(here, ids[r][c + 1]);
                }
                if r + 1 < rows {
                    builder.connect(here, ids[r + 1][c]);
                    if c + 1 < cols {
                        builder.connect(here, ids[r + 1][c + 1]);
                    }
                    if c > 0 {
                        builder.connect(here, ids[r + 1][c - 1]);
                    }
                }
            }
        }

        builder.build()
    }

    pub fn node_count(&self) -> usize {
        self.coords.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coord(&self, node: NodeId) -> Option<Coord> {
        self.coords.get(node as usize).copied()
    }

    pub fn snap_radius_km(&self) -> f64 {
        self.snap_radius_km
    }

    /// Nearest node within the snap radius.
    pub fn snap(&self, point: Coord) -> Option<NodeId> {
        self.coords
            .iter()
            .enumerate()
            .map(|(i, c)| (i, point.haversine_km(c)))
            .filter(|(_, d)| *d <= self.snap_radius_km)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i as NodeId)
    }

    /// Shortest path between two points for `profile`.
    ///
    /// Both endpoints are snapped to the nearest node and Dijkstra runs on
    /// edge length; the duration is that length at the profile's speed. The
    /// returned path starts at `from` and ends at `to`; the snapping walk
    /// itself is not costed. If an endpoint
    /// cannot be snapped or the nodes are disconnected, the result is a
    /// straight-line estimate: haversine distance times [`DETOUR_FACTOR`]
    /// at the profile's speed, with a two-point path.
    pub fn shortest_path(&self, from: Coord, to: Coord, profile: Profile) -> RoutedPath {
        let (Some(source), Some(target)) = (self.snap(from), self.snap(to)) else {
            debug!(?from, ?to, ?profile, "endpoint not snapped, using straight line");
            return straight_line(from, to, profile);
        };

        match self.dijkstra(source, target) {
            Some((distance_km, nodes)) => {
                let mut coords = Vec::with_capacity(nodes.len() + 2);
                coords.push(from);
                for node in nodes {
                    let c = self.coords[node as usize];
                    if coords.last() != Some(&c) {
                        coords.push(c);
                    }
                }
                if coords.last() != Some(&to) {
                    coords.push(to);
                }
                RoutedPath {
                    duration_mins: profile.minutes(distance_km),
                    distance_km,
                    coords,
                    fallback: false,
                }
            }
            None => {
                debug!(source, target, ?profile, "no road path, using straight line");
                straight_line(from, to, profile)
            }
        }
    }

    fn dijkstra(&self, source: NodeId, target: NodeId) -> Option<(f64, Vec<NodeId>)> {
        let n = self.coords.len();
        let mut dist = vec![u32::MAX; n];
        let mut dist_km = vec![0.0; n];
        let mut prev: Vec<Option<NodeId>> = vec![None; n];
        let mut pq: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();

        dist[source as usize] = 0;
        pq.push(Reverse((0, source)));

        while let Some(Reverse((d, u))) = pq.pop() {
            if u == target {
                break;
            }
            if d > dist[u as usize] {
                continue;
            }
            for edge in &self.adjacency[u as usize] {
                let v = edge.to as usize;
                let nd = d.saturating_add(edge.length_m);
                if nd < dist[v] {
                    dist[v] = nd;
                    dist_km[v] = dist_km[u as usize] + edge.distance_km;
                    prev[v] = Some(u);
                    pq.push(Reverse((nd, edge.to)));
                }
            }
        }

        if dist[target as usize] == u32::MAX {
            return None;
        }

        let mut path = vec![target];
        let mut at = target;
        while let Some(p) = prev[at as usize] {
            path.push(p);
            at = p;
        }
        path.reverse();

        Some((dist_km[target as usize], path))
    }
}

fn straight_line(from: Coord, to: Coord, profile: Profile) -> RoutedPath {
    let distance_km = from.haversine_km(&to) * DETOUR_FACTOR;
    RoutedPath {
        duration_mins: profile.minutes(distance_km),
        distance_km,
        coords: vec![from, to],
        fallback: true,
    }
}

/// Incremental road graph construction.
///
/// Nodes are deduplicated by coordinate (to about 1e-7 degrees), so
/// loaders can add segment endpoints without tracking ids themselves.
#[derive(Debug, Clone)]
pub struct RoadGraphBuilder {
    coords: Vec<Coord>,
    adjacency: Vec<Vec<Edge>>,
    by_position: HashMap<(i64, i64), NodeId>,
    snap_radius_km: f64,
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self {
            coords: Vec::new(),
            adjacency: Vec::new(),
            by_position: HashMap::new(),
            snap_radius_km: DEFAULT_SNAP_RADIUS_KM,
        }
    }

    pub fn snap_radius_km(mut self, radius_km: f64) -> Self {
        self.snap_radius_km = radius_km;
        self
    }

    /// Id of the node at `coord`, adding it if new.
    pub fn node(&mut self, coord: Coord) -> NodeId {
        let key = (
            (coord.lat * 1e7).round() as i64,
            (coord.lon * 1e7).round() as i64,
        );
        if let Some(&id) = self.by_position.get(&key) {
            return id;
        }
        let id = self.coords.len() as NodeId;
        self.coords.push(coord);
        self.adjacency.push(Vec::new());
        self.by_position.insert(key, id);
        id
    }

    /// Connect two nodes with an edge as long as their straight-line distance.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        let (Some(ca), Some(cb)) = (self.coords.get(a as usize), self.coords.get(b as usize))
        else {
            return;
        };
        let distance_km = ca.haversine_km(cb);
        self.edge(a, b, distance_km);
    }

    /// Add an undirected edge of `distance_km`.
    ///
    /// Self-loops and edges to unknown nodes are ignored.
    pub fn edge(&mut self, a: NodeId, b: NodeId, distance_km: f64) {
        let n = self.coords.len() as NodeId;
        if a == b || a >= n || b >= n {
            return;
        }
        let length_m = (distance_km * 1000.0).round() as u32;
        self.adjacency[a as usize].push(Edge {
            to: b,
            distance_km,
            length_m,
        });
        self.adjacency[b as usize].push(Edge {
            to: a,
            distance_km,
            length_m,
        });
    }

    /// Add an edge between two coordinates, creating nodes as needed.
    pub fn segment(&mut self, a: Coord, b: Coord) {
        let a = self.node(a);
        let b = self.node(b);
        self.connect(a, b);
    }

    pub fn build(self) -> RoadGraph {
        RoadGraph {
            coords: self.coords,
            adjacency: self.adjacency,
            snap_radius_km: self.snap_radius_km,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Queries never fail, whatever the graph and endpoints
        #[test]
        fn shortest_path_never_fails(
            segments in proptest::collection::vec(
                ((37.49f64..37.51, 127.01f64..127.03), (37.49f64..37.51, 127.01f64..127.03)),
                0..12,
            ),
            from in (37.45f64..37.55, 126.98f64..127.06),
            to in (37.45f64..37.55, 126.98f64..127.06),
            bike in any::<bool>(),
        ) {
            let mut builder = RoadGraph::builder();
            for ((alat, alon), (blat, blon)) in segments {
                builder.segment(Coord::new(alat, alon), Coord::new(blat, blon));
            }
            let graph = builder.build();
            let profile = if bike { Profile::BIKE } else { Profile::WALK };

            let from = Coord::new(from.0, from.1);
            let to = Coord::new(to.0, to.1);
            let path = graph.shortest_path(from, to, profile);

            prop_assert!(path.duration_mins.is_finite() && path.duration_mins >= 0.0);
            prop_assert!(path.distance_km.is_finite() && path.distance_km >= 0.0);
            prop_assert!(path.coords.len() >= 2 || from == to);
            prop_assert_eq!(path.coords.first(), Some(&from));
        }
    }
}

//! Fixed-time transfer edges between nearby stops.
//!
//! Stops close enough to walk between can be used to change between
//! routes that never share a stop. Edges are symmetric: if you can walk
//! from A to B, you can walk from B to A in the same time.

use std::collections::HashMap;

use crate::domain::{Coord, StopId};

/// Transfer durations are clamped to this range (minutes).
pub const MIN_TRANSFER_MINS: u32 = 2;
pub const MAX_TRANSFER_MINS: u32 = 8;

/// Walking pace used to turn a transfer distance into minutes.
const TRANSFER_WALK_METRES_PER_MIN: f64 = 80.0;

/// A raw transfer record as supplied by a loader.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEdge {
    pub from: StopId,
    pub to: StopId,
    pub minutes: u32,
}

/// One outgoing transfer from a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub to: StopId,
    pub minutes: u32,
}

/// Transfer adjacency keyed by stop.
#[derive(Debug, Clone, Default)]
pub struct TransferEdges {
    adjacency: HashMap<StopId, Vec<Transfer>>,
}

impl TransferEdges {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transfer between two stops.
    ///
    /// The edge is stored symmetrically and the duration is clamped to
    /// [`MIN_TRANSFER_MINS`, `MAX_TRANSFER_MINS`]. Adding an existing pair
    /// replaces its duration in both directions. Self-loops are ignored.
    pub fn add(&mut self, from: StopId, to: StopId, minutes: u32) {
        if from == to {
            return;
        }
        let minutes = minutes.clamp(MIN_TRANSFER_MINS, MAX_TRANSFER_MINS);
        self.upsert(from.clone(), to.clone(), minutes);
        self.upsert(to, from, minutes);
    }

    fn upsert(&mut self, from: StopId, to: StopId, minutes: u32) {
        let edges = self.adjacency.entry(from).or_default();
        match edges.iter_mut().find(|t| t.to == to) {
            Some(existing) => existing.minutes = minutes,
            None => edges.push(Transfer { to, minutes }),
        }
    }

    /// Get the transfer duration between two stops, if connected.
    pub fn get(&self, from: &StopId, to: &StopId) -> Option<u32> {
        self.from_stop(from)
            .iter()
            .find(|t| &t.to == to)
            .map(|t| t.minutes)
    }

    /// All transfers leaving `from`.
    pub fn from_stop(&self, from: &StopId) -> &[Transfer] {
        self.adjacency
            .get(from)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over every directed edge as `(from, to, minutes)`.
    pub fn edges(&self) -> impl Iterator<Item = (&StopId, &StopId, u32)> {
        self.adjacency
            .iter()
            .flat_map(|(from, ts)| ts.iter().map(move |t| (from, &t.to, t.minutes)))
    }

    /// Returns the number of stop pairs (counting A→B and B→A as one).
    pub fn len(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }

    /// Returns true if there are no transfers.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Derive transfer edges between every pair of stops within `radius_km`.
    ///
    /// The duration is the straight-line distance at 80 m/min, rounded
    /// down and clamped to [2, 8] minutes.
    pub fn within_radius<'a, I>(stops: I, radius_km: f64) -> Vec<TransferEdge>
    where
        I: IntoIterator<Item = (&'a StopId, Coord)>,
    {
        let stops: Vec<(&StopId, Coord)> = stops.into_iter().collect();
        let mut edges = Vec::new();

        for (i, (a, a_coord)) in stops.iter().enumerate() {
            for (b, b_coord) in &stops[i + 1..] {
                let distance_km = a_coord.haversine_km(b_coord);
                if distance_km <= radius_km {
                    edges.push(TransferEdge {
                        from: (*a).clone(),
                        to: (*b).clone(),
                        minutes: transfer_minutes(distance_km),
                    });
                }
            }
        }

        edges
    }
}

impl FromIterator<TransferEdge> for TransferEdges {
    fn from_iter<T: IntoIterator<Item = TransferEdge>>(iter: T) -> Self {
        let mut edges = TransferEdges::new();
        for e in iter {
            edges.add(e.from, e.to, e.minutes);
        }
        edges
    }
}

/// Minutes to walk a transfer of `distance_km`.
pub fn transfer_minutes(distance_km: f64) -> u32 {
    let mins = (distance_km * 1000.0 / TRANSFER_WALK_METRES_PER_MIN).floor() as u32;
    mins.clamp(MIN_TRANSFER_MINS, MAX_TRANSFER_MINS)
}

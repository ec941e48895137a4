//! Journey selection for search results.
//!
//! Narrows the candidates from every mode down to a small, varied answer:
//! the best journeys of each category by time, cost and transfers, with
//! near-duplicates removed, scored against the rider's weights and
//! diversified so each category that produced anything is represented.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Journey, JourneyCategory};

use super::config::Preferences;

/// Journeys closer than all of these (and of the same category) are
/// treated as the same option.
const SIMILAR_TIME_MINS: u32 = 5;
const SIMILAR_COST: u32 = 200;
const SIMILAR_TRANSFERS: usize = 1;

/// Values at which each score term saturates.
const SCORE_TIME_MINS: f64 = 60.0;
const SCORE_COST: f64 = 3000.0;
const SCORE_TRANSFERS: f64 = 3.0;

/// Select at most `max_routes` journeys, best-first.
///
/// Every returned journey carries its score.
pub fn select_journeys(
    candidates: Vec<Journey>,
    prefs: &Preferences,
    max_routes: usize,
) -> Vec<Journey> {
    let frontier = best_per_category(candidates);
    let mut scored: Vec<Journey> = remove_similar(frontier)
        .into_iter()
        .map(|j| {
            let s = score(&j, prefs);
            j.with_score(s)
        })
        .collect();
    scored.sort_by(|a, b| score_of(a).total_cmp(&score_of(b)));
    diversify(scored, max_routes)
}

/// Per category, keep the fastest, the cheapest and the one with fewest
/// transfers.
///
/// A journey that wins several criteria is kept once. Ties go to the
/// earlier candidate.
pub fn best_per_category(journeys: Vec<Journey>) -> Vec<Journey> {
    let mut picked: Vec<usize> = Vec::new();

    for category in JourneyCategory::ALL {
        let group: Vec<(usize, &Journey)> = journeys
            .iter()
            .enumerate()
            .filter(|(_, j)| j.category() == category)
            .collect();

        let winners = [
            group.iter().min_by_key(|(_, j)| j.total_time_mins()),
            group.iter().min_by_key(|(_, j)| j.total_cost()),
            group.iter().min_by_key(|(_, j)| j.total_transfers()),
        ];
        for (i, _) in winners.into_iter().flatten() {
            if !picked.contains(i) {
                picked.push(*i);
            }
        }
    }

    let mut slots: Vec<Option<Journey>> = journeys.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

/// True if two journeys are effectively the same option.
pub fn are_similar(a: &Journey, b: &Journey) -> bool {
    a.category() == b.category()
        && a.total_time_mins().abs_diff(b.total_time_mins()) <= SIMILAR_TIME_MINS
        && a.total_cost().abs_diff(b.total_cost()) <= SIMILAR_COST
        && a.total_transfers().abs_diff(b.total_transfers()) <= SIMILAR_TRANSFERS
}

/// Drop journeys similar to one kept earlier.
pub fn remove_similar(journeys: Vec<Journey>) -> Vec<Journey> {
    let mut result: Vec<Journey> = Vec::with_capacity(journeys.len());
    for journey in journeys {
        if !result.iter().any(|kept| are_similar(kept, &journey)) {
            result.push(journey);
        }
    }
    result
}

/// Weighted score, lower is better.
///
/// Each term is normalized and capped at 1: time against an hour, cost
/// against 3000, transfers against 3.
///
/// # Examples
///
/// ```
/// use journey_planner::domain::{Journey, Place, Segment, TimeOfDay};
/// use journey_planner::planner::{Preferences, score};
///
/// let walk = Segment::walk(Place::Origin, Place::Destination, 30, 2.2, vec![]);
/// let journey = Journey::new(TimeOfDay::from_minutes(570), vec![walk]).unwrap();
///
/// // 0.5 * 30/60
/// assert!((score(&journey, &Preferences::default()) - 0.25).abs() < 1e-9);
/// ```
pub fn score(journey: &Journey, prefs: &Preferences) -> f64 {
    let time = (f64::from(journey.total_time_mins()) / SCORE_TIME_MINS).min(1.0);
    let cost = (f64::from(journey.total_cost()) / SCORE_COST).min(1.0);
    let transfers = (journey.total_transfers() as f64 / SCORE_TRANSFERS).min(1.0);
    prefs.time_weight * time + prefs.cost_weight * cost + prefs.transfer_weight * transfers
}

fn score_of(journey: &Journey) -> f64 {
    journey.score().unwrap_or(f64::INFINITY)
}

/// Trim a score-sorted list to `max_routes`, keeping the best journey of
/// every category first.
///
/// Lists that already fit are returned unchanged. If there are more
/// categories than slots, the best-scoring category winners are kept.
pub fn diversify(journeys: Vec<Journey>, max_routes: usize) -> Vec<Journey> {
    if journeys.len() <= max_routes {
        return journeys;
    }

    let mut chosen: Vec<usize> = Vec::with_capacity(max_routes);
    for category in JourneyCategory::ALL {
        let best = journeys
            .iter()
            .enumerate()
            .filter(|(_, j)| j.category() == category)
            .min_by(|(_, a), (_, b)| score_of(a).total_cmp(&score_of(b)));
        if let Some((i, _)) = best {
            chosen.push(i);
        }
    }
    chosen.sort_by(|&a, &b| score_of(&journeys[a]).total_cmp(&score_of(&journeys[b])));
    chosen.truncate(max_routes);

    let fill: Vec<usize> = (0..journeys.len())
        .filter(|i| !chosen.contains(i))
        .take(max_routes - chosen.len())
        .collect();
    chosen.extend(fill);

    chosen.sort_by(|&a, &b| {
        score_of(&journeys[a])
            .total_cmp(&score_of(&journeys[b]))
            .then(a.cmp(&b))
    });

    let mut slots: Vec<Option<Journey>> = journeys.into_iter().map(Some).collect();
    chosen
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

/// Aggregates over a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub journeys: usize,
    pub by_category: BTreeMap<JourneyCategory, usize>,
    pub avg_time_mins: f64,
    pub avg_cost: f64,
    pub avg_transfers: f64,
}

impl ResultSummary {
    pub fn from_journeys(journeys: &[Journey]) -> Self {
        let mut by_category = BTreeMap::new();
        for j in journeys {
            *by_category.entry(j.category()).or_insert(0) += 1;
        }

        let n = journeys.len().max(1) as f64;
        let avg = |f: fn(&Journey) -> f64| journeys.iter().map(f).sum::<f64>() / n;

        Self {
            journeys: journeys.len(),
            by_category,
            avg_time_mins: avg(|j| f64::from(j.total_time_mins())),
            avg_cost: avg(|j| f64::from(j.total_cost())),
            avg_transfers: avg(|j| j.total_transfers() as f64),
        }
    }
}

//! Journey types.
//!
//! A `Journey` is a complete door-to-door trip from the query origin to the
//! query destination, made of walking, bike and transit segments. Totals
//! are derived from the segments when the journey is built and never change
//! afterwards; the selector only attaches a score.

use std::fmt;

use serde::Serialize;

use super::{BikeStationId, Coord, DomainError, RouteId, RouteType, StopId, TimeOfDay, TripId};

/// An endpoint of a segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Place {
    /// The query origin.
    Origin,
    /// The query destination.
    Destination,
    /// A transit stop.
    Stop { id: StopId, name: String },
    /// A bike rental station.
    BikeStation { id: BikeStationId, name: String },
}

impl Place {
    /// Returns a display name for the place.
    pub fn name(&self) -> &str {
        match self {
            Place::Origin => "origin",
            Place::Destination => "destination",
            Place::Stop { name, .. } => name,
            Place::BikeStation { name, .. } => name,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a segment is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMode {
    Walk,
    Bike,
    BikeRental,
    BikeReturn,
    Transit,
    Wait,
}

impl SegmentMode {
    /// Returns true for segments spent aboard a vehicle.
    pub fn is_vehicle(&self) -> bool {
        matches!(self, SegmentMode::Bike | SegmentMode::Transit)
    }
}

/// Route details attached to a transit segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitInfo {
    pub route_id: RouteId,
    pub route_name: String,
    pub route_type: RouteType,
    /// The boarded trip, absent when the ride time is an estimate.
    pub trip_id: Option<TripId>,
}

/// One leg of a journey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub mode: SegmentMode,
    pub from: Place,
    pub to: Place,
    pub duration_mins: u32,
    pub distance_km: f64,
    pub cost: u32,
    pub coordinates: Vec<Coord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit: Option<TransitInfo>,
}

impl Segment {
    /// A walk between two places.
    pub fn walk(
        from: Place,
        to: Place,
        duration_mins: u32,
        distance_km: f64,
        coordinates: Vec<Coord>,
    ) -> Self {
        Self {
            mode: SegmentMode::Walk,
            from,
            to,
            duration_mins,
            distance_km,
            cost: 0,
            coordinates,
            transit: None,
        }
    }

    /// A bike ride between two places.
    pub fn bike(
        from: Place,
        to: Place,
        duration_mins: u32,
        distance_km: f64,
        cost: u32,
        coordinates: Vec<Coord>,
    ) -> Self {
        Self {
            mode: SegmentMode::Bike,
            from,
            to,
            duration_mins,
            distance_km,
            cost,
            coordinates,
            transit: None,
        }
    }

    /// Time spent unlocking a bike at a station.
    pub fn bike_rental(station: Place, duration_mins: u32) -> Self {
        Self::stationary(SegmentMode::BikeRental, station, duration_mins)
    }

    /// Time spent docking a bike at a station.
    pub fn bike_return(station: Place, duration_mins: u32) -> Self {
        Self::stationary(SegmentMode::BikeReturn, station, duration_mins)
    }

    /// Time spent waiting for a departure.
    pub fn wait(at: Place, duration_mins: u32) -> Self {
        Self::stationary(SegmentMode::Wait, at, duration_mins)
    }

    /// A ride on a transit route.
    pub fn transit(
        from: Place,
        to: Place,
        duration_mins: u32,
        distance_km: f64,
        cost: u32,
        info: TransitInfo,
        coordinates: Vec<Coord>,
    ) -> Self {
        Self {
            mode: SegmentMode::Transit,
            from,
            to,
            duration_mins,
            distance_km,
            cost,
            coordinates,
            transit: Some(info),
        }
    }

    fn stationary(mode: SegmentMode, at: Place, duration_mins: u32) -> Self {
        Self {
            mode,
            from: at.clone(),
            to: at,
            duration_mins,
            distance_km: 0.0,
            cost: 0,
            coordinates: Vec::new(),
            transit: None,
        }
    }
}

/// Coarse classification used to group and diversify results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyCategory {
    Walk,
    Bike,
    Transit,
    Mixed,
}

impl JourneyCategory {
    /// All categories in presentation order.
    pub const ALL: [JourneyCategory; 4] = [
        JourneyCategory::Walk,
        JourneyCategory::Bike,
        JourneyCategory::Transit,
        JourneyCategory::Mixed,
    ];

    fn classify(segments: &[Segment]) -> Self {
        let has_transit = segments.iter().any(|s| s.mode == SegmentMode::Transit);
        let has_bike = segments.iter().any(|s| s.mode == SegmentMode::Bike);
        match (has_transit, has_bike) {
            (true, true) => JourneyCategory::Mixed,
            (true, false) => JourneyCategory::Transit,
            (false, true) => JourneyCategory::Bike,
            (false, false) => JourneyCategory::Walk,
        }
    }
}

impl fmt::Display for JourneyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JourneyCategory::Walk => "walk",
            JourneyCategory::Bike => "bike",
            JourneyCategory::Transit => "transit",
            JourneyCategory::Mixed => "mixed",
        };
        f.write_str(s)
    }
}

/// A complete journey from origin to destination.
///
/// # Invariants
///
/// - At least one segment
/// - Consecutive segments connect (destination of one = origin of next)
/// - Totals equal the sums over the segments
#[derive(Debug, Clone, Serialize)]
pub struct Journey {
    category: JourneyCategory,
    departure_time: TimeOfDay,
    arrival_time: TimeOfDay,
    total_time_mins: u32,
    total_cost: u32,
    total_transfers: usize,
    total_distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    segments: Vec<Segment>,
}

impl Journey {
    /// Constructs a journey departing at `departure_time`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the segment list is empty or consecutive segments
    /// don't connect.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_planner::domain::{Coord, Journey, JourneyCategory, Place, Segment, TimeOfDay};
    ///
    /// let walk = Segment::walk(
    ///     Place::Origin,
    ///     Place::Destination,
    ///     12,
    ///     0.9,
    ///     vec![Coord::new(37.50, 127.02), Coord::new(37.505, 127.03)],
    /// );
    /// let journey = Journey::new(TimeOfDay::from_minutes(570), vec![walk]).unwrap();
    ///
    /// assert_eq!(journey.category(), JourneyCategory::Walk);
    /// assert_eq!(journey.arrival_time().to_string(), "09:42");
    /// assert_eq!(journey.total_cost(), 0);
    /// ```
    pub fn new(departure_time: TimeOfDay, segments: Vec<Segment>) -> Result<Self, DomainError> {
        if segments.is_empty() {
            return Err(DomainError::EmptyJourney);
        }

        for window in segments.windows(2) {
            if window[0].to != window[1].from {
                return Err(DomainError::PlacesNotConnected(
                    window[0].to.to_string(),
                    window[1].from.to_string(),
                ));
            }
        }

        let total_time_mins = segments.iter().map(|s| s.duration_mins).sum();
        let total_cost = segments.iter().map(|s| s.cost).sum();
        let total_distance_km = segments.iter().map(|s| s.distance_km).sum();
        let vehicles = segments.iter().filter(|s| s.mode.is_vehicle()).count();

        Ok(Journey {
            category: JourneyCategory::classify(&segments),
            departure_time,
            arrival_time: departure_time + total_time_mins,
            total_time_mins,
            total_cost,
            total_transfers: vehicles.saturating_sub(1),
            total_distance_km,
            score: None,
            segments,
        })
    }

    /// Returns a copy of this journey carrying a selector score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Returns all segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the journey's category.
    pub fn category(&self) -> JourneyCategory {
        self.category
    }

    /// Returns the departure time from the origin.
    pub fn departure_time(&self) -> TimeOfDay {
        self.departure_time
    }

    /// Returns the arrival time at the destination.
    pub fn arrival_time(&self) -> TimeOfDay {
        self.arrival_time
    }

    /// Door-to-door time in minutes.
    pub fn total_time_mins(&self) -> u32 {
        self.total_time_mins
    }

    /// Total fare.
    pub fn total_cost(&self) -> u32 {
        self.total_cost
    }

    /// Number of vehicle changes (vehicle segments minus one).
    pub fn total_transfers(&self) -> usize {
        self.total_transfers
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    /// Selector score, lower is better. `None` until the journey is ranked.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Returns the first place of the journey.
    pub fn origin(&self) -> &Place {
        // Safe: validated non-empty at construction
        &self.segments[0].from
    }

    /// Returns the last place of the journey.
    pub fn destination(&self) -> &Place {
        // Safe: validated non-empty at construction
        &self.segments[self.segments.len() - 1].to
    }

    /// Concatenated path of all segments with repeated joints removed.
    pub fn route_coordinates(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = Vec::new();
        for c in self.segments.iter().flat_map(|s| s.coordinates.iter()) {
            if coords.last() != Some(c) {
                coords.push(*c);
            }
        }
        coords
    }

    /// Number of transit rides.
    pub fn ride_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.mode == SegmentMode::Transit)
            .count()
    }
}

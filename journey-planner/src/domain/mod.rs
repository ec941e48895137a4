//! Domain types for the journey planner.
//!
//! This module contains the core value types shared by the network index,
//! the road queries and the planner. Types enforce their invariants at
//! construction time, so code that receives them can trust their validity.

mod error;
mod fare;
mod geo;
mod ids;
mod journey;
mod time;

pub use error::DomainError;
pub use fare::{FareTable, RouteType};
pub use geo::Coord;
pub use ids::{BikeStationId, RouteId, StopId, TripId};
pub use journey::{Journey, JourneyCategory, Place, Segment, SegmentMode, TransitInfo};
pub use time::TimeOfDay;

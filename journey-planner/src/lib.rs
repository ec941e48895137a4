//! Multi-modal journey planner.
//!
//! Answers: "I'm at this point at this time, how do I get to that point?"
//! by combining walking, shared bikes and scheduled transit. The transit
//! part is a round-based search (RAPTOR) over an immutable timetable index;
//! walk, bike and bike-then-transit options are generated alongside it and
//! the results are narrowed to a short, varied list.

pub mod domain;
pub mod network;
pub mod planner;
pub mod sample;
pub mod spatial;

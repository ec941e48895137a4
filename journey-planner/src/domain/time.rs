//! Time-of-day handling.
//!
//! Timetables and queries express times as minutes since midnight. The
//! planner works on a single service day, so no date is carried; times past
//! 24:00 are allowed for trips that run over midnight but are never
//! wrapped.

use std::fmt;
use std::ops::Add;

use chrono::{NaiveTime, Timelike};
use serde::{Serialize, Serializer};

use super::DomainError;

/// Minutes since midnight of the service day.
///
/// # Examples
///
/// ```
/// use journey_planner::domain::TimeOfDay;
///
/// let t = TimeOfDay::parse_hhmm("09:30").unwrap();
/// assert_eq!(t.minutes(), 570);
/// assert_eq!((t + 45).to_string(), "10:15");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    /// Create a time from minutes since midnight.
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Parse a time from "HH:MM" format.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_planner::domain::TimeOfDay;
    ///
    /// assert!(TimeOfDay::parse_hhmm("00:00").is_ok());
    /// assert!(TimeOfDay::parse_hhmm("23:59").is_ok());
    ///
    /// assert!(TimeOfDay::parse_hhmm("0930").is_err());
    /// assert!(TimeOfDay::parse_hhmm("9:30").is_err());
    /// assert!(TimeOfDay::parse_hhmm("24:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, DomainError> {
        if s.len() != 5 {
            return Err(DomainError::InvalidTime("expected HH:MM format"));
        }

        let bytes = s.as_bytes();
        if bytes[2] != b':' {
            return Err(DomainError::InvalidTime("expected colon at position 2"));
        }

        let hour = parse_two_digits(&bytes[0..2])
            .ok_or(DomainError::InvalidTime("invalid hour digits"))?;
        if hour > 23 {
            return Err(DomainError::InvalidTime("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or(DomainError::InvalidTime("invalid minute digits"))?;
        if minute > 59 {
            return Err(DomainError::InvalidTime("minute must be 0-59"));
        }

        Ok(Self(hour * 60 + minute))
    }

    /// Convert from a chrono time, dropping seconds.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self(time.hour() * 60 + time.minute())
    }

    /// Returns minutes since midnight.
    pub const fn minutes(&self) -> u32 {
        self.0
    }

    /// Returns the minutes elapsed since `earlier`, or zero if `earlier` is later.
    pub fn minutes_since(&self, earlier: TimeOfDay) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    match bytes {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some(u32::from(a - b'0') * 10 + u32::from(b - b'0'))
        }
        _ => None,
    }
}

impl Add<u32> for TimeOfDay {
    type Output = Self;

    fn add(self, minutes: u32) -> Self::Output {
        Self(self.0.saturating_add(minutes))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl fmt::Debug for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeOfDay({self})")
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        assert_eq!(TimeOfDay::parse_hhmm("00:00").unwrap().minutes(), 0);
        assert_eq!(TimeOfDay::parse_hhmm("09:30").unwrap().minutes(), 570);
        assert_eq!(TimeOfDay::parse_hhmm("23:59").unwrap().minutes(), 1439);
    }

    #[test]
    fn parse_invalid() {
        assert!(TimeOfDay::parse_hhmm("").is_err());
        assert!(TimeOfDay::parse_hhmm("12-30").is_err());
        assert!(TimeOfDay::parse_hhmm("1a:30").is_err());
        assert!(TimeOfDay::parse_hhmm("12:60").is_err());
        assert!(TimeOfDay::parse_hhmm("12:300").is_err());
    }

    #[test]
    fn display_past_midnight() {
        assert_eq!(TimeOfDay::from_minutes(25 * 60 + 5).to_string(), "25:05");
    }

    #[test]
    fn from_chrono() {
        let t = NaiveTime::from_hms_opt(8, 15, 42).unwrap();
        assert_eq!(TimeOfDay::from_naive_time(t).minutes(), 495);
    }

    #[test]
    fn minutes_since_saturates() {
        let a = TimeOfDay::from_minutes(600);
        let b = TimeOfDay::from_minutes(630);
        assert_eq!(b.minutes_since(a), 30);
        assert_eq!(a.minutes_since(b), 0);
    }

    #[test]
    fn serializes_as_hhmm() {
        let t = TimeOfDay::from_minutes(570);
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:30\"");
    }
}

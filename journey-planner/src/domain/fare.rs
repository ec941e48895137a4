//! Fare model.
//!
//! Flat fare per boarding by route type, a fixed discount on every boarding
//! after the first, and a bike rental fare charged per started overage
//! period.

use serde::{Deserialize, Serialize};

/// Discriminates rail from road services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Subway,
    Bus,
}

impl RouteType {
    /// Map a GTFS `route_type` code. Anything that is not metro/subway (1)
    /// is treated as a bus.
    pub fn from_gtfs(code: u16) -> Self {
        match code {
            1 => RouteType::Subway,
            _ => RouteType::Bus,
        }
    }
}

/// Fare constants in currency units (KRW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareTable {
    /// Base fare for a subway boarding.
    pub subway_base: u32,

    /// Base fare for a bus boarding.
    pub bus_base: u32,

    /// Subtracted from every boarding after the first.
    pub transfer_discount: u32,

    /// Bike rental fare covering the included period.
    pub bike_base: u32,

    /// Minutes covered by `bike_base`.
    pub bike_included_mins: u32,

    /// Fare for each started overage period.
    pub bike_overage_fare: u32,

    /// Length of an overage period in minutes.
    pub bike_overage_period_mins: u32,
}

impl FareTable {
    /// Base fare of a boarding on a route of the given type.
    pub fn base_fare(&self, route_type: RouteType) -> u32 {
        match route_type {
            RouteType::Subway => self.subway_base,
            RouteType::Bus => self.bus_base,
        }
    }

    /// Fare of a boarding, given whether the traveller already rode a vehicle.
    pub fn boarding_fare(&self, route_type: RouteType, is_transfer: bool) -> u32 {
        let base = self.base_fare(route_type);
        if is_transfer {
            base.saturating_sub(self.transfer_discount)
        } else {
            base
        }
    }

    /// Rental fare for a ride of `minutes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_planner::domain::FareTable;
    ///
    /// let fares = FareTable::default();
    /// assert_eq!(fares.bike_cost(30.0), 1000);
    /// assert_eq!(fares.bike_cost(45.0), 2000);
    /// assert_eq!(fares.bike_cost(61.0), 3000);
    /// ```
    pub fn bike_cost(&self, minutes: f64) -> u32 {
        let included = f64::from(self.bike_included_mins);
        if minutes <= included {
            return self.bike_base;
        }
        let period = f64::from(self.bike_overage_period_mins.max(1));
        let periods = ((minutes - included) / period).ceil() as u32;
        self.bike_base + periods * self.bike_overage_fare
    }
}

impl Default for FareTable {
    fn default() -> Self {
        Self {
            subway_base: 1370,
            bus_base: 1200,
            transfer_discount: 300,
            bike_base: 1000,
            bike_included_mins: 30,
            bike_overage_fare: 1000,
            bike_overage_period_mins: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bike_cost_boundaries() {
        let fares = FareTable::default();
        assert_eq!(fares.bike_cost(0.0), fares.bike_base);
        assert_eq!(fares.bike_cost(30.0), fares.bike_base);
        assert_eq!(fares.bike_cost(30.5), fares.bike_base + 1000);
        assert_eq!(fares.bike_cost(45.0), fares.bike_base + 1000);
        assert_eq!(fares.bike_cost(60.0), fares.bike_base + 1000);
        assert_eq!(fares.bike_cost(60.1), fares.bike_base + 2000);
    }

    #[test]
    fn boarding_fare_applies_discount_after_first_ride() {
        let fares = FareTable::default();
        assert_eq!(fares.boarding_fare(RouteType::Subway, false), 1370);
        assert_eq!(fares.boarding_fare(RouteType::Subway, true), 1070);
        assert_eq!(fares.boarding_fare(RouteType::Bus, true), 900);
    }

    #[test]
    fn gtfs_route_types() {
        assert_eq!(RouteType::from_gtfs(1), RouteType::Subway);
        assert_eq!(RouteType::from_gtfs(3), RouteType::Bus);
        assert_eq!(RouteType::from_gtfs(0), RouteType::Bus);
    }

    #[test]
    fn partial_override_from_json() {
        let fares: FareTable = serde_json::from_str(r#"{"bus_base": 1500}"#).unwrap();
        assert_eq!(fares.bus_base, 1500);
        assert_eq!(fares.subway_base, 1370);
    }
}

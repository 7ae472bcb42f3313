use serde::Serialize;

use crate::{
    config::Tariff,
    models::trip::Trip,
    trips::normalize::{COMPLETED, DELAYED, FLAGGED, IN_TRANSIT, PENDING, RESOLVED},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripStats {
    pub total: usize,
    pub completed: usize,
    pub in_transit: usize,
    pub delayed: usize,
    pub flagged: usize,
    pub resolved: usize,
    pub pending: usize,
    pub distance_km: f64,
    pub fuel_litres: f64,
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
    pub cost_per_km: f64,
}

impl TripStats {
    /// Trips still on the road, delayed ones included.
    pub fn ongoing(&self) -> usize {
        self.in_transit + self.delayed
    }
}

/// Counts shown per period by `/trip-stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodCounts {
    pub completed: usize,
    pub in_transit: usize,
    pub delayed: usize,
}

impl From<&TripStats> for PeriodCounts {
    fn from(stats: &TripStats) -> Self {
        Self {
            completed: stats.completed,
            in_transit: stats.in_transit,
            delayed: stats.delayed,
        }
    }
}

/// Expects statuses to be normalized already; anything outside the known
/// buckets only counts towards `total`.
pub fn aggregate(trips: &[Trip], tariff: Tariff) -> TripStats {
    let mut stats = TripStats {
        total: trips.len(),
        ..TripStats::default()
    };

    for trip in trips {
        match trip.status.as_str() {
            COMPLETED => stats.completed += 1,
            IN_TRANSIT => stats.in_transit += 1,
            DELAYED => stats.delayed += 1,
            FLAGGED => stats.flagged += 1,
            RESOLVED => stats.resolved += 1,
            PENDING => stats.pending += 1,
            _ => {}
        }
        stats.distance_km += trip.distance_km.unwrap_or(0.0);
        stats.fuel_litres += trip.fuel_litres.unwrap_or(0.0);
    }

    stats.revenue = stats.distance_km * tariff.revenue_per_km;
    stats.expense = stats.fuel_litres * tariff.expense_per_litre;
    stats.profit = stats.revenue - stats.expense;
    stats.cost_per_km = if stats.distance_km > 0.0 {
        stats.expense / stats.distance_km
    } else {
        0.0
    };
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::normalize::normalize;

    fn trip(status: &str, distance: Option<f64>, fuel: Option<f64>) -> Trip {
        Trip {
            status: status.into(),
            distance_km: distance,
            fuel_litres: fuel,
            ..Trip::with_id("1")
        }
    }

    #[test]
    fn empty_table_is_all_zero() {
        let stats = aggregate(&[], Tariff::default());
        assert_eq!(stats, TripStats::default());
        assert_eq!(stats.cost_per_km, 0.0);
    }

    #[test]
    fn single_in_transit_trip_after_normalize() {
        let trips = normalize(vec![trip("In Transit", None, None)]);
        assert_eq!(trips[0].status, "in transit");
        let stats = aggregate(&trips, Tariff::default());
        assert_eq!(stats.in_transit, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.ongoing(), 1);
    }

    #[test]
    fn financials_follow_the_tariff() {
        let trips = vec![
            trip("completed", Some(100.0), Some(10.0)),
            trip("delayed", Some(50.0), Some(20.0)),
            trip("flagged", None, Some(5.0)),
            trip("on a ferry", None, None),
        ];
        let stats = aggregate(&trips, Tariff::default());
        assert_eq!(stats.total, 4);
        assert_eq!((stats.completed, stats.delayed, stats.flagged), (1, 1, 1));
        assert_eq!(stats.distance_km, 150.0);
        assert_eq!(stats.fuel_litres, 35.0);
        assert_eq!(stats.revenue, 1500.0);
        assert_eq!(stats.expense, 175.0);
        assert_eq!(stats.profit, 1325.0);
        assert!((stats.cost_per_km - 175.0 / 150.0).abs() < 1e-9);

        let custom = Tariff {
            revenue_per_km: 2.0,
            expense_per_litre: 1.0,
        };
        assert_eq!(aggregate(&trips, custom).profit, 265.0);
    }

    #[test]
    fn fuel_without_distance_keeps_cost_per_km_at_zero() {
        let stats = aggregate(&[trip("pending", None, Some(8.0))], Tariff::default());
        assert_eq!(stats.expense, 40.0);
        assert_eq!(stats.cost_per_km, 0.0);
        assert_eq!(stats.pending, 1);
    }
}

use crate::models::trip::Trip;

pub const IN_TRANSIT: &str = "in transit";
pub const COMPLETED: &str = "completed";
pub const DELAYED: &str = "delayed";
pub const FLAGGED: &str = "flagged";
pub const RESOLVED: &str = "resolved";
pub const PENDING: &str = "pending";

/// Lower-cases every status so comparisons against the bucket names above work
/// regardless of which writer produced the row.
pub fn normalize(mut trips: Vec<Trip>) -> Vec<Trip> {
    for trip in &mut trips {
        if !trip.status.is_empty() {
            trip.status = trip.status.to_lowercase();
        }
    }
    trips
}

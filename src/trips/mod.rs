//! Pure table transformations over `Vec<Trip>`; no IO happens here.

pub mod bulk;
pub mod normalize;
pub mod period;
pub mod reconcile;
pub mod stats;

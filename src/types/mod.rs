//! Shared data structures for the shield-tunneling edge platform.
//!
//! These types are the nouns that flow through every stage of the pipeline:
//! `Collectors -> Quality -> BufferWriter -> [store] -> Aligner -> SummaryWriter
//! -> WarningEngine -> (NotificationRouter, WorkOrderGenerator)`.

mod sample;
mod ring_summary;
mod warning;
mod work_order;

pub use sample::*;
pub use ring_summary::*;
pub use warning::*;
pub use work_order::*;

/// Seconds since the Unix epoch, double precision, as used throughout the
/// data model (section 3: "All timestamps are seconds since the Unix epoch
/// in double-precision floating point").
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

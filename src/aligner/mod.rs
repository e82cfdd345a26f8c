//! Ring aligner: boundary detection, per-ring feature aggregation, derived
//! indicators, settlement association, and the summary writer that ties
//! them into one upsertable [`crate::types::RingSummary`] (sections 4.4,
//! 4.5, 4.6).

pub mod attitude_aggregator;
pub mod boundary;
pub mod derived;
pub mod plc_aggregator;
pub mod settlement;
pub mod summary_writer;

#[derive(Debug, thiserror::Error)]
pub enum AlignerError {
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

//! Batch processing core: the permit-bounded dispatcher, the single-owner
//! aggregator, and the summary they produce.

pub(crate) mod aggregator;
pub mod dispatcher;
pub mod outcome;
pub mod summary;

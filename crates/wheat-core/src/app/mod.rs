//! App - the workflows built on top of the ports.
//!
//! # Components
//! - **EnrichJob**: batched, throttled fetch-and-update of pending records
//! - **Runner**: runs a job until completion or a shutdown signal
//! - **loader**: imports a collection export into the store
//! - **chaff**: finds and reports low-value, low-demand cards

pub mod chaff;
pub mod enrich_job;
pub mod loader;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use self::chaff::{ChaffFilter, ChaffRow};
pub use self::enrich_job::{EnrichJob, EnrichSummary};
pub use self::loader::LoadSummary;
pub use self::runner::{RunOutcome, Runner, shutdown_signal};

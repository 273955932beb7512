//! Developmental scoring and risk engine.
//!
//! Turns sparse educator-entered assessment scores into ten-domain profiles,
//! cohort and age-norm Z-scores, weekly trend slopes, a composite risk
//! profile, clinical classifications and forward projections.

pub mod aggregate;
pub mod alerts;
pub mod batch;
pub mod cohort;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod explain;
pub mod matrix;
pub mod memory;
pub mod models;
pub mod norms;
pub mod report;
pub mod risk;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod trajectory;
pub mod trend;

pub use batch::{BatchSummary, Engine, RunSummary};
pub use config::EngineConfig;
pub use domain::Domain;
pub use error::{EngineError, StoreError};
pub use store::Store;

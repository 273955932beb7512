use thiserror::Error;
use uuid::Uuid;

use crate::domain::Domain;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The derived table has not been provisioned yet.
    #[error("table {table} is not provisioned")]
    MissingSchema { table: String },

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // 42P01 = undefined_table
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("42P01") {
                return StoreError::MissingSchema {
                    table: db_err.table().unwrap_or("unknown").to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Collapses a missing derived table into an empty read.
pub fn or_unprovisioned<T: Default>(result: StoreResult<T>) -> StoreResult<T> {
    match result {
        Err(StoreError::MissingSchema { table }) => {
            tracing::debug!(%table, "derived table not provisioned, returning empty result");
            Ok(T::default())
        }
        other => other,
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown development domain: {0}")]
    UnknownDomain(String),

    #[error("{field} {value} for {domain} is outside [{min}, {max}]")]
    ScoreOutOfRange {
        domain: Domain,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("child {0} not found")]
    ChildNotFound(Uuid),

    #[error("invalid policy configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_schema_reads_as_empty() {
        let result: StoreResult<Vec<u8>> = Err(StoreError::MissingSchema {
            table: "z_profile_snapshots".to_string(),
        });
        assert!(or_unprovisioned(result).unwrap().is_empty());
    }

    #[test]
    fn other_errors_still_propagate() {
        let result: StoreResult<Option<u8>> =
            Err(StoreError::InvalidRecord("bad".to_string()));
        assert!(or_unprovisioned(result).is_err());
    }
}

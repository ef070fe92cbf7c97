//! The module contains the error the engine can throw.
//!
//! A missing expense is not an error: lookups return `Option` and callers
//! branch on it. The errors are:
//!
//! - [`InvalidInput`] thrown when user input fails validation.
//! - [`RateUnavailable`] thrown when no rate exists even after a refresh.
//! - [`Upstream`] thrown when the currency feed cannot be fetched or parsed.
//!
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`RateUnavailable`]: EngineError::RateUnavailable
//!  [`Upstream`]: EngineError::Upstream
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No {code} rate for {date}")]
    RateUnavailable { code: String, date: NaiveDate },
    #[error("Upstream feed error: {0}")]
    Upstream(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("{0} timed out")]
    Timeout(String),
    #[error("Invalid stored state: {0}")]
    InvalidState(String),
    #[error("Money overflow while {0}")]
    Overflow(&'static str),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (
                Self::RateUnavailable { code: a, date: da },
                Self::RateUnavailable { code: b, date: db },
            ) => a == b && da == db,
            (Self::Upstream(a), Self::Upstream(b)) => a == b,
            (Self::Cache(a), Self::Cache(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Overflow(a), Self::Overflow(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<redis::RedisError> for EngineError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Cache(format!("cached report is not valid json: {err}"))
    }
}

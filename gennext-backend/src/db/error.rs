use serde::Serialize;
use valuable::Valuable;

/// Domain-level failures. `RecordNotFound` and `ValidationFailed` are raised
/// before any mutation is applied; `Other` covers infrastructure failures
/// (e.g. the package exporter's filesystem) and is never shown to callers in
/// detail.
#[derive(thiserror::Error, Debug, Serialize, Valuable, Clone)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Error {
    #[error("{entity} {id} not found")]
    RecordNotFound { entity: &'static str, id: String },
    #[error("{entity} with {field} = {value} already exists")]
    DuplicateRecord {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("validation failed: {}", reasons.join("; "))]
    ValidationFailed { reasons: Vec<String> },
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(reasons: Vec<String>) -> Self {
        Self::ValidationFailed { reasons }
    }

    fn from_other_error(err: impl std::error::Error) -> Self {
        Self::Other {
            message: format!("{err:?}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::from_other_error(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::from_other_error(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PageNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Unavailable,
    Validation,
    NotFound,
    Conflict,
}

/// Failures surfaced by the reorder core. None of them leave a partial
/// mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("not authenticated: sign in to continue")]
    Unauthenticated,
    #[error("failed to fetch page {page}: {cause}")]
    FetchFailed { page: PageNumber, cause: String },
    #[error("cannot move {from} -> {to}: page holds {len} items")]
    IndexOutOfRange { from: usize, to: usize, len: usize },
    #[error("page {page} has not been fetched yet")]
    NoSnapshot { page: PageNumber },
    #[error("response for page {requested} discarded: page {active} is now active")]
    Superseded {
        requested: PageNumber,
        active: PageNumber,
    },
}

impl ReorderError {
    pub fn fetch_failed(page: PageNumber, cause: impl Into<String>) -> Self {
        Self::FetchFailed {
            page,
            cause: cause.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::Unauthorized,
            Self::FetchFailed { .. } => ErrorCode::Unavailable,
            Self::IndexOutOfRange { .. } => ErrorCode::Validation,
            Self::NoSnapshot { .. } => ErrorCode::NotFound,
            Self::Superseded { .. } => ErrorCode::Conflict,
        }
    }
}

pub type ReorderResult<T> = std::result::Result<T, ReorderError>;

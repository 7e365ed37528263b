// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use thiserror::Error;

pub type SearchOutcome<T> = Result<T, SearchError>;

/// Failures of a single timeline search
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search was aborted")]
    Aborted,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("search service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid search response: {0}")]
    Decode(String),
    #[error("search stream ended without a final response")]
    Incomplete,
}

impl SearchError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SearchError::Aborted)
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Invalid agent configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid search service url '{url}': {reason}")]
    InvalidSearchUrl { url: String, reason: String },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

//! Error types for reporule
//!
//! Classification and configuration failures stop an invocation outright.
//! Per-repository failures while applying a ruleset are collected by the
//! applier instead of being raised.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for reporule
#[derive(Error, Debug)]
pub enum RepoRuleError {
    /// The account is neither a GitHub organization nor a user
    #[error("Organization or user '{0}' not found")]
    NotFound(String),

    /// A ruleset, exception list or config file is missing or unreadable
    #[error("Configuration error in {}: {reason}", path.display())]
    Config {
        /// File that failed to load
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// GitHub answered with a non-success status
    #[error("GitHub API {method} {url} returned {status}: {body}")]
    Api {
        method: String,
        url: String,
        status: u16,
        /// Response body as sent by the server
        body: String,
    },

    /// The request never produced a response
    #[error("HTTP {method} {url} failed: {source}")]
    Http {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not have the expected shape
    #[error("Unexpected response body from {method} {url}: {source}")]
    Decode {
        method: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid combination of command-line arguments
    #[error("{0}")]
    BadParameter(String),
}

impl RepoRuleError {
    pub(crate) fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RepoRuleError::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status carried by an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RepoRuleError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepoRuleError>;

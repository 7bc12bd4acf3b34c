use sea_orm::DbErr;
use thiserror::Error;

use crate::operation::Action;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("Record not found for {model}.{action}")]
    NotFound { model: String, action: Action },
    #[error("Invalid arguments for {model}.{action}: {detail}")]
    InvalidArguments {
        model: String,
        action: Action,
        detail: String,
    },
    #[error("{model}.{action} matched {matched} rows; a single-record write must match exactly one")]
    AmbiguousTarget {
        model: String,
        action: Action,
        matched: usize,
    },
    #[error("{model}.{action} rejected: a non-empty `where` filter is required")]
    UnsafeMutation { model: String, action: Action },
    #[error("{model}.{action} is not allowed on a read-only client")]
    ReadOnly { model: String, action: Action },
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid(model: &str, action: Action, detail: impl Into<String>) -> Self {
        Self::InvalidArguments {
            model: model.to_string(),
            action,
            detail: detail.into(),
        }
    }
}

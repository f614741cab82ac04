//! Errors returned by the end-to-end actions.
use reqwest::StatusCode;
use thiserror::Error;

use crate::actions::Operation;

/// An error raised by an action, tagged with the operation that failed and
/// the phase it failed in.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("{operation} error mount request")]
    Mount {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} error send request")]
    Send {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} error check response: expected status {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        operation: Operation,
        expected: StatusCode,
        actual: StatusCode,
        body: String,
    },
    #[error("{operation} error decode response")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} error check response: missing field {field:?}")]
    MissingField {
        operation: Operation,
        field: &'static str,
    },
    #[error("{operation} error check response: field {field:?} is empty")]
    EmptyField {
        operation: Operation,
        field: &'static str,
    },
}

impl ActionError {
    /// The operation the error was raised by.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Mount { operation, .. }
            | Self::Send { operation, .. }
            | Self::UnexpectedStatus { operation, .. }
            | Self::Decode { operation, .. }
            | Self::MissingField { operation, .. }
            | Self::EmptyField { operation, .. } => *operation,
        }
    }

    /// The status the server answered with, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

//! Error types for the organizations client.
//!
//! # Design
//! `Argument` is the only error raised before any I/O: it covers bad
//! construction options, unresolvable endpoint templates and the identifier
//! guards on the enabled-connection operations. It is never retried.
//!
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `Http` with the raw status
//! code and body for debugging.

use thiserror::Error;

/// Errors returned by the organizations client and its collaborators.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A precondition on options or call parameters was violated.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (connect, timeout, DNS, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        ApiError::Argument(msg.into())
    }

    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exposed_for_server_errors() {
        assert_eq!(ApiError::NotFound.status(), Some(404));
        let err = ApiError::Http {
            status: 429,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(ApiError::Transport("refused".into()).status(), None);
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = ApiError::Http {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}

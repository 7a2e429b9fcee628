//! Error taxonomy for the HTTP client layer.
//!
//! Three kinds are distinguished: a non-2xx response (carrying status and
//! request path), a transport failure (endpoint unreachable, timeout), and a
//! structurally malformed response body. 404 is special-cased by callers via
//! [`ClientError::is_not_found`] and converted to `None`, never surfaced as
//! an error.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("api error {status} on {path}: {body}")]
    Api {
        status: u16,
        path: String,
        body: String,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl ClientError {
    pub fn malformed(path: &str, reason: impl Into<String>) -> Self {
        ClientError::Malformed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

/// Maps a remote 404 to `Ok(None)`; every other error propagates.
pub fn not_found_to_none<T>(res: ClientResult<T>) -> ClientResult<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

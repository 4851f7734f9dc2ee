//! Error categories surfaced by the experiment client.
//!
//! Operations return `anyhow::Result`; callers that need to react to the
//! kind of failure recover it with `err.downcast_ref::<ClientError>()`.

use reqwest::StatusCode;
use std::path::PathBuf;

/// Longest slice of a response body kept in a protocol error message.
const MAX_BODY_IN_ERROR: usize = 512;

#[derive(Debug)]
pub enum ClientError {
    /// A local input file could not be opened or inspected.
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The request could not be sent or the connection was lost.
    Network(String),
    /// The server answered, but not with something we can use.
    Protocol(String),
}

impl ClientError {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClientError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Builds a protocol error for a non-success HTTP status.
    pub fn status(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() {
            return ClientError::Protocol(format!("server returned HTTP {}", status));
        }

        let mut end = body.len().min(MAX_BODY_IN_ERROR);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        let ellipsis = if end < body.len() { "..." } else { "" };
        ClientError::Protocol(format!(
            "server returned HTTP {}: {}{}",
            status,
            &body[..end],
            ellipsis
        ))
    }

    /// Short stable label used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::FileAccess { .. } => "file-access",
            ClientError::Network(_) => "network",
            ClientError::Protocol(_) => "protocol",
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::FileAccess { path, source } => {
                write!(f, "Cannot read {}: {}", path.display(), source)
            }
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

// The io error is already part of the message, so it is not exposed as a
// source; `{:#}` would print it twice.
impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return ClientError::status(status, "");
        }
        // Body read failures surface as decode errors; with no content
        // decoders enabled they always mean the connection broke.
        ClientError::Network(describe(&error))
    }
}

/// Renders an error together with its source chain, since reqwest keeps the
/// interesting part (e.g. "Connection refused") in the sources.
fn describe(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Finds the category of an error anywhere in an anyhow chain.
pub fn category_of(error: &anyhow::Error) -> Option<&'static str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .map(ClientError::category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_without_body() {
        let err = ClientError::status(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(err.category(), "protocol");
        assert_eq!(
            err.to_string(),
            "Protocol error: server returned HTTP 502 Bad Gateway"
        );
    }

    #[test]
    fn test_status_truncates_long_body() {
        let body = "é".repeat(MAX_BODY_IN_ERROR);
        let err = ClientError::status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let msg = err.to_string();
        assert!(msg.ends_with("..."));
        assert!(msg.len() < body.len());
    }

    #[test]
    fn test_file_access_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ClientError::file_access("csv/event.csv", io);
        assert_eq!(err.category(), "file-access");
        assert_eq!(err.to_string(), "Cannot read csv/event.csv: no such file");
    }

    #[test]
    fn test_category_of_walks_context_chain() {
        let err = anyhow::Error::from(ClientError::Network("reset".into()))
            .context("Failed to stream events");
        assert_eq!(category_of(&err), Some("network"));

        let plain = anyhow::anyhow!("something else");
        assert_eq!(category_of(&plain), None);
    }
}

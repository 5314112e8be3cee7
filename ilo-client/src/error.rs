use thiserror::Error;

/// Errors returned by a single controller call.
///
/// Transport failures are kept apart from protocol failures (bad status,
/// undecodable payload) so collectors can report them differently.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure before a response was received.
    #[error("Transport error for {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The scrape deadline expired while waiting for a slot or a response.
    #[error("Deadline exceeded for {path}")]
    DeadlineExceeded { path: String },

    /// The request limiter was closed before a slot became free.
    #[error("Request for {path} was cancelled")]
    Cancelled { path: String },

    /// The controller answered with a non-2xx status.
    #[error("Unexpected status {status} for {path}")]
    Status { path: String, status: u16 },

    /// The response body could not be decoded into the expected resource.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Client construction failed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl ClientError {
    /// Wrap a transport-level error with the path that triggered it.
    pub fn transport<E>(path: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The resource path this error belongs to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Transport { path, .. }
            | Self::DeadlineExceeded { path }
            | Self::Cancelled { path }
            | Self::Status { path, .. }
            | Self::Decode { path, .. } => Some(path),
            Self::Build(_) => None,
        }
    }

    /// Whether the failure happened below the HTTP protocol level.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::DeadlineExceeded { .. } | Self::Cancelled { .. }
        )
    }
}

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_keeps_path() {
        let err = ClientError::transport(
            "/Chassis/1/Power/",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        );

        assert_eq!(err.path(), Some("/Chassis/1/Power/"));
        assert!(err.is_transport());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_status_error_is_protocol_error() {
        let err = ClientError::Status {
            path: "/Systems/1/".to_string(),
            status: 503,
        };

        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Unexpected status 503 for /Systems/1/");
    }
}

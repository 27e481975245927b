//! Error taxonomy for metric fetching.
//!
//! Every failure a fetcher can hit maps onto one of these variants. The enum is
//! `Clone` so a single upstream outcome can be handed to every caller waiting on
//! the same in-flight request.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetricsError {
    /// A required credential or setting is absent. Never retried, never degraded.
    #[error("missing required configuration: {name}")]
    Configuration { name: String },

    /// Upstream answered with a non-2xx status.
    #[error("upstream request to {url} failed with status {status} {status_text}")]
    UpstreamHttp {
        url: String,
        status: u16,
        status_text: String,
    },

    /// No response within the per-attempt timeout.
    #[error("upstream request to {url} timed out after {timeout_ms}ms")]
    UpstreamTimeout { url: String, timeout_ms: u64 },

    /// Connection-level failure before any status was received.
    #[error("network error calling {url}: {message}")]
    Network { url: String, message: String },

    /// Payload did not match the expected provider schema.
    #[error("unexpected response shape from {url}: {message}")]
    DataShape { url: String, message: String },

    /// A series operation required at least one point.
    #[error("series is empty, at least one data point is required")]
    EmptySeries,
}

impl MetricsError {
    pub fn configuration(name: impl Into<String>) -> Self {
        Self::Configuration { name: name.into() }
    }

    pub fn data_shape(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataShape {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Stable error class name used in structured logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "ConfigurationError",
            Self::UpstreamHttp { .. } => "UpstreamHTTPError",
            Self::UpstreamTimeout { .. } => "UpstreamTimeoutError",
            Self::Network { .. } => "NetworkError",
            Self::DataShape { .. } => "DataShapeError",
            Self::EmptySeries => "EmptySeries",
        }
    }

    /// URL of the failing request, when one is known.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::UpstreamHttp { url, .. }
            | Self::UpstreamTimeout { url, .. }
            | Self::Network { url, .. }
            | Self::DataShape { url, .. } => Some(url),
            Self::Configuration { .. } | Self::EmptySeries => None,
        }
    }

    /// Server errors, timeouts and connection failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamHttp { status, .. } => *status >= 500,
            Self::UpstreamTimeout { .. } | Self::Network { .. } => true,
            _ => false,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Drop the query string from the carried URL, e.g. to keep a secret
    /// parameter out of logs and responses.
    pub fn without_query(mut self) -> Self {
        if let Self::UpstreamHttp { url, .. }
        | Self::UpstreamTimeout { url, .. }
        | Self::Network { url, .. }
        | Self::DataShape { url, .. } = &mut self
        {
            if let Some(idx) = url.find('?') {
                url.truncate(idx);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let server = MetricsError::UpstreamHttp {
            url: "https://x".into(),
            status: 503,
            status_text: "Service Unavailable".into(),
        };
        let client = MetricsError::UpstreamHttp {
            url: "https://x".into(),
            status: 404,
            status_text: "Not Found".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(MetricsError::UpstreamTimeout { url: "u".into(), timeout_ms: 10 }.is_retryable());
        assert!(!MetricsError::configuration("RWA_API_KEY").is_retryable());
        assert!(!MetricsError::EmptySeries.is_retryable());
    }

    #[test]
    fn test_names_and_urls() {
        let err = MetricsError::data_shape("https://api.example/v1", "missing field `results`");
        assert_eq!(err.name(), "DataShapeError");
        assert_eq!(err.url(), Some("https://api.example/v1"));
        assert_eq!(MetricsError::configuration("X").url(), None);
        assert!(MetricsError::configuration("X").is_configuration());
    }

    #[test]
    fn test_without_query_strips_parameters() {
        let err = MetricsError::UpstreamHttp {
            url: "http://localhost:3010/api/internal/rwa/stablecoins?secret=s3cr3t".into(),
            status: 401,
            status_text: "Unauthorized".into(),
        }
        .without_query();
        assert_eq!(err.url(), Some("http://localhost:3010/api/internal/rwa/stablecoins"));
        assert!(!err.to_string().contains("s3cr3t"));
    }
}

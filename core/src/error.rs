//! Error types for the synchronous HTTP client.
//!
//! # Design
//! Callers see two kinds of failure. `InvalidRequest` means the request was
//! rejected before any I/O. `TransportFailure` means the transport ran (or was
//! asked to run) and did not produce a usable response; the transport's own
//! error is kept as the `source` so it can be inspected or logged.

use std::error::Error as StdError;

use crate::http::Version;

/// Errors returned by `SyncClient::send` and `PendingResponse::wait`.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request could not be translated into a wire request.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),

    /// The transport reported an error or completed without a response.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),
}

impl HttpError {
    /// The transport-level cause, if this is a transport failure.
    pub fn transport_cause(&self) -> Option<&TransportError> {
        match self {
            HttpError::TransportFailure(cause) => Some(cause),
            HttpError::InvalidRequest(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.transport_cause().is_some_and(TransportError::is_cancelled)
    }
}

/// Why a request was rejected before reaching the transport.
#[derive(Debug, thiserror::Error)]
pub enum InvalidRequest {
    #[error("unsupported protocol version {0}, only HTTP/1.1 is supported")]
    UnsupportedVersion(Version),

    #[error("{url:?} is not a valid absolute URL")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

/// Failures reported by, or about, a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The in-flight task was cancelled through its `TaskHandle`.
    #[error("request was cancelled")]
    Cancelled,

    /// The transport gave up after the request's timeout elapsed.
    #[error("request timed out")]
    TimedOut,

    /// The transport completed with neither a response nor an error.
    #[error("transport completed without a response")]
    NoResponse,

    /// The completion callback was dropped without being invoked.
    #[error("completion callback dropped before delivering a result")]
    CompletionDropped,

    /// The transport delivered response metadata together with an error.
    #[error("transport delivered status {status} together with an error")]
    ContractViolation {
        status: u16,
        #[source]
        error: Box<TransportError>,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-specific failure that fits no other kind.
    #[error("{0}")]
    Other(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl TransportError {
    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        TransportError::Other(err.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn invalid_url_display_names_the_url() {
        let err = HttpError::from(InvalidRequest::InvalidUrl {
            url: "nope".to_string(),
            source: url::ParseError::RelativeUrlWithoutBase,
        });
        assert_eq!(err.to_string(), "invalid request: \"nope\" is not a valid absolute URL");
        assert!(err.source().is_some());
    }

    #[test]
    fn unsupported_version_display() {
        let err = InvalidRequest::UnsupportedVersion(Version::HTTP_2);
        assert_eq!(
            err.to_string(),
            "unsupported protocol version HTTP/2.0, only HTTP/1.1 is supported"
        );
    }

    #[test]
    fn cancellation_is_detected_through_http_error() {
        let err = HttpError::from(TransportError::Cancelled);
        assert!(err.is_cancelled());
        assert!(matches!(err.transport_cause(), Some(TransportError::Cancelled)));

        let err = HttpError::from(InvalidRequest::UnsupportedVersion(Version::HTTP_1_0));
        assert!(!err.is_cancelled());
        assert!(err.transport_cause().is_none());
    }

    #[test]
    fn other_preserves_the_adapter_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = TransportError::other(io);
        assert_eq!(err.to_string(), "socket closed");
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn contract_violation_chains_the_error() {
        let err = TransportError::ContractViolation {
            status: 200,
            error: Box::new(TransportError::TimedOut),
        };
        assert_eq!(err.source().unwrap().to_string(), "request timed out");
    }
}

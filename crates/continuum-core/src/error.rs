//! Error types for the Continuum feed
//!
//! Every failure is delivered as a value through the same channel as the
//! success result, so all error types are `Clone`: one outcome can be
//! handed to every caller that attached to a coalesced request.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Transport-level failure while talking to the remote provider
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Network failure (DNS, connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(Arc<reqwest::Error>),

    /// Server answered with a non-success status code
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Rate limited by server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,
}

impl TransportError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::RateLimited => true,
            TransportError::Status { status, .. } => *status >= 500,
            TransportError::Http(e) => e.is_timeout() || e.is_connect(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::Http(Arc::new(error))
    }
}

/// Error type for all feed operations
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// The request could not be completed by the transport
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] TransportError),

    /// Payload shape violates the mapping contract
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Request aborted by the caller or superseded by another request
    #[error("Request canceled")]
    Canceled,

    /// Fetch attempted before a channel identifier was set
    #[error("Feed is not configured with a channel identifier")]
    NotConfigured,

    /// Detail fetch requested for a video that is not in the feed
    #[error("Video not found in feed: {0}")]
    UnknownVideo(String),

    /// Blank channel or video identifier
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

impl FeedError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, FeedError::Canceled)
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        FeedError::FetchFailed(error.into())
    }
}

impl Serialize for FeedError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_status() {
        let error = FeedError::FetchFailed(TransportError::Status {
            status: 404,
            url: "https://api.vimeo.com/videos/1".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Fetch failed: Unexpected HTTP status 404 from https://api.vimeo.com/videos/1"
        );
    }

    #[test]
    fn test_error_display_malformed() {
        let error = FeedError::MalformedResponse("missing data".to_string());
        assert_eq!(error.to_string(), "Malformed response: missing data");
    }

    #[test]
    fn test_error_display_canceled() {
        assert_eq!(FeedError::Canceled.to_string(), "Request canceled");
        assert!(FeedError::Canceled.is_canceled());
        assert!(!FeedError::NotConfigured.is_canceled());
    }

    #[test]
    fn test_error_display_not_configured() {
        assert_eq!(
            FeedError::NotConfigured.to_string(),
            "Feed is not configured with a channel identifier"
        );
    }

    #[test]
    fn test_error_display_invalid_id() {
        let error = FeedError::InvalidId("channel identifier cannot be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid identifier: channel identifier cannot be empty"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::RateLimited.is_transient());
        assert!(
            TransportError::Status { status: 503, url: String::new() }.is_transient()
        );
        assert!(
            !TransportError::Status { status: 404, url: String::new() }.is_transient()
        );
    }

    #[test]
    fn test_error_serialize() {
        let error = FeedError::UnknownVideo("123".to_string());
        let json = serde_json::to_string(&error).expect("Serialization should succeed");
        assert_eq!(json, "\"Video not found in feed: 123\"");
    }

    #[test]
    fn test_error_is_clone() {
        let error = FeedError::FetchFailed(TransportError::RateLimited);
        let copy = error.clone();
        assert_eq!(error.to_string(), copy.to_string());
    }
}

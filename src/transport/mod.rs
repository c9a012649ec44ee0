//! Transport abstraction over the remote content API, plus the
//! structured error payload surfaced to callers.

pub mod http;

use std::{future::Future, pin::Pin};

use serde_json::{Value, json};

use crate::endpoint::RequestDescriptor;

/// Transport-level failure: the request never produced an HTTP response.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying reqwest failure.
    Http(reqwest::Error),
    /// Anything else, with context.
    Message(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Raw HTTP response: status plus parsed JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body; `Null` when the body was empty.
    pub body: Value,
}

impl ApiResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Structured error payload carried on query entries and mutation
/// results. Never thrown across the subscription boundary; callers
/// branch on it as a value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ApiError {
    /// HTTP status, or 0 when the request never reached the server.
    pub status: u16,
    /// Server error payload, or a synthesized one for transport failures.
    pub data: Value,
}

impl ApiError {
    /// Wraps a non-2xx response.
    pub fn from_response(response: ApiResponse) -> Self {
        Self {
            status: response.status,
            data: response.body,
        }
    }

    /// Wraps a transport failure as status 0.
    pub fn from_transport(err: &TransportError) -> Self {
        Self {
            status: 0,
            data: json!({ "error": format!("{err:?}") }),
        }
    }

    /// Human-readable message for transient notifications: the server's
    /// `message` field when present, else a generic fallback.
    pub fn human_message(&self) -> String {
        self.data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "request failed".to_string())
    }
}

/// Boxed future returned by [`Transport::send`].
pub type SendFuture = Pin<Box<dyn Future<Output = TransportResult<ApiResponse>> + Send>>;

/// Seam between the resource client and the wire. The runtime never
/// constructs HTTP traffic itself; it hands a descriptor to the
/// transport and interprets the response. Test doubles implement this
/// to script or hold responses.
pub trait Transport: Send + Sync + 'static {
    /// Performs one request. Timeout policy belongs to implementations.
    fn send(&self, request: RequestDescriptor) -> SendFuture;
}

//! The contract between the synchronous client and a network transport.
//!
//! # Design
//! A transport receives a validated `NativeRequest` and a `Completion`
//! callback. It must start the operation without blocking the submitting
//! thread and invoke the callback exactly once, with either response metadata
//! (plus optional body bytes) or an error. Everything protocol-level
//! (connecting, framing, timeouts) is the transport's business.
//!
//! Validation lives here because it defines what a transport may assume:
//! an absolute URL, HTTP/1.1, and header names and values that can go on the
//! wire as-is.

use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::{InvalidRequest, TransportError};
use crate::http::{Method, Request, Version};
use crate::task::TaskHandle;

/// Callback a transport invokes once with the outcome of a request.
pub type Completion = Box<dyn FnOnce(TransportOutcome) + Send + 'static>;

/// A request that passed validation and is ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRequest {
    /// Correlates log lines for one call across threads.
    pub call_id: Uuid,
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl NativeRequest {
    /// Validate `request` and copy it into transport form.
    ///
    /// Fails without side effects if the version is not HTTP/1.1, the URL is
    /// not absolute, or a header could not be written on the wire.
    pub fn from_request(request: &Request, call_id: Uuid) -> Result<Self, InvalidRequest> {
        if request.version != Version::HTTP_1_1 {
            return Err(InvalidRequest::UnsupportedVersion(request.version));
        }

        let url = Url::parse(&request.url).map_err(|source| InvalidRequest::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;

        let mut headers = Vec::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            if !is_token(name) {
                return Err(InvalidRequest::InvalidHeaderName(name.clone()));
            }
            if !is_field_value(value) {
                return Err(InvalidRequest::InvalidHeaderValue(name.clone()));
            }
            headers.push((name.clone(), value.clone()));
        }

        Ok(Self {
            call_id,
            method: request.method,
            url,
            headers,
            body: request.body.as_ref().map(|body| body.to_vec()),
            timeout: request.timeout,
        })
    }
}

/// RFC 9110 token: one or more tchar.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^'
                        | b'_' | b'`' | b'|' | b'~'
                )
        })
}

/// Visible characters, spaces and tabs; no CR, LF or other controls.
fn is_field_value(s: &str) -> bool {
    s.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f))
}

/// Status line and header fields of a response the peer accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    /// Header fields in wire order. A name may repeat; the client joins the
    /// values with `", "`.
    pub headers: Vec<(String, String)>,
}

impl ResponseMeta {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Everything a transport hands back through its completion callback.
///
/// A well-behaved transport fills either `meta` (and maybe `body`) or
/// `error`. The client rejects any other combination.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub meta: Option<ResponseMeta>,
    pub body: Option<Vec<u8>>,
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    pub fn response(meta: ResponseMeta, body: Vec<u8>) -> Self {
        Self {
            meta: Some(meta),
            body: Some(body),
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            meta: None,
            body: None,
            error: Some(error),
        }
    }
}

/// A network stack that can execute one request asynchronously.
pub trait Transport: Send + Sync {
    /// Start `request` and return a handle to the in-flight task.
    ///
    /// Must not block on network I/O. `completion` must be invoked exactly
    /// once, from any thread; wrapping it in the returned `TaskHandle` and
    /// calling `TaskHandle::complete` satisfies that.
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        (**self).submit(request, completion)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        (**self).submit(request, completion)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        (**self).submit(request, completion)
    }
}

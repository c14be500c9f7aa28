//! HTTP message model: methods, versions, requests and responses as plain data.
//!
//! # Design
//! These types describe HTTP messages as values. Building a `Request` never
//! fails and never touches the network; validation happens when the
//! `SyncClient` translates it into a `NativeRequest` for the transport.
//!
//! Header names are stored exactly as provided. Nothing here folds case, so
//! lookups through `Request::headers` and `Response::header` are
//! case-sensitive. Transports may normalise names on the way back (the `ureq`
//! adapter lower-cases them); `Response::header_ignore_case` exists for that.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::ByteBuffer;

/// Header name to header value. Keys are case-sensitive.
pub type Headers = BTreeMap<String, String>;

/// Timeout applied to a `Request` unless the caller overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
    Connect,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known method tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method: {0:?}")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    // Method tokens are case-sensitive on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            "TRACE" => Ok(Method::Trace),
            "CONNECT" => Ok(Method::Connect),
            other => Err(ParseMethodError(other.to_string())),
        }
    }
}

/// Protocol version as a `(major, minor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_1_0: Version = Version { major: 1, minor: 0 };
    pub const HTTP_1_1: Version = Version { major: 1, minor: 1 };
    pub const HTTP_2: Version = Version { major: 2, minor: 0 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::HTTP_1_1
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// An HTTP request described as plain data.
///
/// Owned by the caller. `SyncClient::send` borrows it for the duration of one
/// call and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<ByteBuffer>,
    pub version: Version,
    /// Upper bound for the whole round trip, enforced by the transport.
    /// A zero duration disables the timeout.
    pub timeout: Duration,
}

impl Request {
    /// Build a request with no headers, no body, HTTP/1.1 and the default
    /// timeout. The URL is not checked until the request is sent.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            body: None,
            version: Version::HTTP_1_1,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<ByteBuffer>) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    /// Insert a header, replacing any previous value stored under exactly
    /// the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<ByteBuffer>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// An HTTP response produced by a completed round trip.
///
/// Only the client constructs responses, and only from complete transport
/// metadata, so a `Response` is never partially populated. `body` is `None`
/// whenever the transport delivered zero bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status_code: u16,
    headers: Headers,
    body: Option<ByteBuffer>,
}

impl Response {
    pub(crate) fn from_parts(status_code: u16, headers: Headers, body: Option<Vec<u8>>) -> Self {
        Self {
            status_code,
            headers,
            body: body.filter(|bytes| !bytes.is_empty()).map(ByteBuffer::from),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// True for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-sensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// ASCII case-insensitive header lookup, for transports that normalise
    /// header names.
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&ByteBuffer> {
        self.body.as_ref()
    }

    /// The body as a slice; empty when no body was received.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_ref().map(ByteBuffer::as_slice).unwrap_or_default()
    }

    pub fn into_parts(self) -> (u16, Headers, Option<ByteBuffer>) {
        (self.status_code, self.headers, self.body)
    }
}

//! HTTP/1.1 transport backed by `ureq`, one worker thread per call.
//!
//! # Design
//! `ureq` is blocking, so each submitted request runs on its own short-lived
//! thread and reports back through the task's completion slot. No agent or
//! connection outlives a call. Non-2xx statuses are returned as data and
//! redirects are not followed; both are decisions for the caller.
//!
//! Response header names come back lower-cased, as normalised by the `http`
//! crate. Repeated headers are joined with `", "`.
//!
//! Response bodies are read whole and are unbounded unless a cap is set with
//! `UreqTransport::with_max_body_len`.
//!
//! A blocking read cannot be interrupted. After `TaskHandle::cancel` the
//! worker thread keeps its connection until the peer answers or the request
//! timeout fires; with a zero timeout and a silent peer it is never released.

use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};
use ureq::http;

use crate::error::TransportError;
use crate::task::TaskHandle;
use crate::transport::{Completion, NativeRequest, ResponseMeta, Transport, TransportOutcome};

/// Sent as `User-Agent` when the request does not carry one.
pub const DEFAULT_USER_AGENT: &str = concat!("compat-core/", env!("CARGO_PKG_VERSION"));

/// Thread-per-request transport built on `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    user_agent: String,
    max_body_len: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            max_body_len: u64::MAX,
        }
    }

    /// Fail calls whose response body is longer than `max_body_len` bytes.
    pub fn with_max_body_len(mut self, max_body_len: u64) -> Self {
        self.max_body_len = max_body_len;
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `u64::MAX` unless capped.
    pub fn max_body_len(&self) -> u64 {
        self.max_body_len
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        let handle = TaskHandle::new(request.call_id, completion);
        let worker = handle.clone();
        let config = self.clone();

        let spawned = thread::Builder::new()
            .name(format!("compat-http-{}", request.call_id.simple()))
            .spawn(move || {
                if worker.is_cancelled() {
                    trace!("call {}: cancelled before start", request.call_id);
                    return;
                }
                let outcome = match config.perform(&request) {
                    Ok((meta, body)) => TransportOutcome::response(meta, body),
                    Err(err) => TransportOutcome::failed(err),
                };
                if !worker.complete(outcome) {
                    debug!("call {}: finished after cancellation", request.call_id);
                }
            });

        if let Err(err) = spawned {
            warn!("failed to spawn transport worker: {err}");
            handle.complete(TransportOutcome::failed(TransportError::Io(err)));
        }
        handle
    }
}

impl UreqTransport {
    fn perform(&self, request: &NativeRequest) -> Result<(ResponseMeta, Vec<u8>), TransportError> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(effective_timeout(request.timeout))
            .build()
            .new_agent();

        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        {
            builder = builder.header("user-agent", self.user_agent.as_str());
        }

        trace!("call {}: {} {}", request.call_id, request.method, request.url);
        let response = match &request.body {
            Some(body) => agent.run(builder.body(body.clone()).map_err(TransportError::other)?),
            None => agent.run(builder.body(()).map_err(TransportError::other)?),
        }
        .map_err(map_ureq_error)?;

        let (parts, mut body) = response.into_parts();
        let bytes = body
            .with_config()
            .limit(self.max_body_len)
            .read_to_vec()
            .map_err(map_ureq_error)?;
        trace!(
            "call {}: status {} with {} body bytes",
            request.call_id,
            parts.status,
            bytes.len()
        );

        let meta = ResponseMeta {
            status: parts.status.as_u16(),
            headers: collect_headers(&parts.headers),
        };
        Ok((meta, bytes))
    }
}

/// Zero means "no timeout".
fn effective_timeout(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

fn collect_headers(map: &http::HeaderMap) -> Vec<(String, String)> {
    map.keys()
        .map(|name| {
            let joined = map
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::TimedOut,
        ureq::Error::Io(io) => TransportError::Io(io),
        other => TransportError::other(other),
    }
}

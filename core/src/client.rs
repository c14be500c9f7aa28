//! Blocking HTTP client over an asynchronous transport.
//!
//! # Design
//! `SyncClient` holds only its transport and carries no state between calls.
//! Each call validates the request, submits it with a completion callback
//! that owns the sending half of a one-shot channel, then waits on the
//! receiving half. The sender is consumed by its single send, so a call can
//! be woken at most once. If the transport drops the callback without
//! calling it, the channel closes and the waiter is released with
//! `TransportError::CompletionDropped` instead of hanging.
//!
//! The client adds no timeout of its own: the wait lasts until the transport
//! completes, and the transport enforces `Request::timeout`.

use std::collections::btree_map::Entry;

use futures::channel::oneshot;
use futures::executor;
use log::{debug, trace, warn};
use uuid::Uuid;

use crate::adapter::UreqTransport;
use crate::error::{HttpError, TransportError};
use crate::http::{Headers, Request, Response};
use crate::task::TaskHandle;
use crate::transport::{Completion, NativeRequest, Transport, TransportOutcome};

/// Synchronous, stateless HTTP client.
///
/// Sharing one client between threads is as safe as sharing its transport.
#[derive(Debug, Clone, Default)]
pub struct SyncClient<T = UreqTransport> {
    transport: T,
}

impl SyncClient<UreqTransport> {
    /// A client backed by `UreqTransport` with default settings.
    pub fn with_default_transport() -> Self {
        Self::new(UreqTransport::new())
    }
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and block until the transport completes.
    pub fn send(&self, request: &Request) -> Result<Response, HttpError> {
        self.start(request)?.wait()
    }

    /// Submit `request` and return without waiting.
    ///
    /// The returned `PendingResponse` carries a `TaskHandle` that can be
    /// cloned and used from another thread to cancel the call. Validation
    /// failures are reported here, before the transport is involved.
    pub fn start(&self, request: &Request) -> Result<PendingResponse, HttpError> {
        let call_id = Uuid::new_v4();
        let native = NativeRequest::from_request(request, call_id).inspect_err(|err| {
            debug!("call {call_id}: rejected before submission: {err}");
        })?;

        debug!("call {call_id}: {} {}", native.method, native.url);
        let (tx, rx) = oneshot::channel();
        let completion: Completion = Box::new(move |outcome| {
            if tx.send(outcome).is_err() {
                trace!("call {call_id}: waiter gone, outcome dropped");
            }
        });
        let handle = self.transport.submit(native, completion);

        Ok(PendingResponse {
            call_id,
            receiver: rx,
            handle,
        })
    }
}

/// A submitted call whose outcome has not been collected yet.
#[derive(Debug)]
pub struct PendingResponse {
    call_id: Uuid,
    receiver: oneshot::Receiver<TransportOutcome>,
    handle: TaskHandle,
}

impl PendingResponse {
    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// A handle for cancelling the in-flight operation.
    pub fn handle(&self) -> TaskHandle {
        self.handle.clone()
    }

    /// Block the current thread until the transport completes.
    ///
    /// Safe to call from a thread that is driving an async runtime, though
    /// that runtime makes no progress until the call returns.
    pub fn wait(self) -> Result<Response, HttpError> {
        let call_id = self.call_id;
        let outcome = executor::block_on(self.receiver);
        finish(call_id, outcome)
    }

    /// Suspend the current task until the transport completes.
    pub async fn wait_async(self) -> Result<Response, HttpError> {
        let call_id = self.call_id;
        let outcome = self.receiver.await;
        finish(call_id, outcome)
    }
}

fn finish(
    call_id: Uuid,
    outcome: Result<TransportOutcome, oneshot::Canceled>,
) -> Result<Response, HttpError> {
    let outcome = outcome.unwrap_or_else(|_| {
        warn!("call {call_id}: completion dropped without a result");
        TransportOutcome::failed(TransportError::CompletionDropped)
    });
    let result = into_response(outcome);
    match &result {
        Ok(response) => debug!("call {call_id}: status {}", response.status_code()),
        Err(err) => debug!("call {call_id}: {err}"),
    }
    result.map_err(|err| {
        if let TransportError::ContractViolation { status, .. } = &err {
            warn!("call {call_id}: transport delivered status {status} alongside an error");
        }
        HttpError::TransportFailure(err)
    })
}

/// Map a transport outcome to a response, or to the error that explains why
/// there is none.
fn into_response(outcome: TransportOutcome) -> Result<Response, TransportError> {
    match (outcome.meta, outcome.error) {
        (Some(meta), None) => {
            let headers = merge_headers(meta.headers);
            Ok(Response::from_parts(meta.status, headers, outcome.body))
        }
        (Some(meta), Some(error)) => Err(TransportError::ContractViolation {
            status: meta.status,
            error: Box::new(error),
        }),
        (None, Some(error)) => Err(error),
        (None, None) => Err(TransportError::NoResponse),
    }
}

/// Fold header fields into a map, joining repeated names with `", "` in the
/// order the transport delivered them.
fn merge_headers(fields: Vec<(String, String)>) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in fields {
        match headers.entry(name) {
            Entry::Occupied(mut joined) => {
                let joined = joined.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    headers
}

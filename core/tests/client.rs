//! `SyncClient` behaviour against scripted in-process transports.
//!
//! # Design
//! Each transport here completes (or fails to complete) on a background
//! thread the way a real network stack would, so the client's blocking wait
//! is exercised for real. Counters assert when the transport must not be
//! reached at all.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use compat_core::{
    Completion, HttpError, InvalidRequest, Method, NativeRequest, Request, ResponseMeta,
    SyncClient, TaskHandle, Transport, TransportError, TransportOutcome, Version,
};
use uuid::Uuid;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Completes every request on a worker thread with the outcome built by `F`.
struct Scripted<F> {
    calls: AtomicUsize,
    respond: F,
}

impl<F> Scripted<F>
where
    F: Fn(&NativeRequest) -> TransportOutcome + Send + Sync + Clone + 'static,
{
    fn new(respond: F) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            respond,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> Transport for Scripted<F>
where
    F: Fn(&NativeRequest) -> TransportOutcome + Send + Sync + Clone + 'static,
{
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let handle = TaskHandle::new(request.call_id, completion);
        let worker = handle.clone();
        let respond = self.respond.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            worker.complete(respond(&request));
        });
        handle
    }
}

/// Accepts requests and never completes them on its own.
#[derive(Default)]
struct Stalled {
    handles: Mutex<Vec<TaskHandle>>,
}

impl Transport for Stalled {
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        let handle = TaskHandle::new(request.call_id, completion);
        self.handles.lock().unwrap().push(handle.clone());
        handle
    }
}

/// Drops the completion callback without ever calling it.
struct Forgetful;

impl Transport for Forgetful {
    fn submit(&self, request: NativeRequest, completion: Completion) -> TaskHandle {
        thread::spawn(move || drop(completion));
        TaskHandle::new(request.call_id, Box::new(|_| {}))
    }
}

fn ok_with(status: u16) -> TransportOutcome {
    TransportOutcome::response(ResponseMeta::new(status), Vec::new())
}

// ---------------------------------------------------------------------------
// Validation happens before the transport is reached
// ---------------------------------------------------------------------------

#[test]
fn unsupported_version_never_reaches_transport() {
    init_logging();
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| ok_with(200)));

    for version in [Version::HTTP_1_0, Version::HTTP_2, Version::new(3, 0)] {
        let req = Request::get("http://localhost/").with_version(version);
        let err = client.send(&req).unwrap_err();
        assert!(matches!(
            err,
            HttpError::InvalidRequest(InvalidRequest::UnsupportedVersion(v)) if v == version
        ));
    }
    assert_eq!(client.transport().calls(), 0);
}

#[test]
fn malformed_url_never_reaches_transport() {
    init_logging();
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| ok_with(200)));

    for url in ["", "example.com/path", "//no-scheme", "http://"] {
        let err = client.send(&Request::get(url)).unwrap_err();
        assert!(
            matches!(err, HttpError::InvalidRequest(InvalidRequest::InvalidUrl { .. })),
            "{url:?}: {err}"
        );
    }
    assert_eq!(client.transport().calls(), 0);
}

#[test]
fn start_reports_invalid_request_without_a_handle() {
    let client = SyncClient::new(Stalled::default());
    let result = client.start(&Request::get("nope"));
    assert!(matches!(result, Err(HttpError::InvalidRequest(_))));
    assert!(client.transport().handles.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Successful round trips
// ---------------------------------------------------------------------------

#[test]
fn delivered_metadata_and_body_become_the_response() {
    init_logging();
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| {
        TransportOutcome::response(ResponseMeta::new(200).with_header("X", "Y"), vec![0x01, 0x02])
    }));

    let resp = client.send(&Request::get("http://localhost/")).unwrap();
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.headers().len(), 1);
    assert_eq!(resp.header("X"), Some("Y"));
    assert_eq!(resp.body().unwrap().as_slice(), &[0x01, 0x02]);
    assert_eq!(client.transport().calls(), 1);
}

#[test]
fn zero_length_and_absent_bodies_are_indistinguishable() {
    let empty = SyncClient::new(Scripted::new(|_: &NativeRequest| {
        TransportOutcome::response(ResponseMeta::new(200), Vec::new())
    }));
    let absent = SyncClient::new(Scripted::new(|_: &NativeRequest| TransportOutcome {
        meta: Some(ResponseMeta::new(200)),
        ..TransportOutcome::default()
    }));

    let req = Request::get("http://localhost/");
    let from_empty = empty.send(&req).unwrap();
    let from_absent = absent.send(&req).unwrap();
    assert_eq!(from_empty, from_absent);
    assert!(from_empty.body().is_none());
    assert!(from_empty.body_bytes().is_empty());
}

#[test]
fn transport_sees_the_request_as_built() {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let client = SyncClient::new(Scripted::new(move |req: &NativeRequest| {
        *sink.lock().unwrap() = Some(req.clone());
        ok_with(201)
    }));

    let req = Request::new(Method::Patch, "https://example.test/items/7")
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"done":true}"#)
        .with_timeout(Duration::from_secs(3));
    let resp = client.send(&req).unwrap();
    assert_eq!(resp.status_code(), 201);

    let native = seen.lock().unwrap().take().unwrap();
    assert_eq!(native.method, Method::Patch);
    assert_eq!(native.url.as_str(), "https://example.test/items/7");
    assert_eq!(
        native.headers,
        vec![("Content-Type".to_string(), "application/json".to_string())]
    );
    assert_eq!(native.body.as_deref(), Some(&br#"{"done":true}"#[..]));
    assert_eq!(native.timeout, Duration::from_secs(3));
}

#[test]
fn non_2xx_status_is_a_response_not_an_error() {
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| {
        TransportOutcome::response(ResponseMeta::new(503), b"busy".to_vec())
    }));
    let resp = client.send(&Request::get("http://localhost/")).unwrap();
    assert_eq!(resp.status_code(), 503);
    assert!(!resp.is_success());
    assert_eq!(resp.body_bytes(), b"busy");
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn single_error_callback_yields_transport_failure() {
    init_logging();
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| {
        TransportOutcome::failed(TransportError::other(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }));

    let err = client.send(&Request::get("http://localhost/")).unwrap_err();
    match err.transport_cause() {
        Some(TransportError::Other(cause)) => {
            let io = cause.downcast_ref::<std::io::Error>().unwrap();
            assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
        }
        other => panic!("expected adapter error, got {other:?}"),
    }
}

#[test]
fn completion_without_metadata_or_error_is_no_response() {
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| TransportOutcome {
        body: Some(b"orphan".to_vec()),
        ..TransportOutcome::default()
    }));
    let err = client.send(&Request::get("http://localhost/")).unwrap_err();
    assert!(matches!(err, HttpError::TransportFailure(TransportError::NoResponse)));
}

#[test]
fn metadata_together_with_error_is_rejected() {
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| TransportOutcome {
        meta: Some(ResponseMeta::new(200)),
        body: Some(vec![1]),
        error: Some(TransportError::TimedOut),
    }));
    let err = client.send(&Request::get("http://localhost/")).unwrap_err();
    assert!(matches!(
        err,
        HttpError::TransportFailure(TransportError::ContractViolation { status: 200, .. })
    ));
}

#[test]
fn dropped_completion_unblocks_the_caller() {
    init_logging();
    let client = SyncClient::new(Forgetful);
    let err = client.send(&Request::get("http://localhost/")).unwrap_err();
    assert!(matches!(
        err,
        HttpError::TransportFailure(TransportError::CompletionDropped)
    ));
}

#[test]
fn client_is_reusable_after_failures() {
    let fail_first = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fail_first);
    let client = SyncClient::new(Scripted::new(move |_: &NativeRequest| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            TransportOutcome::failed(TransportError::TimedOut)
        } else {
            ok_with(200)
        }
    }));

    assert!(client.send(&Request::get("bad url")).is_err());
    assert!(client.send(&Request::get("http://localhost/")).is_err());
    assert_eq!(client.send(&Request::get("http://localhost/")).unwrap().status_code(), 200);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[test]
fn cancelling_from_another_thread_unblocks_the_waiter() {
    init_logging();
    let client = SyncClient::new(Stalled::default());
    let pending = client.start(&Request::get("http://localhost/slow")).unwrap();
    let handle = pending.handle();
    assert_eq!(handle.id(), pending.call_id());

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.cancel()
    });

    let err = pending.wait().unwrap_err();
    assert!(err.is_cancelled());
    assert!(canceller.join().unwrap());
}

#[test]
fn transport_completion_after_cancel_is_ignored() {
    let client = SyncClient::new(Stalled::default());
    let pending = client.start(&Request::get("http://localhost/")).unwrap();
    pending.handle().cancel();

    let stalled = client.transport().handles.lock().unwrap()[0].clone();
    assert!(!stalled.complete(ok_with(200)));
    assert!(pending.wait().unwrap_err().is_cancelled());
}

#[test]
fn cancel_after_completion_keeps_the_response() {
    let client = SyncClient::new(Stalled::default());
    let pending = client.start(&Request::get("http://localhost/")).unwrap();

    let stalled = client.transport().handles.lock().unwrap()[0].clone();
    assert!(stalled.complete(ok_with(204)));
    assert!(!pending.handle().cancel());
    assert_eq!(pending.wait().unwrap().status_code(), 204);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_callers_get_their_own_responses() {
    let transport = Arc::new(Scripted::new(|req: &NativeRequest| {
        let status: u16 = req.url.path().trim_start_matches('/').parse().unwrap();
        TransportOutcome::response(ResponseMeta::new(status), req.url.path().as_bytes().to_vec())
    }));
    let client = SyncClient::new(Arc::clone(&transport));

    let workers: Vec<_> = (200u16..216)
        .map(|status| {
            let client = client.clone();
            thread::spawn(move || {
                let resp = client.send(&Request::get(format!("http://localhost/{status}"))).unwrap();
                (status, resp)
            })
        })
        .collect();

    for worker in workers {
        let (status, resp) = worker.join().unwrap();
        assert_eq!(resp.status_code(), status);
        assert_eq!(resp.body_bytes(), format!("/{status}").as_bytes());
    }
    assert_eq!(transport.calls(), 16);
}

#[test]
fn boxed_transport_can_be_used() {
    let transport: Box<dyn Transport> = Box::new(Scripted::new(|_: &NativeRequest| ok_with(202)));
    let client = SyncClient::new(transport);
    assert_eq!(client.send(&Request::get("http://localhost/")).unwrap().status_code(), 202);
}

#[tokio::test]
async fn wait_async_resolves_inside_a_runtime() {
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| ok_with(200)));
    let pending = client.start(&Request::get("http://localhost/")).unwrap();
    let resp = pending.wait_async().await.unwrap();
    assert_eq!(resp.status_code(), 200);
}

#[tokio::test]
async fn send_returns_inside_a_runtime() {
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| ok_with(204)));
    let resp = client.send(&Request::get("http://localhost/")).unwrap();
    assert_eq!(resp.status_code(), 204);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_returns_on_a_multi_thread_runtime_worker() {
    let client = SyncClient::new(Scripted::new(|_: &NativeRequest| ok_with(200)));
    let resp = client.send(&Request::get("http://localhost/")).unwrap();
    assert_eq!(resp.status_code(), 200);
}

#[test]
fn call_ids_are_unique() {
    let client = SyncClient::new(Stalled::default());
    let a = client.start(&Request::get("http://localhost/")).unwrap();
    let b = client.start(&Request::get("http://localhost/")).unwrap();
    assert_ne!(a.call_id(), b.call_id());
    assert_ne!(a.call_id(), Uuid::nil());
    a.handle().cancel();
    b.handle().cancel();
}

//! C-ABI wrapper around `compat-core`.
//!
//! # Overview
//! Exposes request construction, blocking send, and start/wait/cancel
//! through `extern "C"` functions, so a host without a native networking
//! framework can issue HTTP/1.1 requests through this library.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Requests are built incrementally on an opaque `FfiRequest` handle and
//!   borrowed by `compat_client_send` / `compat_client_start`; the caller
//!   keeps ownership and may reuse them.
//! - A single `FfiSendResult` envelope conveys responses and errors
//!   uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `compat_*_free` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use compat_core::{ByteBuffer, Request, SyncClient, Transport, UreqTransport, Version};
use log::debug;

use types::*;

/// Borrow a C string as UTF-8. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn utf8<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn client_with(transport: Arc<dyn Transport>) -> *mut FfiClient {
    Box::into_raw(Box::new(FfiClient {
        inner: SyncClient::new(transport),
    }))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client backed by the bundled HTTP/1.1 transport.
///
/// Returns null if an internal panic occurs.
/// The caller must free the returned pointer with `compat_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn compat_client_new() -> *mut FfiClient {
    catch_unwind(|| client_with(Arc::new(UreqTransport::new()))).unwrap_or(std::ptr::null_mut())
}

/// Create a client that sends `user_agent` when a request carries none.
///
/// Returns null if `user_agent` is null or not valid UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn compat_client_new_with_user_agent(user_agent: *const c_char) -> *mut FfiClient {
    catch_unwind(|| {
        let Some(user_agent) = (unsafe { utf8(user_agent) }) else {
            return std::ptr::null_mut();
        };
        client_with(Arc::new(UreqTransport::with_user_agent(user_agent)))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `compat_client_new*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn compat_client_free(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

/// Create a request for `url` with no headers, no body, HTTP/1.1 and a
/// 60 second timeout.
///
/// The URL is only validated when the request is sent.
/// Returns null if `url` is null or not valid UTF-8.
/// The caller must free the returned pointer with `compat_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn compat_request_new(method: FfiMethod, url: *const c_char) -> *mut FfiRequest {
    catch_unwind(|| {
        let Some(url) = (unsafe { utf8(url) }) else {
            return std::ptr::null_mut();
        };
        Box::into_raw(Box::new(FfiRequest {
            inner: Request::new(method.into(), url),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Set a header, replacing any value stored under exactly the same name.
///
/// Returns false if any argument is null or not valid UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn compat_request_set_header(
    request: *mut FfiRequest,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return false;
        }
        let (Some(name), Some(value)) = (unsafe { utf8(name) }, unsafe { utf8(value) }) else {
            return false;
        };
        let request = unsafe { &mut *request };
        request.inner.headers.insert(name.to_string(), value.to_string());
        true
    }))
    .unwrap_or(false)
}

/// Copy `len` bytes from `data` into the request body.
///
/// A null `data` with `len == 0` clears the body. Returns false if `request`
/// is null, or `data` is null while `len` is non-zero.
#[unsafe(no_mangle)]
pub extern "C" fn compat_request_set_body(
    request: *mut FfiRequest,
    data: *const u8,
    len: usize,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() || (data.is_null() && len > 0) {
            return false;
        }
        let request = unsafe { &mut *request };
        request.inner.body = if data.is_null() {
            None
        } else {
            let bytes = unsafe { std::slice::from_raw_parts(data, len) };
            Some(ByteBuffer::from_slice(bytes))
        };
        true
    }))
    .unwrap_or(false)
}

/// Set the round-trip timeout in milliseconds. Zero disables the timeout.
#[unsafe(no_mangle)]
pub extern "C" fn compat_request_set_timeout_ms(request: *mut FfiRequest, timeout_ms: u64) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return false;
        }
        let request = unsafe { &mut *request };
        request.inner.timeout = Duration::from_millis(timeout_ms);
        true
    }))
    .unwrap_or(false)
}

/// Set the protocol version. Anything but 1.1 makes the send fail with
/// `InvalidRequest`.
#[unsafe(no_mangle)]
pub extern "C" fn compat_request_set_version(request: *mut FfiRequest, major: u8, minor: u8) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if request.is_null() {
            return false;
        }
        let request = unsafe { &mut *request };
        request.inner.version = Version::new(major, minor);
        true
    }))
    .unwrap_or(false)
}

/// Free a request created by `compat_request_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn compat_request_free(request: *mut FfiRequest) {
    if !request.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(request) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// Send `request` and block until it completes.
///
/// `request` is borrowed, not consumed. Always returns a result; free it with
/// `compat_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn compat_client_send(
    client: *const FfiClient,
    request: *const FfiRequest,
) -> *mut FfiSendResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiSendResult::null_arg("client");
        }
        if request.is_null() {
            return FfiSendResult::null_arg("request");
        }
        let client = unsafe { &*client };
        let request = unsafe { &*request };
        FfiSendResult::from_result(client.inner.send(&request.inner))
    }))
    .unwrap_or_else(|_| FfiSendResult::panic("panic in compat_client_send"))
}

/// Start `request` without waiting for it.
///
/// Returns null if `client` or `request` is null. A request that fails
/// validation still yields a pending call; its error is reported by
/// `compat_pending_wait`. The caller must pass the returned pointer to
/// `compat_pending_wait` or `compat_pending_free`.
#[unsafe(no_mangle)]
pub extern "C" fn compat_client_start(
    client: *const FfiClient,
    request: *const FfiRequest,
) -> *mut FfiPending {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() || request.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let request = unsafe { &*request };
        Box::into_raw(Box::new(FfiPending {
            inner: client.inner.start(&request.inner),
        }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Get a cancellation handle for a pending call.
///
/// Returns null if `pending` is null or the request was rejected before it
/// started. Free the handle with `compat_task_handle_free`; it stays valid
/// after the pending call is waited on or freed.
#[unsafe(no_mangle)]
pub extern "C" fn compat_pending_handle(pending: *const FfiPending) -> *mut FfiTaskHandle {
    catch_unwind(AssertUnwindSafe(|| {
        if pending.is_null() {
            return std::ptr::null_mut();
        }
        let pending = unsafe { &*pending };
        match &pending.inner {
            Ok(call) => Box::into_raw(Box::new(FfiTaskHandle {
                inner: call.handle(),
            })),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Block until the pending call completes, then free it.
///
/// `pending` must not be used again after this call. Always returns a
/// result; free it with `compat_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn compat_pending_wait(pending: *mut FfiPending) -> *mut FfiSendResult {
    catch_unwind(AssertUnwindSafe(|| {
        if pending.is_null() {
            return FfiSendResult::null_arg("pending");
        }
        let pending = unsafe { Box::from_raw(pending) };
        FfiSendResult::from_result(pending.inner.and_then(|call| call.wait()))
    }))
    .unwrap_or_else(|_| FfiSendResult::panic("panic in compat_pending_wait"))
}

/// Free a pending call without waiting for it. The transport may still run
/// to completion in the background. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn compat_pending_free(pending: *mut FfiPending) {
    if !pending.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let pending = unsafe { Box::from_raw(pending) };
            if let Ok(call) = &pending.inner {
                debug!("call {}: abandoned by caller", call.call_id());
            }
        }));
    }
}

/// Cancel the call behind `handle`. Callable from any thread.
///
/// Returns true if this cancellation is what completed the call; false if
/// `handle` is null or the call had already completed.
#[unsafe(no_mangle)]
pub extern "C" fn compat_task_cancel(handle: *const FfiTaskHandle) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if handle.is_null() {
            return false;
        }
        let handle = unsafe { &*handle };
        handle.inner.cancel()
    }))
    .unwrap_or(false)
}

/// Free a handle returned by `compat_pending_handle`. Does not cancel.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn compat_task_handle_free(handle: *mut FfiTaskHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(handle) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiSendResult` and everything it points to. Safe to call with
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn compat_free_result(result: *mut FfiSendResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.headers.is_null() && result.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    result.headers,
                    result.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
        if !result.body.is_null() {
            drop(unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(result.body, result.body_len))
            });
        }
    }));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

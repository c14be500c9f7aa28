//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Opaque handles (`FfiClient`, `FfiRequest`, `FfiPending`, `FfiTaskHandle`)
//! wrap core values that C never looks inside. Results cross the boundary as
//! one `FfiSendResult` envelope using C-compatible representations:
//! `*mut c_char` for strings and pointer + length pairs for byte and header
//! arrays. Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Arc;

use compat_core::{
    HttpError, Method, PendingResponse, Request, Response, SyncClient, TaskHandle, Transport,
    TransportError,
};

/// Opaque handle to a `SyncClient`.
pub struct FfiClient {
    pub(crate) inner: SyncClient<Arc<dyn Transport>>,
}

/// Opaque handle to a request under construction.
pub struct FfiRequest {
    pub(crate) inner: Request,
}

/// Opaque handle to a started call.
///
/// Holds the validation error instead of a pending call when the request
/// was rejected, so `compat_pending_wait` can report it.
pub struct FfiPending {
    pub(crate) inner: Result<PendingResponse, HttpError>,
}

/// Opaque handle for cancelling a started call from any thread.
pub struct FfiTaskHandle {
    pub(crate) inner: TaskHandle,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Head = 4,
    Options = 5,
    Patch = 6,
    Trace = 7,
    Connect = 8,
}

impl From<FfiMethod> for Method {
    fn from(m: FfiMethod) -> Self {
        match m {
            FfiMethod::Get => Method::Get,
            FfiMethod::Post => Method::Post,
            FfiMethod::Put => Method::Put,
            FfiMethod::Delete => Method::Delete,
            FfiMethod::Head => Method::Head,
            FfiMethod::Options => Method::Options,
            FfiMethod::Patch => Method::Patch,
            FfiMethod::Trace => Method::Trace,
            FfiMethod::Connect => Method::Connect,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiSendResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    InvalidRequest = 1,
    TransportFailure = 2,
    Cancelled = 3,
    TimedOut = 4,
    NullArg = 5,
    Panic = 6,
}

/// Result envelope for `compat_client_send` and `compat_pending_wait`.
///
/// On success `error_code` is `Ok`, `error_message` is null, and the status,
/// headers and body describe the response. `body` is null and `body_len` is
/// zero when the response had no body.
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and every response field is zero or null.
#[repr(C)]
pub struct FfiSendResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status: u16,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiSendResult {
    pub(crate) fn from_result(result: Result<Response, HttpError>) -> *mut Self {
        match result {
            Ok(response) => Self::ok(response),
            Err(err) => Self::from_error(err),
        }
    }

    /// Build a success result carrying the response.
    pub(crate) fn ok(response: Response) -> *mut Self {
        let (status, headers, body) = response.into_parts();

        let headers_len = headers.len() as u32;
        let headers = if headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        let (body, body_len) = match body {
            Some(bytes) => {
                let bytes = bytes.into_vec().into_boxed_slice();
                let len = bytes.len();
                (Box::into_raw(bytes) as *mut u8, len)
            }
            None => (std::ptr::null_mut(), 0),
        };

        Box::into_raw(Box::new(FfiSendResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            status,
            headers,
            headers_len,
            body,
            body_len,
        }))
    }

    /// Build an error result from an `HttpError`.
    pub(crate) fn from_error(err: HttpError) -> *mut Self {
        let error_code = match &err {
            HttpError::InvalidRequest(_) => FfiErrorCode::InvalidRequest,
            HttpError::TransportFailure(TransportError::Cancelled) => FfiErrorCode::Cancelled,
            HttpError::TransportFailure(TransportError::TimedOut) => FfiErrorCode::TimedOut,
            HttpError::TransportFailure(_) => FfiErrorCode::TransportFailure,
        };
        Self::failure(error_code, err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg.to_string())
    }

    fn failure(error_code: FfiErrorCode, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiSendResult {
            error_code,
            error_message: c_string(msg),
            status: 0,
            headers: std::ptr::null_mut(),
            headers_len: 0,
            body: std::ptr::null_mut(),
            body_len: 0,
        }))
    }
}

/// Convert to an owned C string, dropping interior NUL bytes.
fn c_string(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(s).unwrap_or_default().into_raw()
}

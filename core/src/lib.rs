//! Cross-platform HTTP compatibility core.
//!
//! # Overview
//! Provides byte buffers, an HTTP request/response value model, and a
//! synchronous client that turns one asynchronous transport call into one
//! blocking call. It stands in for a platform networking framework where
//! none is available.
//!
//! # Design
//! - `SyncClient` is stateless: it holds only a `Transport`.
//! - Requests are validated before submission, so malformed URLs and
//!   unsupported versions never reach the network.
//! - A transport completes each call exactly once through a `TaskHandle`;
//!   the client waits on a one-shot channel and maps the outcome to either a
//!   complete `Response` or an `HttpError`, never a mix of both.
//! - `UreqTransport` is the bundled transport: one worker thread per call,
//!   HTTP/1.1 only, no pooling, no redirects.

pub mod adapter;
pub mod buffer;
pub mod client;
pub mod error;
pub mod http;
pub mod task;
pub mod transport;

pub use adapter::UreqTransport;
pub use buffer::ByteBuffer;
pub use client::{PendingResponse, SyncClient};
pub use error::{HttpError, InvalidRequest, TransportError};
pub use http::{Headers, Method, Request, Response, Version};
pub use task::TaskHandle;
pub use transport::{Completion, NativeRequest, ResponseMeta, Transport, TransportOutcome};

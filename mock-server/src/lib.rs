use std::{collections::BTreeMap, time::Duration};

use axum::{
    body::Bytes,
    extract::Path,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Longest delay `/delay/{ms}` will honour.
pub const MAX_DELAY_MS: u64 = 30_000;

/// What the server saw, as returned by `/inspect`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestInfo {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body_len: usize,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/inspect", any(inspect))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", get(delay))
        .route("/bytes/{len}", get(bytes))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Reply with the request body, the method in `x-echo-method`, and every
/// `x-` request header copied back.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Response {
    debug!("echo {method} with {} body bytes", body.len());
    let mut reply = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(method.as_str()) {
        reply.insert(HeaderName::from_static("x-echo-method"), value);
    }
    for (name, value) in &headers {
        if name.as_str().starts_with("x-") || name.as_str() == "content-type" {
            reply.append(name.clone(), value.clone());
        }
    }
    (StatusCode::OK, reply, body).into_response()
}

async fn inspect(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let info = RequestInfo {
        id: Uuid::new_v4(),
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body_len: body.len(),
    };
    debug!("inspect {} {} -> {}", info.method, info.path, info.id);
    let mut reply = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&info.id.to_string()) {
        reply.insert(HeaderName::from_static("x-request-id"), value);
    }
    (reply, Json(info)).into_response()
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn delay(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms.min(MAX_DELAY_MS))).await;
    "done"
}

/// `len` bytes counting up from zero and wrapping at 256.
async fn bytes(Path(len): Path<usize>) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

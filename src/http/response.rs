//! HTTP response building module
//!
//! Builders for every status the gateway answers with. Builder failures are
//! logged and a bare response with the same status is returned instead.

use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use super::body::{empty_body, full_body, stream_body, ResponseBody};
use crate::store::ByteStream;

/// Header carrying the number of bytes a PUT stored
pub const X_BYTES_WRITTEN: &str = "X-Bytes-Written";

/// Build 200 response streaming file content
pub fn build_content_response(
    stream: ByteStream,
    length: u64,
    content_type: &str,
) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, length)
        .body(stream_body(stream))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            bare(StatusCode::OK)
        })
}

/// Build 200 HEAD response: headers of the GET, no body
pub fn build_head_response(length: u64, content_type: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, length)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("HEAD", &e);
            bare(StatusCode::OK)
        })
}

/// Build 201 Created response for a completed PUT
pub fn build_created_response(bytes: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::CREATED)
        .header(CONTENT_TYPE, "text/plain")
        .header(X_BYTES_WRITTEN, bytes)
        .body(full_body(bytes.to_string()))
        .unwrap_or_else(|e| {
            log_build_error("201", &e);
            bare(StatusCode::CREATED)
        })
}

/// Build 404 Not Found response
///
/// Used for both unmounted prefixes and missing entries.
pub fn build_404_response() -> Response<ResponseBody> {
    text_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response listing the mount's methods
pub fn build_405_response(allow: &str) -> Response<ResponseBody> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    match HeaderValue::from_str(allow) {
        Ok(value) => {
            response.headers_mut().insert(ALLOW, value);
        }
        Err(e) => crate::logger::log_error(&format!("Invalid Allow header {allow:?}: {e}")),
    }
    response
}

pub fn build_403_response() -> Response<ResponseBody> {
    text_response(StatusCode::FORBIDDEN, "403 Forbidden")
}

pub fn build_400_response() -> Response<ResponseBody> {
    text_response(StatusCode::BAD_REQUEST, "400 Bad Request")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<ResponseBody> {
    text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

pub fn build_500_response() -> Response<ResponseBody> {
    text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
}

fn text_response(status: StatusCode, text: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .body(full_body(Bytes::from_static(text.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            bare(status)
        })
}

fn bare(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

// Admin API response utility functions module

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::types::Nack;

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_string_pretty(body) {
        Ok(j) => j,
        Err(e) => {
            logger::log_admin_error(&format!("Failed to serialize response: {e}"));
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from(r#"{"error":"Internal server error"}"#)))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Error"))));
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            logger::log_admin_error(&format!("Failed to build response: {e}"));
            Response::new(Full::new(Bytes::from("Error")))
        })
}

/// NACK response with the given status
pub fn nack(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &Nack::new(status.as_u16(), message))
}

/// 400 Bad Request response
pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    nack(StatusCode::BAD_REQUEST, message)
}

/// 409 Conflict response
pub fn conflict_response(message: &str) -> Response<Full<Bytes>> {
    nack(StatusCode::CONFLICT, message)
}

/// 404 Not Found response for unknown admin routes
pub fn not_found() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "available_endpoints": [
                "GET /v1/mounts",
                "POST /v1/mounts",
                "DELETE /v1/mounts?prefix=/path"
            ]
        }),
    )
}

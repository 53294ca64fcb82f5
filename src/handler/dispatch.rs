//! Request dispatch module
//!
//! Entry point for gateway requests: transport checks, path decoding, routing
//! through the registry and translation of the outcome into a response.

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, REFERER, SERVER, USER_AGENT};
use hyper::{Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::action::ActionResult;
use crate::config::AppState;
use crate::http::{self, mime, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use crate::router::{Outcome, RequestContext};
use crate::store::StoreError;

/// Main entry point for gateway requests
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let access_log = state.access_log_enabled();
    let mut entry = access_log.then(|| access_entry(&req, remote_addr));

    let (mut response, context) = dispatch(req, &state).await;
    set_server_header(&mut response, &state.config.http.server_name);

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = body_bytes(&response);
        if let Some(ctx) = &context {
            entry.prefix = Some(ctx.prefix().to_string());
            entry.mount = Some(ctx.mount().name().to_string());
        }
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Run the transport checks and the router
///
/// The context is `None` when no mount was resolved.
async fn dispatch<B>(
    req: Request<B>,
    state: &AppState,
) -> (Response<ResponseBody>, Option<RequestContext>)
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return (resp, None);
    }

    let method = req.method().clone();
    let path = match urlencoding::decode(req.uri().path()) {
        Ok(path) => path.into_owned(),
        Err(e) => {
            logger::log_warning(&format!(
                "Undecodable request path {:?}: {e}",
                req.uri().path()
            ));
            return (http::build_400_response(), None);
        }
    };

    let body = http::into_byte_stream(req.into_body());
    let routed = state.gateway.router().route(&method, &path, body).await;
    (build_response(routed.outcome), routed.context)
}

/// Translate a routing outcome into the HTTP response
fn build_response(outcome: Outcome) -> Response<ResponseBody> {
    match outcome {
        Outcome::Unmounted | Outcome::Action(ActionResult::NotFound) => {
            http::build_404_response()
        }
        Outcome::MethodNotAllowed { allow } => http::build_405_response(&allow),
        Outcome::Action(ActionResult::Content {
            path,
            length,
            stream,
        }) => http::build_content_response(stream, length, mime::content_type_for(&path)),
        Outcome::Action(ActionResult::Size { path, length }) => {
            http::build_head_response(length, mime::content_type_for(&path))
        }
        Outcome::Action(ActionResult::Written { bytes }) => http::build_created_response(bytes),
        Outcome::Action(ActionResult::Failure(err)) => match err {
            StoreError::NotFound(_) => http::build_404_response(),
            StoreError::AccessDenied(_) => http::build_403_response(),
            StoreError::Io(_) => http::build_500_response(),
        },
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<ResponseBody>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn set_server_header(response: &mut Response<ResponseBody>, server_name: &str) {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            response.headers_mut().insert(SERVER, value);
        }
        Err(e) => logger::log_warning(&format!("Invalid server name {server_name:?}: {e}")),
    }
}

fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_str(req.version()).to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

/// Bytes the response body will carry; HEAD responses carry none
fn body_bytes(response: &Response<ResponseBody>) -> u64 {
    response.body().size_hint().exact().unwrap_or_else(|| {
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}

const fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

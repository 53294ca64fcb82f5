// Admin API module entry
// Mount management over a separate listener

mod handlers;
mod response;
mod types;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::logger;

pub use response::{bad_request, conflict_response, json_response, nack, not_found};
pub use types::{MountInfo, MountList};

/// Admin route handler
///
/// Dispatches to handler functions based on request path and method
pub async fn handle_admin<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let response = match (method.clone(), path.as_str()) {
        (Method::GET, "/v1/mounts") => handlers::handle_list(&state),
        (Method::POST, "/v1/mounts") => handlers::handle_mount(req, &state).await,
        (Method::DELETE, "/v1/mounts") => handlers::handle_unmount(req.uri().query(), &state),
        _ => {
            logger::log_admin_request(method.as_str(), &path, 404);
            not_found()
        }
    };
    Ok(response)
}

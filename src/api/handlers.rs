// Mount management handlers module

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};

use super::response::{bad_request, conflict_response, json_response, nack};
use super::types::{MountInfo, MountList};
use crate::config::{AppState, MountConfig};
use crate::gateway::MountError;
use crate::logger;
use crate::registry::RegistryError;

/// Largest accepted mount definition
const MAX_DEFINITION_SIZE: usize = 64 * 1024;

/// `GET /v1/mounts`: current bindings, sorted by prefix
pub fn handle_list(state: &AppState) -> Response<Full<Bytes>> {
    let registry = state.gateway.registry();
    let list = MountList {
        frozen: registry.is_frozen(),
        on_duplicate: registry.policy(),
        mounts: registry
            .mounts()
            .iter()
            .map(|(prefix, mount)| MountInfo::new(prefix, mount))
            .collect(),
    };

    logger::log_admin_request("GET", "/v1/mounts", 200);
    json_response(StatusCode::OK, &list)
}

/// `POST /v1/mounts`: build and bind one mount definition
pub async fn handle_mount<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let whole_body = match Limited::new(req.into_body(), MAX_DEFINITION_SIZE)
        .collect()
        .await
    {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_admin_request("POST", "/v1/mounts", 400);
            return bad_request(&format!("Failed to read request body: {e}"));
        }
    };

    let definition: MountConfig = match serde_json::from_slice(&whole_body) {
        Ok(d) => d,
        Err(e) => {
            logger::log_admin_request("POST", "/v1/mounts", 400);
            return bad_request(&format!("Invalid mount definition: {e}"));
        }
    };

    match state.gateway.mount_config(&definition).await {
        Ok(()) => {
            logger::log_info(&format!(
                "[ADMIN] {} ({}) mounted at {}",
                definition.name,
                definition.store.kind(),
                definition.prefix
            ));
            logger::log_admin_request("POST", "/v1/mounts", 201);
            json_response(
                StatusCode::CREATED,
                &serde_json::json!({
                    "status": "ACK",
                    "message": format!("{} mounted at {}", definition.name, definition.prefix),
                }),
            )
        }
        Err(e) => {
            let status = error_status(&e);
            logger::log_admin_request("POST", "/v1/mounts", status.as_u16());
            let message = e.to_string();
            if status == StatusCode::CONFLICT {
                conflict_response(&message)
            } else {
                nack(status, &message)
            }
        }
    }
}

/// `DELETE /v1/mounts?prefix=/x`: remove one binding
pub fn handle_unmount(query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    let Some(prefix) = query.and_then(prefix_param) else {
        logger::log_admin_request("DELETE", "/v1/mounts", 400);
        return bad_request("Missing 'prefix' query parameter");
    };

    match state.gateway.unmount(&prefix) {
        Ok(()) => {
            logger::log_admin_request("DELETE", "/v1/mounts", 200);
            json_response(
                StatusCode::OK,
                &serde_json::json!({
                    "status": "ACK",
                    "message": format!("{prefix} unmounted"),
                }),
            )
        }
        Err(e) => {
            let status = error_status(&e);
            logger::log_admin_request("DELETE", "/v1/mounts", status.as_u16());
            nack(status, &e.to_string())
        }
    }
}

fn error_status(err: &MountError) -> StatusCode {
    match err {
        MountError::Registry(RegistryError::DuplicatePrefix(_)) => StatusCode::CONFLICT,
        MountError::Registry(RegistryError::Frozen) => StatusCode::FORBIDDEN,
        MountError::Registry(RegistryError::NotMounted(_)) => StatusCode::NOT_FOUND,
        MountError::Registry(RegistryError::InvalidPrefix { .. })
        | MountError::Store(_)
        | MountError::Pipeline(_) => StatusCode::BAD_REQUEST,
    }
}

/// Decoded value of the `prefix` query parameter
fn prefix_param(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "prefix")
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(std::borrow::Cow::into_owned)
        })
        .filter(|value| !value.is_empty())
}

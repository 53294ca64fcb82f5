// Admin API types module
// Request/response bodies of the mount management API

use serde::Serialize;

use crate::mount::MountedStore;
use crate::registry::{DuplicatePolicy, Prefix};

/// One binding as reported by `GET /v1/mounts`
#[derive(Debug, Serialize)]
pub struct MountInfo {
    pub prefix: String,
    pub name: String,
    /// Store type (`local`, `memory`)
    pub kind: String,
    pub read_only: bool,
    pub methods: Vec<String>,
}

impl MountInfo {
    pub fn new(prefix: &Prefix, mount: &MountedStore) -> Self {
        Self {
            prefix: prefix.to_string(),
            name: mount.name().to_string(),
            kind: mount.store().kind().to_string(),
            read_only: mount.store().is_read_only(),
            methods: mount
                .actions()
                .methods()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MountList {
    /// No further changes accepted
    pub frozen: bool,
    pub on_duplicate: DuplicatePolicy,
    pub mounts: Vec<MountInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Negative acknowledgement body
#[derive(Debug, Serialize)]
pub struct Nack {
    pub status: &'static str,
    pub error_detail: ErrorDetail,
}

impl Nack {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: "NACK",
            error_detail: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }
}

//! fsgate: HTTP gateway exposing file stores under URL path prefixes
//!
//! Each filesystem is bound to a prefix in a [`registry::StoreRegistry`].
//! Requests are routed to the longest matching prefix and run through a
//! per-method pipeline of [`action::Step`]s against the bound
//! [`store::FileStore`].

pub mod action;
pub mod api;
pub mod config;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod logger;
pub mod mount;
pub mod registry;
pub mod router;
pub mod server;
pub mod store;

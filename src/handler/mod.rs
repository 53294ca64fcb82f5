//! Request handler module
//!
//! Turns hyper requests into routed gateway operations and their outcomes
//! back into responses.

pub mod dispatch;

// Re-export main entry point
pub use dispatch::handle_request;

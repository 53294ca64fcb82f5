//! HTTP protocol layer module
//!
//! Body adapters, response builders and content type detection, kept apart
//! from routing so the admin API can share them.

pub mod body;
pub mod mime;
pub mod response;

pub use body::{empty_body, full_body, into_byte_stream, stream_body, ResponseBody};
pub use response::{
    build_400_response, build_403_response, build_404_response, build_405_response,
    build_413_response, build_500_response, build_content_response, build_created_response,
    build_head_response, X_BYTES_WRITTEN,
};

//! Body adapters between hyper and the store byte streams

use futures_util::{future, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, StreamBody};
use hyper::body::{Body, Bytes, Frame};
use std::io;

use crate::store::ByteStream;

/// Body type of every gateway response
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream file content to the client; dropping the body drops the stream
pub fn stream_body(stream: ByteStream) -> ResponseBody {
    StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
}

/// Request body as a store byte stream, trailers skipped
pub fn into_byte_stream<B>(body: B) -> ByteStream
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let frames = TryStreamExt::map_err(BodyStream::new(body), io::Error::other);
    Box::pin(frames.try_filter_map(|frame| future::ready(Ok(frame.into_data().ok()))))
}

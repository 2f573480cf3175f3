//! Transport layer: blocking REST client and the SSE stream reader.

pub mod http;
pub mod stream;

pub use http::ApiClient;
pub use stream::{StreamConfig, StreamHandle};

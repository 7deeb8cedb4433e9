use sc_core::{ClientConfig, Result, Transport};
use std::sync::Arc;

pub mod http;

pub use http::HttpClient;

/// Builds the transport every store shares.
pub fn create_transport(config: &ClientConfig) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(HttpClient::from_config(config)?))
}

pub mod prelude {
    pub use super::create_transport;
    pub use super::HttpClient;
    pub use sc_core::{Error, Method, RequestOptions, Result, Transport};
}

pub mod config;
pub mod error;
pub mod storage;
pub mod transport;
pub mod types;

pub use config::{ClientConfig, StorageKind};
pub use error::{Error, Result};
pub use storage::{KeyValueStorage, TOKEN_KEY};
pub use transport::{decode, Method, RequestOptions, Transport};
pub use types::*;

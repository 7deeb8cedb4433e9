use sc_core::{KeyValueStorage, Result, StorageKind};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub mod backends;

pub use backends::*;

/// Opens the durable storage selected by `kind`. `path` is only used by the
/// file backend.
pub async fn create_storage(kind: StorageKind, path: &Path) -> Result<Arc<dyn KeyValueStorage>> {
    debug!("Opening {} storage", kind);
    match kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageKind::File => Ok(Arc::new(FileStorage::open(path).await?)),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
    pub use sc_core::{KeyValueStorage, TOKEN_KEY};
}

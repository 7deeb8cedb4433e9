use sc_core::{ClientConfig, KeyValueStorage, Result, Transport};
use std::sync::Arc;
use tracing::info;

pub mod articles;
pub mod session;
pub mod status;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_utils;

pub use articles::{ArticleStore, CatalogState};
pub use session::{SessionState, SessionStore};
pub use status::{RequestStatus, StatusTracker};
pub use summary::SummaryStore;

/// Every store the view layer talks to, built once at start-up and shared
/// by reference.
#[derive(Debug)]
pub struct Stores {
    pub session: Arc<SessionStore>,
    pub articles: ArticleStore,
    pub summaries: SummaryStore,
}

impl Stores {
    pub async fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStorage>,
        clear_session_on_unauthorized: bool,
    ) -> Result<Self> {
        let session = Arc::new(
            SessionStore::restore(transport.clone(), storage)
                .await?
                .clear_session_on_unauthorized(clear_session_on_unauthorized),
        );

        Ok(Self {
            articles: ArticleStore::new(transport.clone(), session.clone()),
            summaries: SummaryStore::new(transport, session.clone()),
            session,
        })
    }

    /// Wires the HTTP transport and durable storage named by `config`.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = sc_client::create_transport(config)?;
        let storage = sc_storage::create_storage(config.storage, &config.storage_path).await?;
        let stores = Self::new(transport, storage, config.clear_session_on_unauthorized).await?;
        info!(
            "🔌 Stores ready (api {}, {} storage, signed in: {})",
            config.base_url,
            config.storage,
            stores.session.is_authenticated()
        );
        Ok(stores)
    }
}

pub mod prelude {
    pub use super::{ArticleStore, RequestStatus, SessionStore, Stores, SummaryStore};
    pub use sc_core::{Article, ArticleQuery, ArticleUpdate, Error, Result, Tags, User};
}

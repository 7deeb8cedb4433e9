use sc_core::{decode, Method, RequestOptions, Result, SummaryResponse, Transport};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::session::SessionStore;
use crate::status::{RequestStatus, StatusTracker};

/// On-demand server-side summarization. Holds no article data; callers
/// apply the returned summary themselves.
#[derive(Debug)]
pub struct SummaryStore {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    status: StatusTracker,
}

impl SummaryStore {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            transport,
            session,
            status: StatusTracker::new(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RequestStatus> {
        self.status.subscribe()
    }

    pub fn clear_error(&self) {
        self.status.clear_error();
    }

    pub async fn summarize(&self, article_id: u64) -> Result<SummaryResponse> {
        info!("🤖 Requesting summary for article {}", article_id);
        let path = format!("/api/articles/{}/summarize", article_id);
        let options = RequestOptions::new().bearer(self.session.bearer().as_deref());

        let result = self
            .status
            .track(false, |e| e.to_string(), async {
                decode(self.transport.request(Method::POST, &path, options).await?)
            })
            .await;

        match &result {
            Ok(_) => info!("✨ Summary generated for article {}", article_id),
            Err(e) => warn!("Summarization of article {} failed: {}", article_id, e),
        }
        result
    }
}

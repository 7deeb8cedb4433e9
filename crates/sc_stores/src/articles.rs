use sc_core::{
    decode, Article, ArticleQuery, ArticleUpdate, Method, RequestOptions, Result, Transport,
};
use serde::de::{DeserializeOwned, IgnoredAny};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::session::SessionStore;
use crate::status::{RequestStatus, StatusTracker};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    /// Server order; never re-sorted locally.
    pub articles: Vec<Article>,
    pub tags: Vec<String>,
}

/// Article listing, search and mutation.
///
/// Actions hand their payload back to the caller; only the `refresh*`
/// helpers and the local setters write into [`CatalogState`]. Failures are
/// recorded in `error` and returned. `error` is not cleared by later
/// successes; call [`ArticleStore::clear_error`] for that.
#[derive(Debug)]
pub struct ArticleStore {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    state: watch::Sender<CatalogState>,
    status: StatusTracker,
}

impl ArticleStore {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        let (state, _rx) = watch::channel(CatalogState::default());
        Self {
            transport,
            session,
            state,
            status: StatusTracker::new(),
        }
    }

    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    pub fn articles(&self) -> Vec<Article> {
        self.state.borrow().articles.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state.borrow().tags.clone()
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

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str, options: RequestOptions) -> Result<T> {
        let options = options.bearer(self.session.bearer().as_deref());
        debug!("Article request {} {}", method, path);

        self.status
            .track(false, |e| e.to_string(), async {
                let payload = self.transport.request(method.clone(), path, options).await?;
                decode(payload)
            })
            .await
            .map_err(|e| {
                warn!("{} {} failed: {}", method, path, e);
                e
            })
    }

    async fn call_unit(&self, method: Method, path: &str) -> Result<()> {
        self.call::<IgnoredAny>(method, path, RequestOptions::new()).await?;
        Ok(())
    }

    pub async fn get_articles(&self, query: ArticleQuery) -> Result<Vec<Article>> {
        let options = RequestOptions::new().params(query.into_params());
        self.call(Method::GET, "/api/articles", options).await
    }

    pub async fn get_recent_articles(&self) -> Result<Vec<Article>> {
        self.call(Method::GET, "/api/articles/recent", RequestOptions::new()).await
    }

    pub async fn get_favorite_articles(&self) -> Result<Vec<Article>> {
        self.call(Method::GET, "/api/articles/favorites", RequestOptions::new()).await
    }

    /// Distinct tag vocabulary, trimmed, in server order.
    pub async fn get_tags(&self) -> Result<Vec<String>> {
        let raw: Vec<String> = self.call(Method::GET, "/api/articles/tags", RequestOptions::new()).await?;
        let mut tags: Vec<String> = Vec::with_capacity(raw.len());
        for tag in raw {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        Ok(tags)
    }

    pub async fn search_articles(&self, query: &str) -> Result<Vec<Article>> {
        let options = RequestOptions::new().param("q", query);
        self.call(Method::GET, "/api/articles/search", options).await
    }

    pub async fn get_article(&self, id: u64) -> Result<Article> {
        self.call(Method::GET, &format!("/api/articles/{}", id), RequestOptions::new())
            .await
    }

    pub async fn update_article(&self, id: u64, update: &ArticleUpdate) -> Result<Article> {
        let options = RequestOptions::new().json(update)?;
        self.call(Method::PUT, &format!("/api/articles/{}", id), options).await
    }

    pub async fn delete_article(&self, id: u64) -> Result<()> {
        self.call_unit(Method::DELETE, &format!("/api/articles/{}", id)).await
    }

    /// Flips the favorite flag server-side and returns the updated article.
    pub async fn toggle_favorite(&self, id: u64) -> Result<Article> {
        self.call(Method::POST, &format!("/api/articles/{}/favorite", id), RequestOptions::new())
            .await
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.call_unit(Method::DELETE, "/api/articles/history").await
    }

    pub async fn clear_favorites(&self) -> Result<()> {
        self.call_unit(Method::DELETE, "/api/articles/favorites").await
    }

    /// The simple public listing used by the display page.
    pub async fn list_feed(&self) -> Result<Vec<Article>> {
        self.call(Method::GET, "/api/v1/articles", RequestOptions::new()).await
    }

    /// Fetches a listing and makes it the current `articles`.
    pub async fn refresh(&self, query: ArticleQuery) -> Result<usize> {
        let articles = self.get_articles(query).await?;
        let count = articles.len();
        self.set_articles(articles);
        Ok(count)
    }

    pub async fn refresh_tags(&self) -> Result<usize> {
        let tags = self.get_tags().await?;
        let count = tags.len();
        self.set_tags(tags);
        Ok(count)
    }

    pub fn set_articles(&self, articles: Vec<Article>) {
        self.state.send_modify(|state| state.articles = articles);
    }

    pub fn set_tags(&self, tags: Vec<String>) {
        self.state.send_modify(|state| state.tags = tags);
    }

    /// Swaps in a server representation of an article already held.
    pub fn replace_local(&self, article: Article) -> bool {
        self.state.send_if_modified(|state| {
            match state.articles.iter_mut().find(|a| a.id == article.id) {
                Some(existing) => {
                    *existing = article;
                    true
                }
                None => false,
            }
        })
    }

    pub fn remove_local(&self, id: u64) -> bool {
        self.state.send_if_modified(|state| {
            let before = state.articles.len();
            state.articles.retain(|a| a.id != id);
            state.articles.len() != before
        })
    }

    /// Stores a generated summary on the held article with `id`.
    pub fn apply_summary(&self, id: u64, summary: &str) -> bool {
        self.state.send_if_modified(|state| {
            match state.articles.iter_mut().find(|a| a.id == id) {
                Some(article) => {
                    article.summary = summary.to_string();
                    true
                }
                None => false,
            }
        })
    }
}

use sc_core::{
    decode, Error, KeyValueStorage, LoginRequest, LoginResponse, Method, ProfileUpdate,
    RegisterRequest, RequestOptions, Result, Transport, User, WxLoginRequest, TOKEN_KEY,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::status::{RequestStatus, StatusTracker};

const LOGIN_FAILED: &str = "login failed";
const WX_LOGIN_FAILED: &str = "wechat login failed";
const FETCH_USER_FAILED: &str = "failed to fetch user info";
const UPDATE_PROFILE_FAILED: &str = "failed to update profile";
const REGISTER_FAILED: &str = "registration failed";

#[derive(Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Owns the bearer token and the current user profile.
///
/// The token is persisted under [`TOKEN_KEY`] so a restarted client picks
/// the session back up through [`SessionStore::restore`]. Every action resets
/// `error` when it starts.
pub struct SessionStore {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn KeyValueStorage>,
    state: watch::Sender<SessionState>,
    status: StatusTracker,
    clear_on_unauthorized: bool,
}

impl SessionStore {
    /// Builds the store from whatever token a previous run persisted.
    pub async fn restore(transport: Arc<dyn Transport>, storage: Arc<dyn KeyValueStorage>) -> Result<Self> {
        let token = storage.get(TOKEN_KEY).await?;
        if token.is_some() {
            debug!("Restored persisted session token");
        }
        let (state, _rx) = watch::channel(SessionState { user: None, token });

        Ok(Self {
            transport,
            storage,
            state,
            status: StatusTracker::new(),
            clear_on_unauthorized: false,
        })
    }

    /// When set, a 401/403 from an authenticated profile call logs out.
    pub fn clear_session_on_unauthorized(mut self, clear: bool) -> Self {
        self.clear_on_unauthorized = clear;
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Token for callers that attach `Authorization: Bearer` themselves.
    pub fn bearer(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn status(&self) -> RequestStatus {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RequestStatus> {
        self.status.subscribe()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>> {
        info!("Logging in as {}", username);
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/api/users/login", &request, LOGIN_FAILED).await
    }

    pub async fn wx_login(&self, request: &WxLoginRequest) -> Result<Option<User>> {
        info!("Logging in with WeChat");
        self.authenticate("/api/users/wx-login", request, WX_LOGIN_FAILED).await
    }

    async fn authenticate<T>(&self, path: &str, credentials: &T, default: &str) -> Result<Option<User>>
    where
        T: serde::Serialize + Sync,
    {
        let result = self
            .status
            .track(true, |e| e.message_or(default), async {
                let options = RequestOptions::new().json(credentials)?;
                let payload = self.transport.request(Method::POST, path, options).await?;
                let response: LoginResponse = decode(payload)?;

                // Persist first so memory never holds a token storage lacks.
                self.storage.set(TOKEN_KEY, &response.token).await?;
                self.state.send_modify(|state| {
                    state.token = Some(response.token.clone());
                    state.user = response.user.clone();
                });
                Ok(response.user)
            })
            .await;

        match &result {
            Ok(user) => info!(
                "Logged in as {}",
                user.as_ref().map(User::display_name).unwrap_or("<unknown>")
            ),
            Err(e) => warn!("Login failed: {}", e),
        }
        result
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<User> {
        let request = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
        };
        self.status
            .track(true, |e| e.message_or(REGISTER_FAILED), async {
                let options = RequestOptions::new().json(&request)?;
                decode(self.transport.request(Method::POST, "/api/users", options).await?)
            })
            .await
    }

    /// Drops the in-memory session and the persisted token. Idempotent.
    ///
    /// The in-memory state is cleared before the first await, so readers see
    /// the logged-out session as soon as this is called. Only the removal from
    /// [`KeyValueStorage`] is awaited, and a failure there is logged, not
    /// returned.
    pub async fn logout(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.token.is_some() || state.user.is_some();
            state.token = None;
            state.user = None;
            changed
        });
        if let Err(e) = self.storage.remove(TOKEN_KEY).await {
            warn!("Failed to remove persisted token: {}", e);
        }
        info!("Logged out");
    }

    /// Refreshes the profile. Without a token this returns `Ok(None)` and
    /// sends nothing.
    pub async fn fetch_user_info(&self) -> Result<Option<User>> {
        let Some(token) = self.bearer() else {
            return Ok(None);
        };

        let result = self
            .status
            .track(true, |e| e.message_or(FETCH_USER_FAILED), async {
                let options = RequestOptions::new().bearer(Some(&token));
                let user: User = decode(self.transport.request(Method::GET, "/api/users/me", options).await?)?;
                self.adopt_user(&token, &user);
                Ok(Some(user))
            })
            .await;

        if let Err(e) = &result {
            self.handle_rejection(e).await;
        }
        result
    }

    /// Sends a profile update and adopts the server's representation.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let token = self.bearer();

        let result = self
            .status
            .track(true, |e| e.message_or(UPDATE_PROFILE_FAILED), async {
                let token = token.ok_or(Error::NotAuthenticated)?;
                let options = RequestOptions::new().json(update)?.bearer(Some(&token));
                let user: User = decode(self.transport.request(Method::PUT, "/api/users/me", options).await?)?;
                self.adopt_user(&token, &user);
                Ok(user)
            })
            .await;

        if let Err(e) = &result {
            self.handle_rejection(e).await;
        }
        result
    }

    /// Stores `user` only if the session that sent the request is still the
    /// current one; a response landing after logout or re-login is dropped.
    fn adopt_user(&self, token: &str, user: &User) {
        let applied = self.state.send_if_modified(|state| {
            if state.token.as_deref() != Some(token) {
                return false;
            }
            state.user = Some(user.clone());
            true
        });
        if !applied {
            debug!("Discarding profile for a session that is no longer current");
        }
    }

    async fn handle_rejection(&self, err: &Error) {
        warn!("Session request failed: {}", err);
        if self.clear_on_unauthorized && err.is_unauthorized() {
            info!("Server rejected the session token");
            self.logout().await;
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .field("status", &self.status.current())
            .field("clear_on_unauthorized", &self.clear_on_unauthorized)
            .finish()
    }
}

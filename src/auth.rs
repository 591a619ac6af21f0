use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::api;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::storage::{StateStore, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN};

/// The authenticated user, as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Token pair plus resolved user, shared between the HTTP pipeline and the
/// session manager. Tokens live in the persistent store; the user is
/// in-memory only.
pub struct SessionState {
    store: Arc<dyn StateStore>,
    user: Mutex<Option<User>>,
}

impl SessionState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store, user: Mutex::new(None) }
    }

    pub fn store(&self) -> Arc<dyn StateStore> {
        self.store.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(KEY_ACCESS_TOKEN).ok().flatten().filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(KEY_REFRESH_TOKEN).ok().flatten().filter(|t| !t.is_empty())
    }

    pub fn set_access_token(&self, token: &str) {
        if let Err(e) = self.store.put(KEY_ACCESS_TOKEN, token) {
            tracing::warn!(error = %e, "failed to persist access token");
        }
    }

    pub fn set_token_pair(&self, access: &str, refresh: &str) {
        self.set_access_token(access);
        if let Err(e) = self.store.put(KEY_REFRESH_TOKEN, refresh) {
            tracing::warn!(error = %e, "failed to persist refresh token");
        }
    }

    pub fn clear_access_token(&self) {
        let _ = self.store.remove(KEY_ACCESS_TOKEN);
    }

    /// Full logout: both tokens destroyed together, user forgotten.
    pub fn clear(&self) {
        let _ = self.store.remove(KEY_ACCESS_TOKEN);
        let _ = self.store.remove(KEY_REFRESH_TOKEN);
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn user(&self) -> Option<User> {
        self.user.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.user.lock().unwrap_or_else(|e| e.into_inner()) = user;
    }
}

/// Owns the login/logout/refresh lifecycle and the current-user state.
pub struct AuthManager {
    api: ApiClient,
    session: Arc<SessionState>,
    loading: AtomicBool,
}

impl AuthManager {
    pub fn new(api: ApiClient) -> Self {
        let session = api.session();
        Self { api, session, loading: AtomicBool::new(false) }
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Startup resolution: if a persisted access token exists, one
    /// who-am-I call decides the session. Failure clears the access token
    /// and leaves the session unauthenticated; there is no startup retry
    /// loop.
    pub async fn resolve(&self) {
        if self.session.access_token().is_none() {
            return;
        }
        self.loading.store(true, Ordering::SeqCst);
        match api::me(&self.api).await {
            Ok(user) => self.session.set_user(Some(user)),
            Err(e) => {
                tracing::debug!(error = %e, "persisted token rejected, starting unauthenticated");
                self.session.clear_access_token();
                self.session.set_user(None);
            }
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Persist the token pair, then resolve the user. A failure during
    /// resolution rolls the login back entirely.
    pub async fn login(&self, access_token: &str, refresh_token: &str) -> bool {
        self.loading.store(true, Ordering::SeqCst);
        self.session.set_token_pair(access_token, refresh_token);
        let ok = match api::me(&self.api).await {
            Ok(user) => {
                self.session.set_user(Some(user));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed during user resolution");
                self.logout();
                false
            }
        };
        self.loading.store(false, Ordering::SeqCst);
        ok
    }

    /// Validate credentials client-side, exchange them for a token pair,
    /// then complete the login.
    pub async fn login_with_credentials(&self, email: &str, password: &str) -> Result<bool> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("Please enter both email and password.".to_string()));
        }
        let tokens = api::login(&self.api, email, password).await?;
        Ok(self.login(&tokens.access_token, &tokens.refresh_token).await)
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    /// Silent access-token refresh. Absent refresh token ends the session
    /// without touching the network; a failed exchange also logs out.
    pub async fn refresh(&self) -> Option<String> {
        self.api.refresh_access_token().await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("All fields are required.".to_string()));
        }
        api::register(&self.api, username, email, password).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        if email.trim().is_empty() {
            return Err(Error::Validation("Please enter your email address.".to_string()));
        }
        api::forgot_password(&self.api, email).await
    }

    pub async fn reset_password(&self, token: &str, password: &str, confirm: &str) -> Result<()> {
        if password.is_empty() || confirm.is_empty() {
            return Err(Error::Validation("Please fill in both password fields.".to_string()));
        }
        if password != confirm {
            return Err(Error::Validation("Passwords do not match.".to_string()));
        }
        if password.len() < 8 {
            return Err(Error::Validation("Password must be at least 8 characters.".to_string()));
        }
        api::reset_password(&self.api, token, password).await
    }

    pub async fn verify_email(&self, token: &str) -> Result<()> {
        api::verify_email(&self.api, token).await
    }

    pub async fn update_password(&self, current: &str, new: &str, confirm: &str) -> Result<()> {
        if current.is_empty() || new.is_empty() {
            return Err(Error::Validation("Please fill in all password fields.".to_string()));
        }
        if new != confirm {
            return Err(Error::Validation(
                "New password and confirmation do not match.".to_string(),
            ));
        }
        api::update_password(&self.api, current, new).await
    }
}

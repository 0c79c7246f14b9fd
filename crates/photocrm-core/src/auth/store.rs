//! The session store: single owner of the client's authentication state.
//!
//! Every mutation goes through a method here. Each one that touches a
//! persisted field writes the `auth-storage` record, and each one keeps the
//! default bearer header and the status channel in step with the session.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::headers::DefaultHeaders;
use super::session::{PersistedRecord, Session, AUTH_STORAGE_KEY};
use super::storage::SessionStorage;
use crate::api::{ApiError, AuthClient, Transport};
use crate::models::User;

/// Shown when a login fails without a server message
const LOGIN_FAILED_MESSAGE: &str = "Login failed";

const FORGOT_PASSWORD_FAILED_MESSAGE: &str = "Failed to send password reset email";

const RESET_PASSWORD_FAILED_MESSAGE: &str = "Password reset failed";

pub struct SessionStore {
    session: RwLock<Session>,
    headers: DefaultHeaders,
    storage: Arc<dyn SessionStorage>,
    auth: AuthClient,
    status: watch::Sender<bool>,
}

impl SessionStore {
    /// Create an empty store. Call `restore` and `check_auth` before use,
    /// or use `init` which does both.
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn SessionStorage>) -> Self {
        let (status, _) = watch::channel(false);
        Self {
            session: RwLock::new(Session::default()),
            headers: DefaultHeaders::new(),
            storage,
            auth: AuthClient::new(transport),
            status,
        }
    }

    /// Create a store, restore the persisted session and apply it.
    pub fn init(transport: Arc<dyn Transport>, storage: Arc<dyn SessionStorage>) -> Arc<Self> {
        let store = Self::new(transport, storage);
        let restore_result = store.restore();
        debug!(?restore_result, "Session restored");
        if let Err(e) = restore_result {
            warn!(error = %e, "Failed to restore session, starting signed out");
        }
        store.check_auth();
        Arc::new(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Seed the session from the persisted record.
    ///
    /// Returns whether a record with any session data was found. A malformed
    /// record is ignored; only storage failures are errors.
    pub fn restore(&self) -> Result<bool> {
        let Some(contents) = self.storage.read(AUTH_STORAGE_KEY)? else {
            return Ok(false);
        };

        let record: PersistedRecord = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed session record");
                return Ok(false);
            }
        };

        let restored = Session::from_record(record);
        let found = restored.user.is_some()
            || restored.access_token.is_some()
            || restored.refresh_token.is_some();
        *self.write() = restored;
        self.publish();
        Ok(found)
    }

    /// Re-derive authentication from the held user and token, and install or
    /// remove the default header to match. No network traffic; safe to call
    /// any number of times.
    pub fn check_auth(&self) -> bool {
        let authenticated = {
            let session = self.read();
            match session.access_token.as_deref() {
                Some(token) if session.is_authenticated() => {
                    self.headers.set_bearer(token);
                    true
                }
                _ => {
                    self.headers.clear();
                    false
                }
            }
        };
        self.publish();
        authenticated
    }

    /// Exchange credentials for a session.
    ///
    /// On failure the session is cleared, `error` holds the server's message
    /// (or a generic one) and the cause is returned wrapped in
    /// `ApiError::Authentication`.
    pub async fn login(&self, email: &str, password: &str, subdomain: &str) -> Result<(), ApiError> {
        {
            let mut session = self.write();
            session.is_loading = true;
            session.error = None;
        }

        let result = self
            .auth
            .login(email, password, subdomain)
            .await
            .and_then(|response| {
                let user = response.user.ok_or_else(|| {
                    ApiError::InvalidResponse("Login response did not include a user".to_string())
                })?;
                if response.access_token.is_empty() {
                    return Err(ApiError::InvalidResponse(
                        "Login response did not include an access token".to_string(),
                    ));
                }
                Ok((user, response.access_token, response.refresh_token))
            });

        match result {
            Ok((user, access_token, refresh_token)) => {
                let user_id = user.id.clone();
                {
                    let mut session = self.write();
                    session.user = Some(user);
                    session.access_token = Some(access_token.clone());
                    session.refresh_token = refresh_token.filter(|t| !t.is_empty());
                    session.is_loading = false;
                    session.error = None;
                }
                self.headers.set_bearer(&access_token);
                self.persist();
                self.publish();
                info!(user_id = %user_id, "Login successful");
                Ok(())
            }
            Err(e) => {
                let message = e
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string());
                warn!(error = %e, "Login failed");
                {
                    let mut session = self.write();
                    session.clear();
                    session.error = Some(message.clone());
                }
                self.headers.clear();
                self.persist();
                self.publish();
                Err(ApiError::Authentication {
                    message,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Clear the session locally. Never fails; a storage error is logged.
    pub fn logout(&self) {
        self.write().clear();
        self.headers.clear();
        self.persist();
        self.publish();
        info!("Logged out");
    }

    /// Log out locally, then tell the server. The local clear happens first
    /// and the server call's outcome only gets logged.
    pub async fn end_session(&self) {
        let bearer = self.headers.bearer();
        self.logout();

        if bearer.is_none() {
            return;
        }
        if let Err(e) = self.auth.logout(bearer).await {
            warn!(error = %e, "Server-side logout failed");
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The user is left untouched; the refresh token is replaced only when
    /// the server rotates it. Any failure logs the session out and comes
    /// back as `ApiError::SessionExpired`. If the session was replaced while
    /// the call was out, the newer one survives either outcome.
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.refresh_token() else {
            return Err(ApiError::NoRefreshToken);
        };

        let result = self.auth.refresh(&refresh_token).await.and_then(|response| {
            if response.access_token.is_empty() {
                Err(ApiError::InvalidResponse(
                    "Refresh response did not include an access token".to_string(),
                ))
            } else {
                Ok(response)
            }
        });

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.expire(&refresh_token, &e);
                return Err(ApiError::SessionExpired(Box::new(e)));
            }
        };

        {
            let mut session = self.write();
            // A logout or a new login while the call was out wins over this result
            if session.refresh_token.as_deref() != Some(refresh_token.as_str()) {
                debug!("Session changed during refresh, discarding refreshed tokens");
                return Ok(());
            }
            session.access_token = Some(response.access_token.clone());
            if let Some(rotated) = response.refresh_token.filter(|t| !t.is_empty()) {
                session.refresh_token = Some(rotated);
            }
        }
        self.headers.set_bearer(&response.access_token);
        self.persist();
        self.publish();
        debug!("Session refreshed");
        Ok(())
    }

    /// Tear down the session a failed refresh was issued for, and drop the
    /// persisted record with it. A session installed while the refresh was
    /// out is left alone.
    fn expire(&self, refresh_token: &str, cause: &ApiError) {
        {
            let mut session = self.write();
            if session.refresh_token.as_deref() != Some(refresh_token) {
                debug!(error = %cause, "Refresh failed for a session that is already gone");
                return;
            }
            session.clear();
        }
        warn!(error = %cause, "Session refresh failed, logging out");
        self.headers.clear();
        if let Err(e) = self.storage.remove(AUTH_STORAGE_KEY) {
            warn!(error = %e, "Failed to remove session record");
        }
        self.publish();
    }

    // =========================================================================
    // Direct mutations
    // =========================================================================

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    pub fn set_user(&self, user: User) {
        self.write().user = Some(user);
        self.persist();
        self.publish();
    }

    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        {
            let mut session = self.write();
            session.access_token = Some(access_token.to_string());
            session.refresh_token = Some(refresh_token.to_string()).filter(|t| !t.is_empty());
        }
        self.headers.set_bearer(access_token);
        self.persist();
        self.publish();
    }

    // =========================================================================
    // Password recovery
    // =========================================================================

    pub async fn forgot_password(&self, email: &str, subdomain: &str) -> Result<(), ApiError> {
        self.auth
            .forgot_password(email, subdomain)
            .await
            .map_err(|e| Self::authentication_error(e, FORGOT_PASSWORD_FAILED_MESSAGE))
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        self.auth
            .reset_password(token, new_password)
            .await
            .map_err(|e| Self::authentication_error(e, RESET_PASSWORD_FAILED_MESSAGE))
    }

    fn authentication_error(e: ApiError, fallback: &str) -> ApiError {
        let message = e.message().unwrap_or(fallback).to_string();
        ApiError::Authentication {
            message,
            source: Box::new(e),
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }

    /// Watch the authentication status. The value flips to `false` whenever
    /// the session is torn down, including after a failed refresh.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.subscribe()
    }

    fn publish(&self) {
        let authenticated = self.is_authenticated();
        self.status.send_if_modified(|current| {
            if *current == authenticated {
                false
            } else {
                *current = authenticated;
                true
            }
        });
    }

    fn persist(&self) {
        let record = self.read().to_record();
        let result = serde_json::to_string(&record)
            .map_err(anyhow::Error::from)
            .and_then(|contents| self.storage.write(AUTH_STORAGE_KEY, &contents));
        if let Err(e) = result {
            warn!(error = %e, "Failed to save session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::auth::storage::MemoryStorage;
    use crate::testing::{record_json, respond, token_body, user_json, BrokenStorage, MockTransport};

    fn store_with(transport: MockTransport) -> (SessionStore, Arc<MockTransport>, Arc<MemoryStorage>) {
        let transport = Arc::new(transport);
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(transport.clone(), storage.clone());
        (store, transport, storage)
    }

    fn auth_server() -> MockTransport {
        MockTransport::new(|request| match request.path.as_str() {
            "/auth/login" => {
                let body = request.body.clone().unwrap_or_default();
                if body["password"] == "x" {
                    respond(200, token_body("T1", "R1"))
                } else {
                    respond(401, json!({"message": "Invalid email or password"}))
                }
            }
            "/auth/refresh" => respond(200, json!({"accessToken": "T2", "refreshToken": "R2"})),
            "/auth/logout" => respond(204, json!(null)),
            other => panic!("unexpected request to {}", other),
        })
    }

    fn persisted(storage: &MemoryStorage) -> serde_json::Value {
        let contents = storage.read(AUTH_STORAGE_KEY).unwrap().expect("record written");
        serde_json::from_str(&contents).unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let (store, transport, storage) = store_with(auth_server());

        store.login("a@b.com", "x", "studio1").await.unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("T1"));
        assert_eq!(store.refresh_token().as_deref(), Some("R1"));
        assert_eq!(store.user().map(|u| u.id), Some("u1".to_string()));
        assert!(!store.is_loading());
        assert_eq!(store.error(), None);
        assert_eq!(store.headers().bearer().as_deref(), Some("T1"));

        let sent = transport.sent();
        assert_eq!(
            sent[0].body,
            Some(json!({"email": "a@b.com", "password": "x", "subdomain": "studio1"}))
        );
        assert_eq!(sent[0].bearer, None);

        let record = persisted(&storage);
        assert_eq!(record["state"]["accessToken"], "T1");
        assert_eq!(record["state"]["isAuthenticated"], true);
    }

    #[tokio::test]
    async fn test_login_failure_clears_and_reports_server_message() {
        let (store, _transport, storage) = store_with(auth_server());
        store.set_tokens("OLD", "OLDR");

        let err = store.login("a@b.com", "wrong", "studio1").await.unwrap_err();

        assert!(matches!(err, ApiError::Authentication { .. }));
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.error().as_deref(), Some("Invalid email or password"));
        assert!(!store.is_loading());
        assert_eq!(store.headers().bearer(), None);
        assert_eq!(persisted(&storage)["state"]["accessToken"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_login_failure_without_message_uses_fallback() {
        let (store, _, _) = store_with(MockTransport::new(|_| {
            Err(ApiError::NetworkError("connection refused".to_string()))
        }));

        let err = store.login("a@b.com", "x", "studio1").await.unwrap_err();
        assert_eq!(err.to_string(), LOGIN_FAILED_MESSAGE);
        assert_eq!(store.error().as_deref(), Some(LOGIN_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_login_response_without_user_is_a_failure() {
        let (store, _, _) = store_with(MockTransport::new(|_| {
            respond(200, json!({"accessToken": "T1", "refreshToken": "R1"}))
        }));

        assert!(store.login("a@b.com", "x", "studio1").await.is_err());
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);
    }

    #[tokio::test]
    async fn test_refresh_replaces_tokens_and_keeps_user() {
        let (store, transport, storage) = store_with(auth_server());
        store.login("a@b.com", "x", "studio1").await.unwrap();

        store.refresh_session().await.unwrap();

        assert_eq!(store.access_token().as_deref(), Some("T2"));
        assert_eq!(store.refresh_token().as_deref(), Some("R2"));
        assert_eq!(store.user().map(|u| u.id), Some("u1".to_string()));
        assert!(store.is_authenticated());
        assert_eq!(store.headers().bearer().as_deref(), Some("T2"));
        assert_eq!(persisted(&storage)["state"]["refreshToken"], "R2");

        let refresh = transport
            .sent()
            .into_iter()
            .find(|r| r.path == "/auth/refresh")
            .unwrap();
        assert_eq!(refresh.body, Some(json!({"refreshToken": "R1"})));
    }

    #[tokio::test]
    async fn test_refresh_without_rotation_keeps_refresh_token() {
        let (store, _, _) = store_with(MockTransport::new(|_| {
            respond(200, json!({"accessToken": "T9"}))
        }));
        store.set_user(serde_json::from_value(user_json()).unwrap());
        store.set_tokens("T1", "R1");

        store.refresh_session().await.unwrap();
        assert_eq!(store.access_token().as_deref(), Some("T9"));
        assert_eq!(store.refresh_token().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_fast() {
        let (store, transport, _) = store_with(auth_server());

        let err = store.refresh_session().await.unwrap_err();
        assert!(matches!(err, ApiError::NoRefreshToken));
        assert_eq!(transport.calls("/auth/refresh"), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out() {
        let (store, _, storage) = store_with(MockTransport::new(|request| {
            match request.path.as_str() {
                "/auth/login" => respond(200, token_body("T1", "R1")),
                _ => respond(401, json!({"message": "Refresh token expired"})),
            }
        }));
        store.login("a@b.com", "x", "studio1").await.unwrap();
        let mut status = store.subscribe();
        assert!(*status.borrow_and_update());

        let err = store.refresh_session().await.unwrap_err();

        assert!(matches!(err, ApiError::SessionExpired(_)));
        assert!(!store.is_authenticated());
        assert_eq!(store.user(), None);
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.headers().bearer(), None);
        assert!(status.has_changed().unwrap());
        assert!(!*status.borrow());
        // The whole record goes, not just its tokens
        assert_eq!(storage.read(AUTH_STORAGE_KEY).unwrap(), None);
    }

    /// Login answers with a session per password; refresh is held for 50ms
    /// so a second login can land while it is out.
    fn slow_refresh_server(refresh_status: u16) -> MockTransport {
        MockTransport::new(move |request| match request.path.as_str() {
            "/auth/login" => {
                let body = request.body.clone().unwrap_or_default();
                if body["password"] == "x" {
                    respond(200, token_body("T1", "R1"))
                } else {
                    respond(200, token_body("T9", "R9"))
                }
            }
            "/auth/refresh" if refresh_status == 200 => {
                respond(200, json!({"accessToken": "T2", "refreshToken": "R2"}))
            }
            "/auth/refresh" => respond(refresh_status, json!({"message": "Refresh token expired"})),
            other => panic!("unexpected request to {}", other),
        })
        .with_delay("/auth/refresh", Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_newer_login() {
        let (store, _, storage) = store_with(slow_refresh_server(401));
        store.login("a@b.com", "x", "studio1").await.unwrap();

        let (refreshed, relogged) = tokio::join!(
            store.refresh_session(),
            store.login("a@b.com", "y", "studio1")
        );

        assert!(matches!(refreshed, Err(ApiError::SessionExpired(_))));
        relogged.unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("T9"));
        assert_eq!(store.refresh_token().as_deref(), Some("R9"));
        assert_eq!(store.headers().bearer().as_deref(), Some("T9"));
        assert_eq!(persisted(&storage)["state"]["accessToken"], "T9");
    }

    #[tokio::test]
    async fn test_successful_refresh_is_discarded_after_newer_login() {
        let (store, _, storage) = store_with(slow_refresh_server(200));
        store.login("a@b.com", "x", "studio1").await.unwrap();

        let (refreshed, relogged) = tokio::join!(
            store.refresh_session(),
            store.login("a@b.com", "y", "studio1")
        );

        refreshed.unwrap();
        relogged.unwrap();
        assert_eq!(store.access_token().as_deref(), Some("T9"));
        assert_eq!(store.refresh_token().as_deref(), Some("R9"));
        assert_eq!(store.headers().bearer().as_deref(), Some("T9"));
        assert_eq!(persisted(&storage)["state"]["refreshToken"], "R9");
    }

    #[tokio::test]
    async fn test_refresh_result_does_not_revive_logged_out_session() {
        let (store, _, _) = store_with(slow_refresh_server(200));
        store.login("a@b.com", "x", "studio1").await.unwrap();

        let (refreshed, ()) = tokio::join!(store.refresh_session(), async { store.logout() });

        refreshed.unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);
        assert_eq!(store.headers().bearer(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (store, _, storage) = store_with(auth_server());
        store.login("a@b.com", "x", "studio1").await.unwrap();

        store.logout();

        assert_eq!(store.snapshot(), Session::default());
        assert_eq!(store.headers().bearer(), None);
        assert_eq!(persisted(&storage)["state"]["user"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_logout_survives_storage_failure() {
        let transport = Arc::new(auth_server());
        let store = SessionStore::new(transport, Arc::new(BrokenStorage));
        store.login("a@b.com", "x", "studio1").await.unwrap();

        store.logout();
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);
    }

    #[tokio::test]
    async fn test_end_session_clears_even_if_server_fails() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_handler = Arc::clone(&seen);
        let (store, _, _) = store_with(MockTransport::new(move |request| {
            match request.path.as_str() {
                "/auth/login" => respond(200, token_body("T1", "R1")),
                _ => {
                    *seen_in_handler.lock().unwrap() = request.bearer.clone();
                    Err(ApiError::NetworkError("connection reset".to_string()))
                }
            }
        }));
        store.login("a@b.com", "x", "studio1").await.unwrap();

        store.end_session().await;

        assert!(!store.is_authenticated());
        assert_eq!(store.refresh_token(), None);
        // The server is told which token is being retired
        assert_eq!(seen.lock().unwrap().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_restore_then_check_auth_without_network() {
        let transport = Arc::new(auth_server());
        let storage = Arc::new(MemoryStorage::with_record(
            AUTH_STORAGE_KEY,
            &record_json("T1", "R1"),
        ));
        let store = SessionStore::new(transport.clone(), storage);

        assert!(store.restore().unwrap());
        assert_eq!(store.headers().bearer(), None);
        assert!(store.check_auth());

        assert!(store.is_authenticated());
        assert_eq!(store.headers().bearer().as_deref(), Some("T1"));
        assert!(transport.sent().is_empty());

        // Idempotent
        assert!(store.check_auth());
        assert_eq!(store.headers().bearer().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_init_ignores_malformed_record() {
        let storage = Arc::new(MemoryStorage::with_record(AUTH_STORAGE_KEY, "{not json"));
        let store = SessionStore::init(Arc::new(auth_server()), storage);

        assert!(!store.is_authenticated());
        assert_eq!(store.headers().bearer(), None);
    }

    #[tokio::test]
    async fn test_check_auth_removes_header_when_user_missing() {
        let (store, _, _) = store_with(auth_server());
        store.set_tokens("T1", "R1");
        assert_eq!(store.headers().bearer().as_deref(), Some("T1"));

        assert!(!store.check_auth());
        assert_eq!(store.headers().bearer(), None);
    }

    #[tokio::test]
    async fn test_authenticated_only_between_login_and_logout() {
        let (store, _, _) = store_with(auth_server());
        assert!(!store.is_authenticated());

        store.login("a@b.com", "x", "studio1").await.unwrap();
        assert!(store.is_authenticated());

        store.refresh_session().await.unwrap();
        assert!(store.is_authenticated());

        store.logout();
        assert!(!store.is_authenticated());

        assert!(store.refresh_session().await.is_err());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_password_recovery_errors_are_authentication_errors() {
        let (store, transport, _) = store_with(MockTransport::new(|request| {
            match request.path.as_str() {
                "/auth/forgot-password" => respond(200, json!(null)),
                _ => respond(400, json!({"message": "Reset token expired"})),
            }
        }));

        store.forgot_password("a@b.com", "studio1").await.unwrap();
        assert_eq!(
            transport.sent()[0].body,
            Some(json!({"email": "a@b.com", "subdomain": "studio1"}))
        );

        let err = store.reset_password("tok", "new-pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication { .. }));
        assert_eq!(err.to_string(), "Reset token expired");
    }
}

//! The authenticated request gateway.
//!
//! Every business call goes through `Gateway`, which wraps a base
//! `Transport` and:
//! - attaches the bearer token currently installed by the session store
//! - on a 401, refreshes the session and replays the call exactly once
//! - surfaces every other failure to the `Notifier`, then returns it
//!
//! Concurrent 401s share one refresh: the first installs a shared future,
//! the rest await it.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::SessionStore;
use crate::notify::{Notice, Notifier};

/// Resolves to the access token to replay with.
type PendingRefresh = Shared<BoxFuture<'static, Result<String, ApiError>>>;

pub struct Gateway {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    refresh: Mutex<Option<PendingRefresh>>,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            store,
            notifier,
            refresh: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Send a request and return the raw 2xx response.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let result = self.execute(request).await;
        self.surface(result)
    }

    /// Send a request and decode its JSON body.
    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let result = self.execute(request).await.and_then(|response| response.json());
        self.surface(result)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = match ApiRequest::post(path).with_json(body) {
            Ok(request) => request,
            Err(e) => return self.surface(Err(e)),
        };
        self.request_json(request).await
    }

    fn surface<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ref e) = result {
            if let Some(notice) = Notice::for_error(e) {
                self.notifier.notify(notice);
            }
        }
        result
    }

    async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        request.bearer = self.store.headers().bearer();
        let response = self.transport.send(&request).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return response.error_for_status();
        }

        debug!(path = %request.path, "Unauthorized, refreshing session");
        let token = self.refresh_once(request.bearer.as_deref()).await?;
        request.bearer = Some(token);

        // The replay is final; a second 401 is reported like any other error.
        self.transport.send(&request).await?.error_for_status()
    }

    /// Join the in-flight refresh, or start one.
    ///
    /// `sent` is the token the failed call carried. If the session has
    /// already moved past it, the current token is returned without another
    /// refresh so a rotated refresh token is not spent twice.
    async fn refresh_once(&self, sent: Option<&str>) -> Result<String, ApiError> {
        let pending = {
            let mut slot = self.refresh.lock().await;
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    if let Some(current) = self.store.headers().bearer() {
                        if sent != Some(current.as_str()) {
                            debug!("Session already refreshed, replaying with current token");
                            return Ok(current);
                        }
                    }
                    let pending = Self::start_refresh(Arc::clone(&self.store));
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = pending.await;

        let mut slot = self.refresh.lock().await;
        if slot.as_ref().is_some_and(|p| p.peek().is_some()) {
            *slot = None;
        }
        result
    }

    fn start_refresh(store: Arc<SessionStore>) -> PendingRefresh {
        async move {
            match store.refresh_session().await {
                Ok(()) => store.headers().bearer().ok_or_else(|| {
                    ApiError::SessionExpired(Box::new(ApiError::Unauthorized { message: None }))
                }),
                Err(e) => {
                    if matches!(e, ApiError::NoRefreshToken) {
                        warn!("Unauthorized with no refresh token, logging out");
                        store.logout();
                    }
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

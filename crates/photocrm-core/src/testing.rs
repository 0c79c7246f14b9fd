//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::storage::SessionStorage;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Transport answering from a closure, recording every request it sees.
pub(crate) struct MockTransport {
    handler: Handler,
    delays: HashMap<String, Duration>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delays: HashMap::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Hold responses for `path` for a while so calls can overlap.
    pub(crate) fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub(crate) fn calls(&self, path: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|r| r.path == path).count()
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.sent.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(&request.path) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(request)
    }
}

/// Storage whose writes always fail.
pub(crate) struct BrokenStorage;

impl SessionStorage for BrokenStorage {
    fn read(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn write(&self, _name: &str, _contents: &str) -> Result<()> {
        Err(anyhow::anyhow!("disk full"))
    }

    fn remove(&self, _name: &str) -> Result<()> {
        Err(anyhow::anyhow!("disk full"))
    }
}

pub(crate) fn respond(status: u16, body: Value) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse::new(
        StatusCode::from_u16(status).unwrap(),
        body.to_string(),
    ))
}

pub(crate) fn user_json() -> Value {
    json!({
        "id": "u1",
        "email": "a@b.com",
        "firstName": "Ada",
        "lastName": "Byron",
        "fullName": "Ada Byron",
        "role": "PHOTOGRAPHER",
        "permissions": ["orders:read"],
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

pub(crate) fn token_body(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "tokenType": "Bearer",
        "expiresIn": 3600,
        "user": user_json()
    })
}

/// A persisted record for an authenticated session.
pub(crate) fn record_json(access: &str, refresh: &str) -> String {
    json!({
        "state": {
            "user": user_json(),
            "accessToken": access,
            "refreshToken": refresh,
            "isAuthenticated": true
        },
        "version": 0
    })
    .to_string()
}

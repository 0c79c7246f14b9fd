//! Client for the unauthenticated `/auth/*` endpoints.
//!
//! These calls go straight to the base transport. They must never pass
//! through the gateway: a 401 from `/auth/refresh` would otherwise try to
//! refresh again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, ApiRequest, Transport};
use crate::models::User;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub subdomain: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
    subdomain: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest<'a> {
    token: &'a str,
    new_password: &'a str,
}

/// Body returned by both `/auth/login` and `/auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn Transport>,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn login(&self, email: &str, password: &str, subdomain: &str) -> Result<TokenResponse, ApiError> {
        debug!(email = email, subdomain = subdomain, "Logging in");
        let request = ApiRequest::post("/auth/login").with_json(&LoginRequest {
            email,
            password,
            subdomain,
        })?;
        self.transport.send(&request).await?.error_for_status()?.json()
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        let request = ApiRequest::post("/auth/refresh").with_json(&RefreshRequest { refresh_token })?;
        self.transport.send(&request).await?.error_for_status()?.json()
    }

    /// Tell the server the session is over. `bearer` is the token being retired.
    pub async fn logout(&self, bearer: Option<String>) -> Result<(), ApiError> {
        let request = ApiRequest::post("/auth/logout").with_bearer(bearer);
        self.transport.send(&request).await?.error_for_status()?;
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str, subdomain: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post("/auth/forgot-password")
            .with_json(&ForgotPasswordRequest { email, subdomain })?;
        self.transport.send(&request).await?.error_for_status()?;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post("/auth/reset-password")
            .with_json(&ResetPasswordRequest { token, new_password })?;
        self.transport.send(&request).await?.error_for_status()?;
        Ok(())
    }
}

//! The accounts endpoints of the Easee cloud.
//!
//! This is the only network-facing part of the token engine. Failure
//! classification happens here: HTTP 401 on a refresh means the token pair
//! is dead and the engine should fall back to a fresh login, while transport
//! failures stay retryable.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::{EaseeError, Result};

/// Token pair plus declared lifetime, as returned by both the login and the
/// refresh endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds of validity declared by the server. 0 means unknown.
    #[serde(default)]
    pub expires_in: i64,
}

/// Seam between the token engine and the network, so tests can swap in a
/// scripted implementation.
pub trait AuthApi: Send + Sync {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<TokenResponse>> + Send;

    fn refresh(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> impl std::future::Future<Output = Result<TokenResponse>> + Send;
}

/// Production implementation against `POST /accounts/login` and
/// `POST /accounts/refresh_token`.
pub struct AccountsApi {
    base_url: String,
    client: reqwest::Client,
}

impl AccountsApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post_for_tokens(
        &self,
        path: &str,
        body: serde_json::Value,
        refresh_call: bool,
    ) -> Result<TokenResponse> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED && refresh_call {
            return Err(EaseeError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if refresh_call && body.contains("InvalidToken") {
                return Err(EaseeError::AuthExpired);
            }
            return Err(EaseeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

impl AuthApi for AccountsApi {
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        log::info!("Easee: logging in as {}", username);
        self.post_for_tokens(
            "/accounts/login",
            json!({ "userName": username, "password": password }),
            false,
        )
        .await
    }

    async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<TokenResponse> {
        log::info!("Easee: refreshing access token");
        self.post_for_tokens(
            "/accounts/refresh_token",
            json!({ "accessToken": access_token, "refreshToken": refresh_token }),
            true,
        )
        .await
    }
}

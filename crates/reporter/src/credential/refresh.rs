// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth token endpoint calls: refresh and authorization code exchange.
//!
//! The refresher never retries on its own. A failed refresh is terminal for
//! the request that triggered it; see [`crate::planmill::executor`].

use std::fmt;

use crate::credential::oauth::TokenResponse;
use crate::credential::Credential;

/// Why a refresh attempt did not produce a new credential.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The token endpoint answered with a non-success status.
    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    /// No response from the token endpoint.
    #[error("refresh transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Success status but the body is not a usable token reply.
    #[error("malformed refresh response: {0}")]
    Malformed(String),
}

/// Exchanges refresh tokens (and authorization codes) at the provider's
/// token endpoint.
#[derive(Clone)]
pub struct TokenRefresher {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenRefresher {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Perform a single `refresh_token` grant.
    ///
    /// The returned credential keeps `old.refresh_token` unless the provider
    /// rotated it.
    pub async fn refresh(&self, old: &Credential) -> Result<Credential, RefreshError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", old.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected { status: status.as_u16(), body });
        }

        let bytes = resp.bytes().await?;
        let token: TokenResponse =
            serde_json::from_slice(&bytes).map_err(|e| RefreshError::Malformed(e.to_string()))?;
        token
            .merge_into(old)
            .ok_or_else(|| RefreshError::Malformed("missing access_token".to_owned()))
    }

    /// Exchange an authorization code for a token pair (`authorization_code` grant).
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> anyhow::Result<Credential> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("token exchange failed ({status}): {text}");
        }

        let token: TokenResponse = resp.json().await?;
        token
            .into_credential()
            .ok_or_else(|| anyhow::anyhow!("token exchange returned an incomplete token pair"))
    }
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;

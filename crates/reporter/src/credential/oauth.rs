// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth token endpoint wire types.

use serde::{Deserialize, Serialize};

use crate::credential::Credential;

/// Standard OAuth2 token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Rotated refresh token, if the provider issued a non-empty one.
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|rt| !rt.trim().is_empty())
    }

    /// Combine this refresh reply with the credential it replaces.
    ///
    /// The provider may omit `refresh_token`; the previous one is carried over.
    /// Returns `None` when the reply has no access token.
    pub fn merge_into(&self, previous: &Credential) -> Option<Credential> {
        if self.access_token.trim().is_empty() {
            return None;
        }
        let refresh_token =
            self.rotated_refresh_token().unwrap_or(previous.refresh_token.as_str()).to_owned();
        Some(Credential { access_token: self.access_token.clone(), refresh_token })
    }

    /// Convert an authorization code reply into a fresh credential.
    ///
    /// Both tokens are required since there is nothing to carry over.
    pub fn into_credential(self) -> Option<Credential> {
        let refresh_token = self.rotated_refresh_token()?.to_owned();
        let cred = Credential { access_token: self.access_token, refresh_token };
        cred.is_valid().then_some(cred)
    }
}

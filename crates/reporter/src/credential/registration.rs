// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration tokens: the OAuth `state` value for the authorization code flow.
//!
//! A registration token is an HS256-signed JWT carrying the chat user's id,
//! wrapped in URL-safe base64 so it can travel in query strings. Verifying it
//! on the OAuth callback both rejects forged callbacks and tells us which
//! chat user the new credential belongs to.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default registration link lifetime.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Claims carried by a registration token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration token expired")]
    Expired,
    #[error("invalid registration token")]
    Invalid,
    #[error("registration token encoding failed: {0}")]
    Encode(String),
}

/// Issues and verifies registration tokens with a shared secret.
#[derive(Clone)]
pub struct RegistrationTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl RegistrationTokens {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: DEFAULT_LIFETIME,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Issue a token for `external_id`, valid from now.
    pub fn issue(&self, external_id: &str) -> Result<String, RegistrationError> {
        self.issue_at(external_id, epoch_secs())
    }

    /// Issue a token as if the current time were `now` (epoch seconds).
    pub fn issue_at(&self, external_id: &str, now: u64) -> Result<String, RegistrationError> {
        let claims = RegistrationClaims {
            user_id: external_id.to_owned(),
            iat: now,
            exp: now + self.lifetime.as_secs(),
        };
        let jwt = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RegistrationError::Encode(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(jwt))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<RegistrationClaims, RegistrationError> {
        let raw = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| RegistrationError::Invalid)?;
        let jwt = String::from_utf8(raw).map_err(|_| RegistrationError::Invalid)?;

        let validation = Validation::new(Algorithm::HS256);
        decode::<RegistrationClaims>(&jwt, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => RegistrationError::Expired,
                _ => RegistrationError::Invalid,
            })
    }
}

impl fmt::Debug for RegistrationTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationTokens")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;

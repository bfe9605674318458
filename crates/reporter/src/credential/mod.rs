// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider credentials and the user bindings that own them.
//!
//! A [`UserBinding`] links a chat user to a Planmill account and carries the
//! OAuth token pair used to act on that user's behalf. Bindings are created
//! once when registration completes and afterwards only have their
//! credential replaced as a unit by a successful token refresh.

pub mod oauth;
pub mod persist;
pub mod refresh;
pub mod registration;
pub mod store;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// OAuth access/refresh token pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    /// Check that both tokens are present.
    ///
    /// Returns the name of the first missing field so callers can report it.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.access_token.trim().is_empty() {
            return Err("access_token is empty");
        }
        if self.refresh_token.trim().is_empty() {
            return Err("refresh_token is empty");
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// Tokens are bearer secrets; keep them out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// A chat user linked to a Planmill account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBinding {
    /// Stable user id from the chat platform.
    pub external_id: String,
    /// Planmill user id of the token owner.
    pub provider_user_id: i64,
    pub credential: Credential,
}

impl UserBinding {
    pub fn new(
        external_id: impl Into<String>,
        provider_user_id: i64,
        credential: Credential,
    ) -> Self {
        Self { external_id: external_id.into(), provider_user_id, credential }
    }
}

/// Resolve the state directory for persisted data.
///
/// Checks `HOURS_STATE_DIR`, then `$XDG_STATE_HOME/hours-reporter`,
/// then `$HOME/.local/state/hours-reporter`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOURS_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("hours-reporter");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/hours-reporter");
    }
    PathBuf::from(".hours-reporter")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

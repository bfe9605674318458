// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::config::Config;
use crate::credential::registration::{RegistrationError, RegistrationTokens};
use crate::credential::store::CredentialStore;
use crate::planmill::client::Planmill;

/// Path Planmill redirects back to after authorization.
pub const OAUTH_CALLBACK_PATH: &str = "/planmill-oauth-callback";

/// Shared service state.
pub struct AppState {
    pub config: Config,
    pub planmill: Planmill,
    pub store: Arc<dyn CredentialStore>,
    pub registration: RegistrationTokens,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let planmill = Planmill::new(
            config.planmill_config(),
            Arc::clone(&store),
            config.retry_policy(),
            config.request_timeout(),
        )?;
        let registration = RegistrationTokens::new(&config.jwt_secret);
        Ok(Self { config, planmill, store, registration })
    }

    /// Redirect URI registered with Planmill for this deployment.
    pub fn redirect_uri(&self) -> String {
        format!("{}{OAUTH_CALLBACK_PATH}", self.config.domain())
    }

    /// Fresh link that starts registration for `external_id`.
    pub fn registration_url(&self, external_id: &str) -> Result<String, RegistrationError> {
        let token = self.registration.issue(external_id)?;
        Ok(format!("{}/register?token={token}", self.config.domain()))
    }
}

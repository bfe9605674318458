// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planmill API client.
//!
//! Planmill authorizes through OAuth 2.0 with the authorization code grant.

use std::sync::Arc;
use std::time::Duration;

use crate::credential::refresh::TokenRefresher;
use crate::credential::store::CredentialStore;
use crate::credential::{Credential, UserBinding};
use crate::planmill::executor::{Execution, ExecutionError, Executor, RequestSpec, RetryPolicy};
use crate::planmill::{PlanmillConfig, PlanmillUser, ReportableTask};

pub struct Planmill {
    config: PlanmillConfig,
    refresher: TokenRefresher,
    executor: Executor,
}

impl Planmill {
    /// Build a client whose sends and token calls time out after `timeout`.
    pub fn new(
        config: PlanmillConfig,
        store: Arc<dyn CredentialStore>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let refresher = TokenRefresher::new(
            http.clone(),
            config.token_url(),
            config.oauth_client_id.clone(),
            config.oauth_client_secret.clone(),
        );
        let executor = Executor::new(http, config.api_url(), refresher.clone(), store, policy);
        Ok(Self { config, refresher, executor })
    }

    pub fn config(&self) -> &PlanmillConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// URL that starts the authorization code flow in the user's browser.
    pub fn build_authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
    ) -> anyhow::Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.config.authorize_url(),
            &[
                ("response_type", "code"),
                ("client_id", self.config.oauth_client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange an authorization code for a token pair.
    pub async fn fetch_access_token(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> anyhow::Result<Credential> {
        self.refresher.exchange_code(code, redirect_uri).await
    }

    /// Owner of `credential`. Used before a binding exists, so a refreshed
    /// credential comes back in the result instead of being persisted.
    pub async fn get_token_owner(
        &self,
        credential: Credential,
    ) -> Result<Execution<PlanmillUser>, ExecutionError> {
        self.executor.execute_unbound(&RequestSpec::get("me"), credential).await?.decode()
    }

    /// Tasks the bound user may report hours against.
    pub async fn get_reportable_tasks(
        &self,
        binding: &UserBinding,
    ) -> Result<Execution<Vec<ReportableTask>>, ExecutionError> {
        let spec = RequestSpec::get(format!(
            "users/{}/reportableassignments",
            binding.provider_user_id
        ));
        self.executor.execute(&spec, binding).await?.decode()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

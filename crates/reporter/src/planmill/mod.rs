// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planmill API access on behalf of registered users.
//!
//! [`executor`] owns authenticated sends, token refresh, and retries.
//! [`client`] layers Planmill paths and payload shapes on top of it.

pub mod client;
pub mod executor;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Planmill REST API version used for resource paths.
pub const API_VERSION: &str = "1.5";

/// Provider settings, passed in explicitly at construction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanmillConfig {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    #[serde(rename = "oAuthClientId")]
    pub oauth_client_id: String,
    #[serde(rename = "oAuthClientSecret")]
    pub oauth_client_secret: String,
    /// Overrides the instance-derived API root (`https://online.planmill.com/<instance>/api/`).
    #[serde(default, rename = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl PlanmillConfig {
    pub fn new(
        instance_name: impl Into<String>,
        oauth_client_id: impl Into<String>,
        oauth_client_secret: impl Into<String>,
    ) -> Self {
        Self {
            instance_name: instance_name.into(),
            oauth_client_id: oauth_client_id.into(),
            oauth_client_secret: oauth_client_secret.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// API root, always ending in `/`.
    pub fn base_url(&self) -> String {
        let mut base = match self.base_url {
            Some(ref url) => url.clone(),
            None => format!("https://online.planmill.com/{}/api/", self.instance_name),
        };
        if !base.ends_with('/') {
            base.push('/');
        }
        base
    }

    pub fn token_url(&self) -> String {
        format!("{}oauth2/token", self.base_url())
    }

    pub fn authorize_url(&self) -> String {
        format!("{}oauth2/authorize", self.base_url())
    }

    /// Root for versioned resource paths, ending in `/`.
    pub fn api_url(&self) -> String {
        format!("{}{API_VERSION}/", self.base_url())
    }
}

impl fmt::Debug for PlanmillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanmillConfig")
            .field("instance_name", &self.instance_name)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Owner of an access token (`GET /me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanmillUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// A task the user may report hours against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportableTask {
    pub task: i64,
    pub task_name: String,
    pub project: i64,
    pub project_name: String,
    #[serde(default)]
    pub last_timereport_created: Option<String>,
}

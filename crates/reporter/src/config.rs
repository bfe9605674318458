// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::credential::state_dir;
use crate::planmill::executor::RetryPolicy;
use crate::planmill::PlanmillConfig;

/// Hour reporting service backed by Planmill.
#[derive(Debug, Clone, Parser)]
#[command(name = "hours-reporter", version, about)]
pub struct Config {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "HOURS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "HOURS_PORT")]
    pub port: u16,

    /// Bearer token for `/api/` routes. If unset, auth is disabled.
    #[arg(long, env = "HOURS_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Public origin of this service, used for registration links and the
    /// OAuth redirect URI.
    #[arg(long, env = "DOMAIN_NAME")]
    pub domain_name: String,

    /// Secret for signing registration tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Planmill instance name.
    #[arg(long, env = "PLANMILL_INSTANCE_NAME")]
    pub instance_name: String,

    /// Planmill OAuth client id.
    #[arg(long, env = "PLANMILL_OAUTH_CLIENT_ID")]
    pub client_id: String,

    /// Planmill OAuth client secret.
    #[arg(long, env = "PLANMILL_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Override the Planmill API root (default derives from the instance name).
    #[arg(long, env = "PLANMILL_BASE_URL")]
    pub base_url: Option<String>,

    /// Credential store file [default: <state dir>/credentials.json].
    #[arg(long, env = "HOURS_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Timeout for a single provider request in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "HOURS_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Sends allowed after the first one per logical call.
    #[arg(long, default_value_t = 3, env = "HOURS_MAX_RETRIES")]
    pub max_retries: u32,

    /// Initial blind-retry backoff in milliseconds.
    #[arg(long, default_value_t = 250, env = "HOURS_RETRY_BACKOFF_MS")]
    pub retry_backoff_ms: u64,

    /// Log level filter.
    #[arg(long, default_value = "info", env = "HOURS_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text or json).
    #[arg(long, default_value = "text", env = "HOURS_LOG_FORMAT")]
    pub log_format: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("--domain-name", &self.domain_name),
            ("--jwt-secret", &self.jwt_secret),
            ("--instance-name", &self.instance_name),
            ("--client-id", &self.client_id),
            ("--client-secret", &self.client_secret),
        ];
        for (flag, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("{flag} must not be empty");
            }
        }
        // An empty token would match `Authorization: Bearer ` from anyone.
        if self.auth_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            anyhow::bail!("--auth-token must not be empty (omit it to disable auth)");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("--request-timeout-ms must be greater than 0");
        }

        let domain = reqwest::Url::parse(self.domain())
            .map_err(|e| anyhow::anyhow!("--domain-name is not a valid URL: {e}"))?;
        if !matches!(domain.scheme(), "http" | "https") {
            anyhow::bail!("--domain-name must be an http(s) URL");
        }

        if let Some(ref base) = self.base_url {
            reqwest::Url::parse(base)
                .map_err(|e| anyhow::anyhow!("--base-url is not a valid URL: {e}"))?;
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            anyhow::bail!("invalid log format: {}", self.log_format);
        }

        Ok(())
    }

    /// Public origin without a trailing slash.
    pub fn domain(&self) -> &str {
        self.domain_name.trim_end_matches('/')
    }

    pub fn planmill_config(&self) -> PlanmillConfig {
        let config =
            PlanmillConfig::new(&self.instance_name, &self.client_id, &self.client_secret);
        match self.base_url {
            Some(ref url) => config.with_base_url(url),
            None => config,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn store_path(&self) -> PathBuf {
        match self.store_path {
            Some(ref path) => path.clone(),
            None => state_dir().join("credentials.json"),
        }
    }

    /// Build a minimal `Config` for tests.
    #[doc(hidden)]
    pub fn test(domain: &str, base_url: &str) -> Self {
        Self::parse_from([
            "hours-reporter",
            "--domain-name",
            domain,
            "--jwt-secret",
            "test-secret",
            "--instance-name",
            "test",
            "--client-id",
            "client-id",
            "--client-secret",
            "client-secret",
            "--base-url",
            base_url,
            "--retry-backoff-ms",
            "0",
        ])
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

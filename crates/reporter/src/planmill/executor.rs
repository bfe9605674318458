// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request executor.
//!
//! One [`Executor::execute`] call is a sequential state machine over send
//! attempts sharing a single budget (1 initial send + `max_retries`):
//!
//! - `Sending`: attach `Authorization: Bearer <access_token>` and send.
//! - Transport failure (no HTTP response, including timeouts): `Retrying`
//!   with the same credential after a backoff.
//! - 401: `Refreshing`. Exchange the refresh token, persist the new pair,
//!   send again without delay. A failed refresh ends the call.
//! - Any other status ends the call: 2xx returns the parsed body, the rest
//!   surface as [`ExecutionError::Provider`].
//!
//! A failed `save` of a refreshed credential does not stop the call; it is
//! returned as a [`Warning`] alongside the result.
//!
//! Concurrent calls for the same user are not coordinated. Two simultaneous
//! 401s may both refresh, and the store keeps whichever `save` lands last.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::credential::refresh::{RefreshError, TokenRefresher};
use crate::credential::store::{CredentialStore, StoreError};
use crate::credential::{Credential, UserBinding};

/// Outbound request description.
///
/// Has no header API: authorization is injected by the executor per attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).json(body)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Attempt budget and blind-retry backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sends allowed after the first one, shared by blind retries and
    /// refresh-then-retry.
    pub max_retries: u32,
    /// Delay before the first blind retry; doubles per retry.
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the `retry`-th blind retry (1-based): `backoff` doubled
    /// per earlier retry, never above `max_backoff`.
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Why a single send did not produce a usable response.
#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },
}

/// Terminal outcome of a failed logical call.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The stored credential is unusable; nothing was sent.
    #[error("invalid credential: {0}")]
    InvalidCredential(&'static str),
    /// Non-success, non-401 response. Not retried.
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    /// The refresh triggered by a 401 failed. Not retried.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] RefreshError),
    /// The attempt budget ran out.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: AttemptFailure,
    },
    /// 2xx response whose body is not the expected JSON.
    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ExecutionError {
    /// The user has to authorize again before further calls can succeed.
    pub fn requires_reregistration(&self) -> bool {
        matches!(self, Self::InvalidCredential(_) | Self::RefreshFailed(_))
    }

    /// The failure is likely transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RetriesExhausted { last: AttemptFailure::Transport(_), .. })
    }
}

/// Non-fatal problem encountered during a successful call.
#[derive(Debug, thiserror::Error)]
pub enum Warning {
    #[error("refreshed credential for {external_id} was not persisted: {source}")]
    PersistenceFailed {
        external_id: String,
        #[source]
        source: StoreError,
    },
}

/// Result of a successful logical call.
#[derive(Debug)]
pub struct Execution<T> {
    pub value: T,
    /// Credential that authorized the successful send.
    pub credential: Credential,
    /// Sends performed, including the successful one.
    pub attempts: u32,
    /// Successful refreshes performed.
    pub refreshes: u32,
    pub warnings: Vec<Warning>,
}

impl Execution<serde_json::Value> {
    /// Deserialize the response body into a typed payload.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Execution<T>, ExecutionError> {
        let Execution { value, credential, attempts, refreshes, warnings } = self;
        let value = serde_json::from_value(value)?;
        Ok(Execution { value, credential, attempts, refreshes, warnings })
    }
}

/// One send: request, the credential snapshot it carries, and its number.
struct Attempt<'a> {
    spec: &'a RequestSpec,
    credential: &'a Credential,
    number: u32,
}

struct Reply {
    status: StatusCode,
    body: bytes::Bytes,
}

impl Reply {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

enum State {
    Sending,
    Retrying(AttemptFailure),
    Refreshing(AttemptFailure),
}

pub struct Executor {
    http: reqwest::Client,
    api_url: String,
    refresher: TokenRefresher,
    store: Arc<dyn CredentialStore>,
    policy: RetryPolicy,
}

impl Executor {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        refresher: TokenRefresher,
        store: Arc<dyn CredentialStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self { http, api_url: api_url.into(), refresher, store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `spec` as `binding`'s user, persisting every refreshed credential
    /// under `binding.external_id`.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        binding: &UserBinding,
    ) -> Result<Execution<serde_json::Value>, ExecutionError> {
        self.run(spec, binding.credential.clone(), Some(&binding.external_id)).await
    }

    /// Run `spec` with a credential that has no binding yet.
    ///
    /// Refreshed credentials are not persisted; the caller gets the latest
    /// one back in [`Execution::credential`].
    pub async fn execute_unbound(
        &self,
        spec: &RequestSpec,
        credential: Credential,
    ) -> Result<Execution<serde_json::Value>, ExecutionError> {
        self.run(spec, credential, None).await
    }

    async fn run(
        &self,
        spec: &RequestSpec,
        credential: Credential,
        owner: Option<&str>,
    ) -> Result<Execution<serde_json::Value>, ExecutionError> {
        credential.validate().map_err(ExecutionError::InvalidCredential)?;

        let max_attempts = self.policy.max_attempts();
        let mut credential = credential;
        let mut number: u32 = 1;
        let mut refreshes: u32 = 0;
        let mut warnings = Vec::new();
        let mut blind_retries: u32 = 0;
        let mut state = State::Sending;

        loop {
            state = match state {
                State::Sending => {
                    let attempt = Attempt { spec, credential: &credential, number };
                    match self.send(&attempt).await {
                        Ok(reply) if reply.status.is_success() => {
                            let value = parse_body(&reply.body)?;
                            tracing::debug!(
                                path = %spec.path,
                                attempts = number,
                                refreshes,
                                "provider request succeeded"
                            );
                            return Ok(Execution {
                                value,
                                credential,
                                attempts: number,
                                refreshes,
                                warnings,
                            });
                        }
                        Ok(reply) if reply.status == StatusCode::UNAUTHORIZED => {
                            State::Refreshing(AttemptFailure::Unauthorized { body: reply.text() })
                        }
                        Ok(reply) => {
                            return Err(ExecutionError::Provider {
                                status: reply.status.as_u16(),
                                body: reply.text(),
                            });
                        }
                        Err(e) => State::Retrying(AttemptFailure::Transport(e)),
                    }
                }
                State::Retrying(last) => {
                    if number >= max_attempts {
                        return Err(ExecutionError::RetriesExhausted { attempts: number, last });
                    }
                    tracing::info!(
                        path = %spec.path,
                        attempt = number,
                        err = %last,
                        "provider request failed, retrying"
                    );
                    blind_retries += 1;
                    let delay = self.policy.retry_delay(blind_retries);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    number += 1;
                    State::Sending
                }
                State::Refreshing(last) => {
                    if number >= max_attempts {
                        return Err(ExecutionError::RetriesExhausted { attempts: number, last });
                    }
                    credential = match self.refresher.refresh(&credential).await {
                        Ok(fresh) => fresh,
                        Err(e) => {
                            tracing::warn!(
                                path = %spec.path,
                                attempt = number,
                                err = %e,
                                "token refresh failed"
                            );
                            return Err(ExecutionError::RefreshFailed(e));
                        }
                    };
                    refreshes += 1;
                    tracing::info!(path = %spec.path, attempt = number, "access token refreshed");

                    if let Some(external_id) = owner {
                        if let Err(e) = self.store.save(external_id, &credential).await {
                            tracing::warn!(
                                user = %external_id,
                                err = %e,
                                "failed to persist refreshed credential"
                            );
                            warnings.push(Warning::PersistenceFailed {
                                external_id: external_id.to_owned(),
                                source: e,
                            });
                        }
                    }
                    number += 1;
                    State::Sending
                }
            };
        }
    }

    async fn send(&self, attempt: &Attempt<'_>) -> Result<Reply, reqwest::Error> {
        let spec = attempt.spec;
        let url = format!("{}{}", self.api_url, spec.path.trim_start_matches('/'));
        tracing::debug!(
            method = %spec.method,
            %url,
            attempt = attempt.number,
            "sending provider request"
        );

        let mut req = self
            .http
            .request(spec.method.clone(), url)
            .bearer_auth(&attempt.credential.access_token);
        if !spec.query.is_empty() {
            req = req.query(&spec.query);
        }
        if let Some(ref body) = spec.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        Ok(Reply { status, body })
    }
}

fn parse_body(body: &[u8]) -> Result<serde_json::Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(body)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

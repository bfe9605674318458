// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scripted fake Planmill server, a recording
//! credential store, and assertion helpers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Form, Json, Router};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::credential::store::{CredentialStore, MemoryStore, StoreError, StoreFuture};
use crate::credential::{Credential, UserBinding};
use crate::planmill::executor::RetryPolicy;
use crate::planmill::PlanmillConfig;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Retry policy without backoff delays.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy { backoff: Duration::ZERO, ..RetryPolicy::default() }
}

/// Assert that an expression is `Err` and its message contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// Scripted reply from the fake provider.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, serde_json::Value),
    Text(u16, String),
    /// Hold the request for this long before answering 200.
    Stall(Duration),
}

impl Reply {
    pub fn ok(body: serde_json::Value) -> Self {
        Self::Json(200, body)
    }

    pub fn unauthorized() -> Self {
        Self::Json(401, serde_json::json!({ "error": "invalid_token" }))
    }

    pub fn tokens(access: &str, refresh: Option<&str>) -> Self {
        let mut body = serde_json::json!({ "access_token": access, "token_type": "bearer" });
        if let Some(rt) = refresh {
            body["refresh_token"] = rt.into();
        }
        Self::Json(200, body)
    }
}

/// A request observed by the fake provider's resource routes.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct FakeState {
    resource_replies: Mutex<VecDeque<Reply>>,
    token_replies: Mutex<VecDeque<Reply>>,
    resource_requests: Mutex<Vec<SeenRequest>>,
    token_requests: Mutex<Vec<HashMap<String, String>>>,
}

/// In-process Planmill stand-in on `127.0.0.1:<random>`.
///
/// Serves `POST /api/oauth2/token` and everything under `/api/1.5/`.
/// Replies are popped from per-endpoint queues; an empty resource queue
/// answers `200 {}` and an empty token queue answers 500.
pub struct FakePlanmill {
    state: Arc<FakeState>,
    base_url: String,
    shutdown: CancellationToken,
}

impl FakePlanmill {
    pub async fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let state = Arc::new(FakeState::default());
        let router = Router::new()
            .route("/api/oauth2/token", post(token_handler))
            .route("/api/1.5/{*path}", any(resource_handler))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
        });

        Ok(Self { state, base_url: format!("http://{addr}/api/"), shutdown })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> PlanmillConfig {
        PlanmillConfig::new("test", "client-id", "client-secret").with_base_url(&self.base_url)
    }

    pub fn push_resource(&self, reply: Reply) -> &Self {
        self.state.resource_replies.lock().push_back(reply);
        self
    }

    pub fn push_token(&self, reply: Reply) -> &Self {
        self.state.token_replies.lock().push_back(reply);
        self
    }

    pub fn resource_requests(&self) -> Vec<SeenRequest> {
        self.state.resource_requests.lock().clone()
    }

    /// Bearer tokens presented on resource requests, in order.
    pub fn bearer_tokens(&self) -> Vec<String> {
        self.resource_requests()
            .into_iter()
            .filter_map(|r| r.authorization)
            .map(|h| h.trim_start_matches("Bearer ").to_owned())
            .collect()
    }

    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.token_requests.lock().clone()
    }
}

impl Drop for FakePlanmill {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn token_handler(
    State(s): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    s.token_requests.lock().push(form);
    let reply = s.token_replies.lock().pop_front();
    match reply {
        Some(reply) => respond(reply).await,
        None => (StatusCode::INTERNAL_SERVER_ERROR, "no scripted token reply").into_response(),
    }
}

async fn resource_handler(
    State(s): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let authorization =
        headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
    s.resource_requests.lock().push(SeenRequest {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        authorization,
    });
    let reply = s.resource_replies.lock().pop_front();
    respond(reply.unwrap_or_else(|| Reply::ok(serde_json::json!({})))).await
}

async fn respond(reply: Reply) -> Response {
    match reply {
        Reply::Json(status, body) => (status_code(status), Json(body)).into_response(),
        Reply::Text(status, body) => (status_code(status), body).into_response(),
        Reply::Stall(delay) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(serde_json::json!({}))).into_response()
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Credential store wrapper that records saves and can be told to fail them.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    saves: Mutex<Vec<(String, Credential)>>,
    save_attempts: AtomicU32,
    fail_saves: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_binding(binding: UserBinding) -> Result<Self, StoreError> {
        let store = Self::new();
        store.inner.register(binding).await?;
        Ok(store)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Credentials successfully saved, in order.
    pub fn saves(&self) -> Vec<(String, Credential)> {
        self.saves.lock().clone()
    }

    pub fn save_attempts(&self) -> u32 {
        self.save_attempts.load(Ordering::SeqCst)
    }
}

impl CredentialStore for RecordingStore {
    fn load<'a>(&'a self, external_id: &'a str) -> StoreFuture<'a, Option<UserBinding>> {
        self.inner.load(external_id)
    }

    fn save<'a>(
        &'a self,
        external_id: &'a str,
        credential: &'a Credential,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.save_attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("injected save failure")));
            }
            self.inner.save(external_id, credential).await?;
            self.saves.lock().push((external_id.to_owned(), credential.clone()));
            Ok(())
        })
    }

    fn register(&self, binding: UserBinding) -> StoreFuture<'_, ()> {
        self.inner.register(binding)
    }
}

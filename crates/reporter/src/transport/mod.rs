// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the reporter service.

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, OAUTH_CALLBACK_PATH};

/// Build the axum `Router` with all service routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/health", get(http::health))
        // Browser-facing registration flow (no auth)
        .route("/register", get(http::register))
        .route(OAUTH_CALLBACK_PATH, get(http::oauth_callback))
        // API
        .route("/api/v1/registrations", post(http::create_registration))
        .route("/api/v1/users/{external_id}/tasks", get(http::user_tasks))
        // Middleware
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

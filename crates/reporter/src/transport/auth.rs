// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer authentication for the `/api/` routes.
//!
//! The browser-facing registration routes carry their own signed token and
//! `/health` is open, so only paths under `/api/` are checked.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorCode;
use crate::state::AppState;

/// Compare without short-circuiting on the first differing byte. Only the
/// length leaks.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented.iter().zip(expected).fold(0u8, |acc, (p, e)| acc | (p ^ e)) == 0
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// case-insensitive; a missing or blank token yields `None`.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Check the request's bearer token against the configured one.
///
/// `None` disables auth. A blank configured token rejects every request, so a
/// misconfiguration that slips past `Config::validate` fails closed.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ErrorCode> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let expected = expected.trim();
    if expected.is_empty() {
        return Err(ErrorCode::Unauthorized);
    }
    match presented_token(headers) {
        Some(token) if tokens_match(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(ErrorCode::Unauthorized),
    }
}

pub async fn auth_layer(
    state: State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !req.uri().path().starts_with("/api/") {
        return next.run(req).await;
    }

    match validate_bearer(req.headers(), state.config.auth_token.as_deref()) {
        Ok(()) => next.run(req).await,
        Err(code) => {
            let mut resp =
                code.to_http_response("missing or invalid bearer token").into_response();
            resp.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            resp
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for registration and task lookup.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::credential::registration::RegistrationError;
use crate::credential::UserBinding;
use crate::error::{execution_message, ErrorCode};
use crate::planmill::ReportableTask;
use crate::state::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub external_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub registration_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set by Planmill when the user denies access.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<ReportableTask>,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned() })
}

/// `POST /api/v1/registrations`: issue a registration link for a chat user.
pub async fn create_registration(
    State(s): State<Arc<AppState>>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => return ErrorCode::BadRequest.to_http_response(e.body_text()).into_response(),
    };
    let external_id = req.external_id.trim();
    if external_id.is_empty() {
        return ErrorCode::BadRequest.to_http_response("external_id is empty").into_response();
    }
    match s.registration_url(external_id) {
        Ok(registration_url) => Json(RegistrationResponse { registration_url }).into_response(),
        Err(e) => {
            tracing::error!("issuing registration token: {e}");
            ErrorCode::Internal
                .to_http_response("could not issue registration link")
                .into_response()
        }
    }
}

/// `GET /register?token=`: send the browser to Planmill's consent page.
pub async fn register(State(s): State<Arc<AppState>>, Query(q): Query<RegisterQuery>) -> Response {
    let Some(token) = q.token.filter(|t| !t.is_empty()) else {
        return ErrorCode::BadRequest.to_http_response("missing token").into_response();
    };
    if let Err(e) = s.registration.verify(&token) {
        return registration_rejected(&e);
    }
    match s.planmill.build_authorization_url(&token, &s.redirect_uri()) {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            tracing::error!("building authorization url: {e:#}");
            ErrorCode::Internal.to_http_response("could not start authorization").into_response()
        }
    }
}

/// `GET /planmill-oauth-callback?code=&state=`: finish registration.
pub async fn oauth_callback(
    State(s): State<Arc<AppState>>,
    Query(q): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = q.error {
        tracing::info!("authorization denied: {error}");
        return ErrorCode::BadRequest.to_http_response("authorization was denied").into_response();
    }
    let (Some(code), Some(state)) = (q.code, q.state) else {
        return ErrorCode::BadRequest.to_http_response("missing code or state").into_response();
    };
    let claims = match s.registration.verify(&state) {
        Ok(claims) => claims,
        Err(e) => return registration_rejected(&e),
    };

    let credential = match s.planmill.fetch_access_token(&code, &s.redirect_uri()).await {
        Ok(credential) => credential,
        Err(e) => {
            tracing::warn!(external_id = %claims.user_id, "code exchange failed: {e:#}");
            return ErrorCode::UpstreamError
                .to_http_response("could not complete authorization with Planmill")
                .into_response();
        }
    };

    let owner = match s.planmill.get_token_owner(credential).await {
        Ok(owner) => owner,
        Err(e) => {
            tracing::warn!(external_id = %claims.user_id, "resolving token owner failed: {e}");
            return ErrorCode::from(&e).to_http_response(execution_message(&e)).into_response();
        }
    };

    let binding = UserBinding::new(claims.user_id, owner.value.id, owner.credential);
    if let Err(e) = s.store.register(binding.clone()).await {
        tracing::error!(external_id = %binding.external_id, "storing registration failed: {e}");
        return ErrorCode::from(&e).to_http_response("could not save registration").into_response();
    }

    tracing::info!(
        external_id = %binding.external_id,
        provider_user_id = binding.provider_user_id,
        "user registered"
    );
    "Registration complete. You can close this window.".into_response()
}

/// `GET /api/v1/users/{external_id}/tasks`: tasks the user may report against.
pub async fn user_tasks(
    State(s): State<Arc<AppState>>,
    Path(external_id): Path<String>,
) -> Response {
    let binding = match s.store.load(&external_id).await {
        Ok(Some(binding)) => binding,
        Ok(None) => return not_registered(&s, &external_id),
        Err(e) => {
            tracing::error!(%external_id, "loading binding failed: {e}");
            return ErrorCode::from(&e)
                .to_http_response("credential store unavailable")
                .into_response();
        }
    };

    match s.planmill.get_reportable_tasks(&binding).await {
        Ok(execution) => Json(TasksResponse { tasks: execution.value }).into_response(),
        Err(e) => {
            tracing::warn!(%external_id, "fetching reportable tasks failed: {e}");
            let code = ErrorCode::from(&e);
            if e.requires_reregistration() {
                return reregistration_required(&s, &external_id, code, execution_message(&e));
            }
            code.to_http_response(execution_message(&e)).into_response()
        }
    }
}

// -- Helpers ------------------------------------------------------------------

fn registration_rejected(err: &RegistrationError) -> Response {
    let message = match err {
        RegistrationError::Expired => "registration link expired",
        _ => "invalid registration link",
    };
    ErrorCode::Unauthorized.to_http_response(message).into_response()
}

fn not_registered(s: &AppState, external_id: &str) -> Response {
    reregistration_required(
        s,
        external_id,
        ErrorCode::NotRegistered,
        "no Planmill account is linked to this user",
    )
}

/// Error response whose message carries a fresh registration link.
fn reregistration_required(
    s: &AppState,
    external_id: &str,
    code: ErrorCode,
    message: &str,
) -> Response {
    let message = match s.registration_url(external_id) {
        Ok(url) => format!("{message}; register at {url}"),
        Err(e) => {
            tracing::error!("issuing registration token: {e}");
            message.to_owned()
        }
    };
    code.to_http_response(message).into_response()
}

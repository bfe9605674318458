// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::credential::store::StoreError;
use crate::planmill::executor::ExecutionError;

/// Error codes for the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthorized,
    BadRequest,
    NotRegistered,
    ReauthRequired,
    UpstreamError,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthorized | Self::ReauthRequired => 401,
            Self::BadRequest => 400,
            Self::NotRegistered => 404,
            Self::UpstreamError => 502,
            Self::Unavailable => 503,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotRegistered => "NOT_REGISTERED",
            Self::ReauthRequired => "REAUTH_REQUIRED",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(
        &self,
        message: impl Into<String>,
    ) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ExecutionError> for ErrorCode {
    fn from(err: &ExecutionError) -> Self {
        match err {
            ExecutionError::InvalidCredential(_) | ExecutionError::RefreshFailed(_) => {
                Self::ReauthRequired
            }
            ExecutionError::RetriesExhausted { .. } => Self::Unavailable,
            ExecutionError::Provider { .. } | ExecutionError::Decode(_) => Self::UpstreamError,
        }
    }
}

impl From<&StoreError> for ErrorCode {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotRegistered(_) => Self::NotRegistered,
            StoreError::Io(_) | StoreError::Serde(_) => Self::Internal,
        }
    }
}

/// User-facing message for a failed provider call. Provider bodies and token
/// material stay in the logs.
pub fn execution_message(err: &ExecutionError) -> &'static str {
    match err {
        ExecutionError::InvalidCredential(_) | ExecutionError::RefreshFailed(_) => {
            "Planmill authorization is no longer valid; please register again"
        }
        ExecutionError::RetriesExhausted { .. } => "Planmill is not responding; try again later",
        ExecutionError::Provider { .. } => "Planmill rejected the request",
        ExecutionError::Decode(_) => "Planmill returned an unexpected response",
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

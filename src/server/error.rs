// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Edaflow-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Edaflow and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::chart::{CanvasError, CountError};
use crate::store::StoreError;

/// Request failures, rendered as `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub enum ApiError {
    MissingFile,
    NoFileSelected,
    Upload(StoreError),
    Multipart { status: StatusCode, message: String },
    InvalidBody(String),
    Count(CountError),
    Render(CanvasError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::NoFileSelected | Self::InvalidBody(_) | Self::Count(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Upload(StoreError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upload(StoreError::SessionNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Upload(StoreError::EmptyPayload) => StatusCode::BAD_REQUEST,
            Self::Multipart { status, .. } => *status,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => f.write_str("no file was uploaded"),
            Self::NoFileSelected => f.write_str("no file was selected"),
            Self::Upload(err) => write!(f, "{err}"),
            Self::Multipart { message, .. } => write!(f, "invalid upload: {message}"),
            Self::InvalidBody(message) => write!(f, "invalid request body: {message}"),
            Self::Count(err) => write!(f, "{err}"),
            Self::Render(err) => write!(f, "could not render chart: {err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Upload(err) => Some(err),
            Self::Count(err) => Some(err),
            Self::Render(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Upload(err)
    }
}

impl From<CountError> for ApiError {
    fn from(err: CountError) -> Self {
        Self::Count(err)
    }
}

impl From<CanvasError> for ApiError {
    fn from(err: CanvasError) -> Self {
        Self::Render(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::InvalidBody(err.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::config::Mode;
use crate::upstream::UpstreamError;
use crate::validate::ValidationError;

pub const UPSTREAM_TIMEOUT_MESSAGE: &str = "upstream did not respond in time";
pub const UPSTREAM_AUTH_MESSAGE: &str = "authentication error with upstream";
pub const UPSTREAM_FAILURE_MESSAGE: &str = "error communicating with upstream";
pub const INTERNAL_MESSAGE: &str = "internal server error";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";

/// Every failure that can reach the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

/// Client-facing error: a status code plus the `{status, message}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new<T: Into<String>>(status: StatusCode, message: T) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: &self.message,
            detail: self.detail.as_deref(),
        };

        (self.status, Json(body)).into_response()
    }
}

/// Maps boundary errors to responses. Total: every `AppError` yields exactly
/// one `ErrorResponse`.
#[derive(Debug, Clone, Copy)]
pub struct ErrorTranslator {
    mode: Mode,
}

impl ErrorTranslator {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// `resource` names what was requested, used for upstream 404s.
    pub fn translate(&self, err: &AppError, resource: &str) -> ErrorResponse {
        match err {
            AppError::Validation(reason) => {
                tracing::warn!(%reason, "rejected request parameters");
                ErrorResponse::bad_request(reason.to_string())
            }
            AppError::Upstream(upstream) => self.translate_upstream(upstream, resource),
            AppError::Internal(source) => {
                tracing::error!(error = ?source, "internal server error");
                self.internal(format!("{source:#}"))
            }
        }
    }

    fn translate_upstream(&self, err: &UpstreamError, resource: &str) -> ErrorResponse {
        match err {
            UpstreamError::Timeout { url } => {
                tracing::error!(%url, "timeout while consuming benefits API");
                ErrorResponse::new(StatusCode::GATEWAY_TIMEOUT, UPSTREAM_TIMEOUT_MESSAGE)
            }
            UpstreamError::Http { url, status: 404, .. } => {
                tracing::warn!(%url, resource, "upstream reported resource missing");
                ErrorResponse::not_found(format!("{resource} not found"))
            }
            UpstreamError::Http {
                url,
                status: status @ (401 | 403),
                message,
            } => {
                tracing::error!(%url, status, ?message, "authentication error with benefits API");
                ErrorResponse::new(StatusCode::BAD_GATEWAY, UPSTREAM_AUTH_MESSAGE)
            }
            UpstreamError::Http {
                url,
                status,
                message,
            } => {
                tracing::error!(%url, status, ?message, "benefits API returned an error status");
                ErrorResponse::new(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE_MESSAGE)
            }
            UpstreamError::Connection { url, source } => {
                tracing::error!(%url, error = %source, "error while consuming benefits API");
                ErrorResponse::new(StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE_MESSAGE)
            }
            UpstreamError::Decode { url, source } => {
                tracing::error!(%url, error = %source, "unreadable payload from benefits API");
                self.internal(format!("{err}: {source}"))
            }
        }
    }

    /// Renders a handler panic through the same 500 shape.
    pub fn panic_response(&self, panic: Box<dyn Any + Send + 'static>) -> Response {
        let detail = if let Some(text) = panic.downcast_ref::<String>() {
            text.clone()
        } else if let Some(text) = panic.downcast_ref::<&str>() {
            text.to_string()
        } else {
            "handler panicked".to_string()
        };

        tracing::error!(%detail, "handler panicked");
        self.internal(detail).into_response()
    }

    fn internal(&self, detail: String) -> ErrorResponse {
        let detail = self.mode.exposes_diagnostics().then_some(detail);
        ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE).with_detail(detail)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    fn http(status: u16) -> AppError {
        AppError::Upstream(UpstreamError::Http {
            url: "http://upstream/beneficios/1".into(),
            status,
            message: None,
        })
    }

    #[test]
    fn maps_timeout_to_gateway_timeout() {
        let translator = ErrorTranslator::new(Mode::Production);
        let err = AppError::Upstream(UpstreamError::Timeout {
            url: "http://upstream/beneficios/1".into(),
        });

        let response = translator.translate(&err, "benefit");
        assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.message, "upstream did not respond in time");
    }

    #[test]
    fn maps_upstream_statuses() {
        let translator = ErrorTranslator::new(Mode::Production);

        let not_found = translator.translate(&http(404), "benefit");
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.message, "benefit not found");

        for status in [401, 403] {
            let auth = translator.translate(&http(status), "benefit");
            assert_eq!(auth.status, StatusCode::BAD_GATEWAY);
            assert_eq!(auth.message, UPSTREAM_AUTH_MESSAGE);
        }

        for status in [400, 429, 500, 503] {
            let other = translator.translate(&http(status), "benefit");
            assert_eq!(other.status, StatusCode::BAD_GATEWAY);
            assert_eq!(other.message, UPSTREAM_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn validation_becomes_bad_request() {
        let translator = ErrorTranslator::new(Mode::Production);
        let response = translator.translate(&ValidationError::InvalidPage.into(), "benefits page");

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.message,
            "Invalid page number. Page must be a positive integer"
        );
        assert_eq!(response.detail, None);
    }

    #[test]
    fn internal_detail_depends_on_mode() {
        let err = AppError::Internal(anyhow!("boom").context("loading page"));

        let prod = ErrorTranslator::new(Mode::Production).translate(&err, "benefit");
        assert_eq!(prod.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(prod.message, INTERNAL_MESSAGE);
        assert_eq!(prod.detail, None);

        let dev = ErrorTranslator::new(Mode::Development).translate(&err, "benefit");
        assert_eq!(dev.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(dev.detail.as_deref(), Some("loading page: boom"));
    }

    #[test]
    fn panics_render_as_internal_errors() {
        let response = ErrorTranslator::new(Mode::Production)
            .panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

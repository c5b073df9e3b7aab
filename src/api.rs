// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! HTTP API for the benefits gateway.
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/beneficios?page=` - Paged benefit listing
//! - `GET /api/beneficios/:id` - Single benefit
//! - `GET /api/beneficios/comercio/:value` - Benefits for one commerce
//! - `GET /metrics` - Prometheus metrics export
//!
//! Handlers validate input, call the lookup service and translate failures
//! into `{status: "error", message}` bodies.

use std::any::Any;
use std::sync::Arc;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::error::{AppError, ErrorResponse, ErrorTranslator, ROUTE_NOT_FOUND_MESSAGE};
use crate::metrics::Metrics;
use crate::model::{HealthResponse, Lookup, PageQuery};
use crate::service::BenefitsService;
use crate::upstream::{BenefitsSource, UpstreamClient};
use crate::validate::{self, ValidationError};

pub const BASE_PATH: &str = "/api";

#[derive(Clone)]
pub struct AppState {
    pub benefits: BenefitsService,
    pub metrics: Metrics,
    pub translator: ErrorTranslator,
}

impl AppState {
    /// Wires the upstream client, cache and metrics described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let upstream = UpstreamClient::try_new(config.upstream.clone())?;
        Self::with_source(Arc::new(upstream), config)
    }

    pub fn with_source(
        source: Arc<dyn BenefitsSource>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let metrics = Metrics::new()?;
        let cache = ResponseCache::new(config.cache_ttl);

        Ok(Self {
            benefits: BenefitsService::new(source, cache, metrics.clone()),
            metrics,
            translator: ErrorTranslator::new(config.mode),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/beneficios", get(list_benefits))
        .route("/beneficios/", get(list_benefits))
        .route("/beneficios/:id", get(get_benefit))
        .route("/beneficios/comercio/", get(missing_commerce))
        .route("/beneficios/comercio/:value", get(benefits_by_commerce));

    let translator = state.translator;
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| translator.panic_response(panic),
        ));

    Router::new()
        .nest(BASE_PATH, api)
        .route("/metrics", get(metrics))
        .fallback(route_not_found)
        .layer(middleware)
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<String, ErrorResponse> {
    state
        .metrics
        .update_cache_entries(state.benefits.cache().len().await);
    state
        .metrics
        .export()
        .map_err(|err| state.translator.translate(&err, "metrics"))
}

pub async fn list_benefits(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Value>, ErrorResponse> {
    let resource = "benefits page";
    let page = query
        .map_err(|rejection| {
            tracing::debug!(%rejection, "unreadable query string");
            ValidationError::InvalidPage
        })
        .and_then(|Query(query)| validate::page(query.page.as_deref()))
        .map_err(|err| reject(&state, err, resource))?;

    let lookup = state.benefits.list_page(page).await;
    respond(&state, lookup.map_err(AppError::from), resource, || {
        format!("No benefits found for page {page}")
    })
}

pub async fn get_benefit(
    State(state): State<AppState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ErrorResponse> {
    let resource = "benefit";
    let raw_id = path_param(raw_id);
    let id = validate::benefit_id(raw_id.as_deref()).map_err(|err| reject(&state, err, resource))?;

    let lookup = state.benefits.get_by_id(id).await;
    respond(&state, lookup.map_err(AppError::from), resource, || {
        format!("Benefit with ID {id} not found")
    })
}

pub async fn benefits_by_commerce(
    State(state): State<AppState>,
    raw_value: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ErrorResponse> {
    let resource = "commerce benefits";
    let raw_value = path_param(raw_value);
    let value =
        validate::commerce(raw_value.as_deref()).map_err(|err| reject(&state, err, resource))?;

    let lookup = state.benefits.get_by_commerce(value).await;
    respond(&state, lookup.map_err(AppError::from), resource, || {
        format!("No benefits found for commerce: {value}")
    })
}

pub async fn missing_commerce(State(state): State<AppState>) -> ErrorResponse {
    reject(&state, ValidationError::MissingCommerce, "commerce benefits")
}

pub async fn route_not_found(method: Method, uri: axum::http::Uri) -> Response {
    tracing::warn!(%method, %uri, "route not found");
    ErrorResponse::not_found(ROUTE_NOT_FOUND_MESSAGE).into_response()
}

/// An undecodable segment (e.g. invalid UTF-8) counts as absent.
fn path_param(extracted: Result<Path<String>, PathRejection>) -> Option<String> {
    match extracted {
        Ok(Path(value)) => Some(value),
        Err(rejection) => {
            tracing::debug!(%rejection, "unreadable path parameter");
            None
        }
    }
}

fn reject(state: &AppState, err: ValidationError, resource: &str) -> ErrorResponse {
    state.translator.translate(&AppError::from(err), resource)
}

fn respond<F>(
    state: &AppState,
    lookup: Result<Lookup<Value>, AppError>,
    resource: &str,
    not_found: F,
) -> Result<Json<Value>, ErrorResponse>
where
    F: FnOnce() -> String,
{
    match lookup {
        Ok(Lookup::Found(body)) => Ok(Json(body)),
        Ok(Lookup::NotFound) => Err(ErrorResponse::not_found(not_found())),
        Err(err) => Err(state.translator.translate(&err, resource)),
    }
}

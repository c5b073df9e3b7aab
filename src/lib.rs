// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Read-only caching gateway in front of the benefits REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod service;
pub mod upstream;
pub mod validate;

// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Inbound parameter checks, run before the lookup service is touched.

use thiserror::Error;

pub const DEFAULT_PAGE: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid page number. Page must be a positive integer")]
    InvalidPage,
    #[error("Invalid benefit ID. ID must be a number")]
    InvalidBenefitId,
    #[error("Commerce value is required")]
    MissingCommerce,
}

/// Absent means the first page; anything else must be an integer >= 1.
pub fn page(raw: Option<&str>) -> Result<u64, ValidationError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PAGE);
    };

    match raw.trim().parse::<i64>() {
        Ok(page) if page >= 1 => Ok(page as u64),
        _ => Err(ValidationError::InvalidPage),
    }
}

/// Accepts any finite number and returns it trimmed, as the upstream expects it.
pub fn benefit_id(raw: Option<&str>) -> Result<&str, ValidationError> {
    let id = raw.map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return Err(ValidationError::InvalidBenefitId);
    }

    match id.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(id),
        _ => Err(ValidationError::InvalidBenefitId),
    }
}

/// Returns the value exactly as received; it is part of the cache key.
pub fn commerce(raw: Option<&str>) -> Result<&str, ValidationError> {
    match raw {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::MissingCommerce),
    }
}

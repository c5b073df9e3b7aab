// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Request and response shapes for the gateway.
//!
//! Upstream benefit payloads stay as opaque JSON; only the envelope and the
//! `beneficios` list are inspected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a lookup that reached a conclusion.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Strips the upstream `{ "body": ... }` wrapper; a missing or null body is `None`.
pub fn unwrap_envelope(mut raw: Value) -> Option<Value> {
    match raw.get_mut("body").map(Value::take) {
        Some(Value::Null) | None => None,
        Some(body) => Some(body),
    }
}

/// True when a list payload carries at least one benefit.
pub fn has_benefits(page: &Value) -> bool {
    page.get("beneficios")
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unwraps_body() {
        let raw = json!({ "body": { "beneficios": [{ "id": 1 }] }, "status": 200 });
        assert_eq!(
            unwrap_envelope(raw),
            Some(json!({ "beneficios": [{ "id": 1 }] }))
        );
    }

    #[test]
    fn missing_or_null_body_is_absent() {
        assert_eq!(unwrap_envelope(json!({ "invalid": "structure" })), None);
        assert_eq!(unwrap_envelope(json!({ "body": null })), None);
        assert_eq!(unwrap_envelope(json!([1, 2])), None);
    }

    #[test]
    fn detects_empty_lists() {
        assert!(has_benefits(&json!({ "beneficios": [{ "id": 1 }] })));
        assert!(!has_benefits(&json!({ "beneficios": [] })));
        assert!(!has_benefits(&json!({ "beneficios": "none" })));
        assert!(!has_benefits(&json!({ "totalPages": 0 })));
    }
}

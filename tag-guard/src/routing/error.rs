// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Reasons a request is turned away before it reaches the wrapped handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagRoutingError {
    /// A tag header was sent more than once (400).
    #[error("multiple {header} header entries are not permitted")]
    MultipleHeaderValues { header: String },

    /// The declared tag has no route and fallback is disabled (404).
    #[error("tag not found")]
    TagNotFound,

    /// Declared and resolved tags both exist but disagree (502).
    #[error("inconsistent tag is provided")]
    TagInconsistent { tag: String, tag_ref: String },
}

impl ResponseError for TagRoutingError {
    fn status_code(&self) -> StatusCode {
        match self {
            TagRoutingError::MultipleHeaderValues { .. } => StatusCode::BAD_REQUEST,
            TagRoutingError::TagNotFound => StatusCode::NOT_FOUND,
            TagRoutingError::TagInconsistent { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
            .insert_header((X_CONTENT_TYPE_OPTIONS, "nosniff"))
            .body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let multiple = TagRoutingError::MultipleHeaderValues {
            header: "X-Request-Tag".to_string(),
        };
        assert_eq!(multiple.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(TagRoutingError::TagNotFound.status_code(), StatusCode::NOT_FOUND);
        let inconsistent = TagRoutingError::TagInconsistent {
            tag: "v2".to_string(),
            tag_ref: "v1".to_string(),
        };
        assert_eq!(inconsistent.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(inconsistent.to_string(), "inconsistent tag is provided");
    }

    #[test]
    fn error_response_is_plain_text() {
        let response = TagRoutingError::TagNotFound.error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        assert_eq!(content_type, "text/plain; charset=utf-8");
        assert!(response.headers().contains_key(X_CONTENT_TYPE_OPTIONS));
    }
}

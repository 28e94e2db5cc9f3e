// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Scrape endpoints served on the metrics listener, outside the tag guard.
//!
//! - `GET /metrics` - Prometheus text exposition of the injected registry
//! - `GET /health` - liveness check

use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpResponse, web};
use prometheus::Registry;

use crate::metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

async fn metrics_handler(registry: web::Data<Registry>) -> HttpResponse {
    match metrics::render(&registry) {
        Ok(body) => HttpResponse::Ok()
            .insert_header((CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE))
            .body(body),
        Err(error) => {
            log::error!("Failed to render metrics: {}", error);
            HttpResponse::InternalServerError().body("failed to render metrics")
        }
    }
}

async fn health_handler() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

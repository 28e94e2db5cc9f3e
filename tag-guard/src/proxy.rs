// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Reverse proxy handler the guard wraps in the shipped binary.

use actix_web::http::header::{CONNECTION, HeaderName, TRANSFER_ENCODING};
use actix_web::{HttpRequest, HttpResponse, error, web};

use crate::config::UpstreamConfig;

fn is_hop_by_hop(name: &HeaderName) -> bool {
    *name == CONNECTION || *name == TRANSFER_ENCODING
}

/// Per-worker upstream client. `awc::Client` is not `Send`, so each worker
/// builds its own from the shared configuration.
pub struct Upstream {
    client: awc::Client,
    base_url: String,
    max_body_bytes: usize,
}

impl Upstream {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            client: awc::Client::builder().timeout(config.timeout()).finish(),
            base_url: config.url.clone(),
            max_body_bytes: config.max_body_bytes(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn upstream_url(base: &str, path_and_query: &str) -> String {
    let base = base.trim_end_matches('/');
    if path_and_query.starts_with('/') {
        format!("{}{}", base, path_and_query)
    } else {
        format!("{}/{}", base, path_and_query)
    }
}

pub async fn forward(
    req: HttpRequest,
    body: web::Bytes,
    upstream: web::Data<Upstream>,
) -> actix_web::Result<HttpResponse> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = upstream_url(upstream.base_url(), target);

    let mut upstream_response = upstream
        .client
        .request_from(url.as_str(), req.head())
        .no_decompress()
        .send_body(body)
        .await
        .map_err(|e| {
            log::warn!("Upstream request to {} failed: {}", url, e);
            error::ErrorBadGateway("upstream unavailable")
        })?;

    let mut response = HttpResponse::build(upstream_response.status());
    for (name, value) in upstream_response
        .headers()
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
    {
        response.append_header((name.clone(), value.clone()));
    }

    let payload = upstream_response
        .body()
        .limit(upstream.max_body_bytes)
        .await
        .map_err(|e| {
            log::warn!("Reading upstream response from {} failed: {}", url, e);
            error::ErrorBadGateway("upstream unavailable")
        })?;

    Ok(response.body(payload))
}

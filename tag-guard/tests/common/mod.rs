// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, Error, HttpResponse, web};
use prometheus::Registry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tag_guard::metrics::{RevisionIdentity, TagMetrics};
use tag_guard::routing::{TAG_REF_HEADER_NAME, TagRouting};

pub const HANDLER_BODY: &str = "served by upstream";

pub fn identity() -> RevisionIdentity {
    RevisionIdentity::new("default", "hello", "hello", "hello-00001")
}

/// Wrapped handler stand-in that counts how often the guard lets a request through.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

async fn counted_handler(counter: web::Data<CallCounter>) -> HttpResponse {
    counter.record();
    HttpResponse::Ok().body(HANDLER_BODY)
}

pub struct TestHarness {
    pub registry: Registry,
    pub metrics: Option<Arc<TagMetrics>>,
    pub counter: CallCounter,
    pub enable_fallback: bool,
}

impl TestHarness {
    pub fn new(enable_fallback: bool) -> Self {
        let registry = Registry::new();
        let metrics = TagMetrics::try_register(&registry, &identity());
        assert!(metrics.is_some(), "fresh registry must accept the metric");
        Self {
            registry,
            metrics,
            counter: CallCounter::default(),
            enable_fallback,
        }
    }

    pub fn without_metrics(enable_fallback: bool) -> Self {
        Self {
            registry: Registry::new(),
            metrics: None,
            counter: CallCounter::default(),
            enable_fallback,
        }
    }

    pub fn guard(&self) -> TagRouting {
        TagRouting::with_metrics(self.enable_fallback, self.metrics.clone())
    }

    pub fn build_app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(web::Data::new(self.counter.clone()))
            .wrap(self.guard())
            .default_service(web::to(counted_handler))
    }

    pub fn invalid_tag_count(&self, actual: &str, expected: &str) -> u64 {
        self.metrics
            .as_ref()
            .map(|metrics| metrics.invalid_tag_count(actual, expected))
            .unwrap_or(0)
    }
}

pub fn echoed_tag_refs(resp: &ServiceResponse<impl MessageBody>) -> Vec<String> {
    resp.headers()
        .get_all(TAG_REF_HEADER_NAME)
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}

/// Raw bytes of every echoed reference entry, for values that are not valid UTF-8.
pub fn echoed_tag_ref_bytes(resp: &ServiceResponse<impl MessageBody>) -> Vec<Vec<u8>> {
    resp.headers()
        .get_all(TAG_REF_HEADER_NAME)
        .map(|value| value.as_bytes().to_vec())
        .collect()
}

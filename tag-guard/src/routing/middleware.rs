// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::Error;
use actix_web::ResponseError;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::HeaderValue;
use prometheus::Registry;

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use super::error::TagRoutingError;
use super::headers::{
    TAG_HEADER_NAME, TAG_REF_HEADER_NAME, first_header_value, tag_ref_header_name,
    unique_header_value,
};
use super::policy::{ConsistencyDecision, TagPolicy};
use crate::metrics::{RevisionIdentity, TagMetrics};

/// Middleware factory rejecting requests whose declared tag contradicts the
/// tag the routing layer resolved them to.
///
/// Build it once and clone it into each worker's `App` so the metric is
/// registered a single time per process.
#[derive(Clone)]
pub struct TagRouting {
    policy: TagPolicy,
    metrics: Option<Arc<TagMetrics>>,
}

impl TagRouting {
    pub fn new(identity: RevisionIdentity, enable_fallback: bool, registry: &Registry) -> Self {
        let metrics = TagMetrics::try_register(registry, &identity);
        Self::with_metrics(enable_fallback, metrics)
    }

    pub fn with_metrics(enable_fallback: bool, metrics: Option<Arc<TagMetrics>>) -> Self {
        Self {
            policy: TagPolicy::new(enable_fallback),
            metrics,
        }
    }

    pub fn policy(&self) -> TagPolicy {
        self.policy
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics.is_some()
    }
}

impl<S, B> Transform<S, ServiceRequest> for TagRouting
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TagRoutingMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TagRoutingMiddleware {
            service: Rc::new(service),
            policy: self.policy,
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct TagRoutingMiddleware<S> {
    service: Rc<S>,
    policy: TagPolicy,
    metrics: Option<Arc<TagMetrics>>,
}

impl<S, B> Service<ServiceRequest> for TagRoutingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let policy = self.policy;
        let metrics = self.metrics.clone();

        Box::pin(async move {
            let echo = TagRefEcho::new(first_header_value(req.headers(), TAG_REF_HEADER_NAME));
            let tag = unique_header_value(req.headers(), TAG_HEADER_NAME);
            let tag_ref = unique_header_value(req.headers(), TAG_REF_HEADER_NAME);

            let (tag, tag_ref) = match (tag, tag_ref) {
                (Ok(tag), Ok(tag_ref)) => (tag, tag_ref),
                (Err(error), _) | (_, Err(error)) => {
                    log::debug!("Rejecting request to {}: {}", req.path(), error);
                    return Ok(echo.finish(reject(req, error)));
                }
            };

            match policy.decide(&tag, &tag_ref) {
                ConsistencyDecision::Pass => {
                    let response = service.call(req).await?.map_into_left_body();
                    Ok(echo.finish(response))
                }
                ConsistencyDecision::TagNotFound => {
                    log::debug!(
                        "Tag {:?} not found for request to {} (resolved {:?})",
                        tag,
                        req.path(),
                        tag_ref
                    );
                    Ok(echo.finish(reject(req, TagRoutingError::TagNotFound)))
                }
                ConsistencyDecision::TagInconsistent => {
                    let tag = String::from_utf8_lossy(tag.as_bytes()).into_owned();
                    let tag_ref = String::from_utf8_lossy(tag_ref.as_bytes()).into_owned();
                    if let Some(metrics) = &metrics {
                        metrics.record_invalid_tag(&tag, &tag_ref);
                    }
                    log::debug!(
                        "Inconsistent tag for request to {}: declared '{}', resolved '{}'",
                        req.path(),
                        tag,
                        tag_ref
                    );
                    Ok(echo.finish(reject(
                        req,
                        TagRoutingError::TagInconsistent { tag, tag_ref },
                    )))
                }
            }
        })
    }
}

fn reject<B>(req: ServiceRequest, error: TagRoutingError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(error.error_response()).map_into_right_body()
}

/// Pending write of the tag reference header, holding the first entry exactly
/// as received. Consumed by the single `finish` call on whichever path the
/// request leaves through.
struct TagRefEcho {
    value: HeaderValue,
}

impl TagRefEcho {
    fn new(value: HeaderValue) -> Self {
        Self { value }
    }

    fn finish<B>(self, mut response: ServiceResponse<B>) -> ServiceResponse<B> {
        response
            .headers_mut()
            .append(tag_ref_header_name(), self.value);
        response
    }
}

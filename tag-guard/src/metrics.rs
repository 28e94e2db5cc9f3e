// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Prometheus reporting for requests whose declared tag disagrees with the
//! resolved route.
//!
//! Metrics are strictly best effort: the guard holds an optional
//! [`TagMetrics`] and keeps serving when it could not be built.

use std::sync::Arc;

use log::warn;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

pub const INVALID_TAG_METRIC_NAME: &str = "request_with_invalid_tag_header_count";
pub const INVALID_TAG_METRIC_HELP: &str =
    "The number of requests with the tag header which is not matched with the tag reference header";

pub const NAMESPACE_LABEL: &str = "namespace_name";
pub const SERVICE_LABEL: &str = "service_name";
pub const CONFIGURATION_LABEL: &str = "configuration_name";
pub const REVISION_LABEL: &str = "revision_name";
pub const TAG_ACTUAL_LABEL: &str = "tag_actual";
pub const TAG_EXPECTED_LABEL: &str = "tag_expected";

pub const MAX_LABEL_VALUE_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum TagMetricsError {
    #[error("metric registration failed: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("invalid {label} label value: {reason}")]
    InvalidIdentity { label: &'static str, reason: String },

    #[error("metric encoding failed: {0}")]
    Encoding(String),
}

/// Service identity attached to every sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionIdentity {
    pub namespace: String,
    pub service: String,
    pub configuration: String,
    pub revision: String,
}

impl RevisionIdentity {
    pub fn new(
        namespace: impl Into<String>,
        service: impl Into<String>,
        configuration: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            service: service.into(),
            configuration: configuration.into(),
            revision: revision.into(),
        }
    }

    /// Builds the base label context, rejecting values a metrics backend would refuse.
    fn context(&self) -> Result<RevisionContext, TagMetricsError> {
        let labels = [
            (NAMESPACE_LABEL, &self.namespace),
            (SERVICE_LABEL, &self.service),
            (CONFIGURATION_LABEL, &self.configuration),
            (REVISION_LABEL, &self.revision),
        ];
        for (label, value) in labels {
            validate_label_value(label, value)?;
        }
        Ok(RevisionContext {
            values: [
                self.namespace.clone(),
                self.service.clone(),
                self.configuration.clone(),
                self.revision.clone(),
            ],
        })
    }
}

fn validate_label_value(label: &'static str, value: &str) -> Result<(), TagMetricsError> {
    if value.len() > MAX_LABEL_VALUE_LEN {
        return Err(TagMetricsError::InvalidIdentity {
            label,
            reason: format!(
                "{} bytes exceeds the {} byte limit",
                value.len(),
                MAX_LABEL_VALUE_LEN
            ),
        });
    }
    if let Some(c) = value.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(TagMetricsError::InvalidIdentity {
            label,
            reason: format!("non-printable character {:?}", c),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct RevisionContext {
    values: [String; 4],
}

/// Counter of requests rejected because the tag and the tag reference disagree.
#[derive(Debug, Clone)]
pub struct TagMetrics {
    invalid_tag_requests: IntCounterVec,
    context: RevisionContext,
}

impl TagMetrics {
    pub fn register(
        registry: &Registry,
        identity: &RevisionIdentity,
    ) -> Result<Self, TagMetricsError> {
        let invalid_tag_requests = IntCounterVec::new(
            Opts::new(INVALID_TAG_METRIC_NAME, INVALID_TAG_METRIC_HELP),
            &[
                NAMESPACE_LABEL,
                SERVICE_LABEL,
                CONFIGURATION_LABEL,
                REVISION_LABEL,
                TAG_ACTUAL_LABEL,
                TAG_EXPECTED_LABEL,
            ],
        )?;
        let registered = registry.register(Box::new(invalid_tag_requests.clone()));
        let context = identity.context();

        registered?;
        Ok(Self {
            invalid_tag_requests,
            context: context?,
        })
    }

    /// Like [`TagMetrics::register`], but a failure only disables reporting.
    pub fn try_register(registry: &Registry, identity: &RevisionIdentity) -> Option<Arc<Self>> {
        match Self::register(registry, identity) {
            Ok(metrics) => Some(Arc::new(metrics)),
            Err(error) => {
                warn!(
                    "Tag metrics disabled for revision '{}': {}",
                    identity.revision, error
                );
                None
            }
        }
    }

    /// Counts one inconsistent request under the declared (`actual`) and
    /// resolved (`expected`) tags.
    ///
    /// Both tags come from request headers, so every distinct pair opens a new
    /// series. Values are cut to [`MAX_LABEL_VALUE_LEN`] bytes, which bounds the
    /// size of a series but not their number.
    pub fn record_invalid_tag(&self, actual: &str, expected: &str) {
        self.series(actual, expected).inc();
    }

    pub fn invalid_tag_count(&self, actual: &str, expected: &str) -> u64 {
        self.series(actual, expected).get()
    }

    fn series(&self, actual: &str, expected: &str) -> prometheus::IntCounter {
        let [namespace, service, configuration, revision] = &self.context.values;
        self.invalid_tag_requests.with_label_values(&[
            namespace.as_str(),
            service.as_str(),
            configuration.as_str(),
            revision.as_str(),
            capped_label(actual),
            capped_label(expected),
        ])
    }
}

fn capped_label(value: &str) -> &str {
    if value.len() <= MAX_LABEL_VALUE_LEN {
        return value;
    }
    let mut end = MAX_LABEL_VALUE_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Encodes every metric family in `registry` in the Prometheus text format.
pub fn render(registry: &Registry) -> Result<String, TagMetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| TagMetricsError::Encoding(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TagMetricsError::Encoding(e.to_string()))
}

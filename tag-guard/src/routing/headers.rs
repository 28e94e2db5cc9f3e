// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};

use super::error::TagRoutingError;

/// Tag the caller asked to be routed to.
pub const TAG_HEADER_NAME: &str = "X-Request-Tag";

/// Tag the routing layer actually resolved the request to.
pub const TAG_REF_HEADER_NAME: &str = "X-Tag-Resolved";

/// Reference value written by the routing layer when no tagged route matched.
pub const DEFAULT_TAG_REF: &str = "default";

pub(crate) fn tag_ref_header_name() -> HeaderName {
    HeaderName::from_static("x-tag-resolved")
}

/// First entry of `name` as sent, or an empty value when the header is absent.
pub fn first_header_value(headers: &HeaderMap, name: &str) -> HeaderValue {
    headers
        .get(name)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""))
}

/// Returns the single value of `name`, or an empty value when the header is absent.
///
/// Values are kept as raw header bytes. More than one entry is a malformed
/// request and is reported as such, never resolved by picking one of the values.
pub fn unique_header_value(
    headers: &HeaderMap,
    name: &str,
) -> Result<HeaderValue, TagRoutingError> {
    if headers.get_all(name).nth(1).is_some() {
        return Err(TagRoutingError::MultipleHeaderValues {
            header: name.to_string(),
        });
    }

    Ok(first_header_value(headers, name))
}

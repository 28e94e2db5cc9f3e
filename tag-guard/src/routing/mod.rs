// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod error;
pub mod headers;
pub mod middleware;
pub mod policy;

pub use error::TagRoutingError;
pub use headers::{
    DEFAULT_TAG_REF, TAG_HEADER_NAME, TAG_REF_HEADER_NAME, first_header_value, unique_header_value,
};
pub use middleware::{TagRouting, TagRoutingMiddleware};
pub use policy::{ConsistencyDecision, TagPolicy};

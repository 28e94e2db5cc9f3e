// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::headers::DEFAULT_TAG_REF;

/// Outcome of comparing the declared tag with the resolved reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyDecision {
    Pass,
    /// The caller asked for a tag that has no route.
    TagNotFound,
    /// Both tags exist but the routing layer picked a different one.
    TagInconsistent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagPolicy {
    pub enable_fallback: bool,
}

impl TagPolicy {
    pub fn new(enable_fallback: bool) -> Self {
        Self { enable_fallback }
    }

    /// Compares raw header bytes; no decoding happens before the comparison.
    pub fn decide(
        &self,
        tag: impl AsRef<[u8]>,
        tag_ref: impl AsRef<[u8]>,
    ) -> ConsistencyDecision {
        let (tag, tag_ref) = (tag.as_ref(), tag_ref.as_ref());
        // An empty tag carries no preference to reconcile.
        if self.enable_fallback || tag.is_empty() || tag == tag_ref {
            return ConsistencyDecision::Pass;
        }

        if tag_ref == DEFAULT_TAG_REF.as_bytes() {
            ConsistencyDecision::TagNotFound
        } else {
            ConsistencyDecision::TagInconsistent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRICT: TagPolicy = TagPolicy {
        enable_fallback: false,
    };
    const FALLBACK: TagPolicy = TagPolicy {
        enable_fallback: true,
    };

    #[test]
    fn empty_tag_passes() {
        assert_eq!(STRICT.decide("", "v1"), ConsistencyDecision::Pass);
        assert_eq!(STRICT.decide("", ""), ConsistencyDecision::Pass);
        assert_eq!(STRICT.decide("", DEFAULT_TAG_REF), ConsistencyDecision::Pass);
    }

    #[test]
    fn matching_tags_pass() {
        assert_eq!(STRICT.decide("v2", "v2"), ConsistencyDecision::Pass);
    }

    #[test]
    fn unknown_tag_on_default_route_is_not_found() {
        assert_eq!(
            STRICT.decide("v2", DEFAULT_TAG_REF),
            ConsistencyDecision::TagNotFound
        );
    }

    #[test]
    fn disagreeing_tags_are_inconsistent() {
        assert_eq!(STRICT.decide("v2", "v1"), ConsistencyDecision::TagInconsistent);
        // A missing reference is not the default route.
        assert_eq!(STRICT.decide("v2", ""), ConsistencyDecision::TagInconsistent);
    }

    #[test]
    fn fallback_suppresses_every_mismatch() {
        assert_eq!(FALLBACK.decide("v2", "v1"), ConsistencyDecision::Pass);
        assert_eq!(FALLBACK.decide("v2", DEFAULT_TAG_REF), ConsistencyDecision::Pass);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert_eq!(STRICT.decide("V1", "v1"), ConsistencyDecision::TagInconsistent);
    }

    #[test]
    fn distinct_opaque_bytes_are_inconsistent() {
        assert_eq!(
            STRICT.decide(&b"v\xff"[..], &b"v\xfe"[..]),
            ConsistencyDecision::TagInconsistent
        );
        assert_eq!(
            STRICT.decide(&b"v\xff"[..], &b"v\xff"[..]),
            ConsistencyDecision::Pass
        );
    }

    #[test]
    fn decision_is_stable_across_calls() {
        let cases = [
            ("", "v1", false),
            ("v2", "v2", false),
            ("v2", DEFAULT_TAG_REF, false),
            ("v2", "v1", false),
            ("v2", "v1", true),
        ];
        for (tag, tag_ref, fallback) in cases {
            let policy = TagPolicy::new(fallback);
            let first = policy.decide(tag, tag_ref);
            for _ in 0..3 {
                assert_eq!(policy.decide(tag, tag_ref), first);
            }
        }
    }
}

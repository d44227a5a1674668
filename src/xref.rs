// 🔗 Identity Resolver - Vendor IDs to canonical entities
// Cross-reference entries are loaded once per run and never mutated.
//
// Resolution rules:
// - Only HIGH_QUALITY and MEDIUM_QUALITY entries resolve
// - First acceptable entry in insertion order wins
// - No match → deterministic placeholder "{KIND}-UNKNOWN-{vendor_id}"

use crate::model::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// MATCH QUALITY
// ============================================================================

/// Confidence rating on a cross-reference association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchQuality {
    HighQuality,
    MediumQuality,
    LowQuality,

    /// Quality could not be established; excluded from resolution entirely.
    Unresolved,
}

impl MatchQuality {
    /// Only HIGH and MEDIUM quality associations are trusted for resolution.
    pub fn resolves(&self) -> bool {
        matches!(self, MatchQuality::HighQuality | MatchQuality::MediumQuality)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchQuality::HighQuality => "HIGH_QUALITY",
            MatchQuality::MediumQuality => "MEDIUM_QUALITY",
            MatchQuality::LowQuality => "LOW_QUALITY",
            MatchQuality::Unresolved => "UNRESOLVED",
        }
    }

    /// Parse a quality label; anything unrecognized is Unresolved rather
    /// than an error, so one bad row never fails a reference-table load.
    pub fn parse(s: &str) -> MatchQuality {
        match s {
            "HIGH_QUALITY" => MatchQuality::HighQuality,
            "MEDIUM_QUALITY" => MatchQuality::MediumQuality,
            "LOW_QUALITY" => MatchQuality::LowQuality,
            _ => MatchQuality::Unresolved,
        }
    }
}

// ============================================================================
// CROSS-REFERENCE ENTRY
// ============================================================================

/// One vendor-ID → canonical-ID association. Many entries may point at the
/// same canonical ID (many-to-one). Read-only for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReferenceEntry {
    /// Which vendor system issued the identifier (provenance, not match key).
    pub vendor: String,

    pub vendor_id: String,

    pub canonical_id: String,

    pub quality: MatchQuality,
}

impl CrossReferenceEntry {
    pub fn new(
        vendor: impl Into<String>,
        vendor_id: impl Into<String>,
        canonical_id: impl Into<String>,
        quality: MatchQuality,
    ) -> Self {
        CrossReferenceEntry {
            vendor: vendor.into(),
            vendor_id: vendor_id.into(),
            canonical_id: canonical_id.into(),
            quality,
        }
    }
}

// ============================================================================
// CANONICAL ENTITY
// ============================================================================

/// The resolved output identity: a matched canonical ID, or a synthesized
/// placeholder that is stable for a given vendor ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub canonical_id: String,

    /// True when the ID came from the cross-reference table.
    pub matched: bool,

    /// Quality of the winning entry, when matched.
    pub quality: Option<MatchQuality>,
}

/// Deterministic placeholder for vendor IDs with no acceptable entry.
/// Re-derivable, never random: the same vendor ID always yields the same ID.
pub fn placeholder_id(kind: EntityKind, vendor_id: &str) -> String {
    format!("{}-UNKNOWN-{}", kind.as_str(), vendor_id)
}

/// Resolve one vendor ID against a cross-reference entry list.
///
/// Pure function over its inputs; never fails for absent data. Ties between
/// acceptable entries are not disambiguated beyond insertion order.
pub fn resolve(
    kind: EntityKind,
    vendor_id: &str,
    entries: &[CrossReferenceEntry],
) -> CanonicalEntity {
    for entry in entries {
        if entry.vendor_id == vendor_id && entry.quality.resolves() {
            return CanonicalEntity {
                canonical_id: entry.canonical_id.clone(),
                matched: true,
                quality: Some(entry.quality),
            };
        }
    }

    CanonicalEntity {
        canonical_id: placeholder_id(kind, vendor_id),
        matched: false,
        quality: None,
    }
}

// ============================================================================
// IDENTITY RESOLVER
// ============================================================================

/// Indexed resolver built once per run from one entity kind's entry list.
///
/// The first-acceptable-entry-wins rule is baked in at build time, so the
/// indexed path and the pure `resolve` function always agree.
pub struct IdentityResolver {
    index: HashMap<String, (String, MatchQuality)>,
}

impl IdentityResolver {
    pub fn from_entries(entries: &[CrossReferenceEntry]) -> Self {
        let mut index = HashMap::new();

        for entry in entries {
            if !entry.quality.resolves() {
                continue;
            }
            index
                .entry(entry.vendor_id.clone())
                .or_insert_with(|| (entry.canonical_id.clone(), entry.quality));
        }

        IdentityResolver { index }
    }

    /// Resolver over an empty table: everything falls to the placeholder path.
    pub fn empty() -> Self {
        IdentityResolver {
            index: HashMap::new(),
        }
    }

    pub fn resolve(&self, kind: EntityKind, vendor_id: &str) -> CanonicalEntity {
        match self.index.get(vendor_id) {
            Some((canonical_id, quality)) => CanonicalEntity {
                canonical_id: canonical_id.clone(),
                matched: true,
                quality: Some(*quality),
            },
            None => CanonicalEntity {
                canonical_id: placeholder_id(kind, vendor_id),
                matched: false,
                quality: None,
            },
        }
    }

    /// Number of distinct resolvable vendor IDs.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(vendor_id: &str, canonical: &str, quality: MatchQuality) -> CrossReferenceEntry {
        CrossReferenceEntry::new("FUND_ADMIN", vendor_id, canonical, quality)
    }

    #[test]
    fn test_unmatched_vendor_id_gets_placeholder() {
        let result = resolve(EntityKind::Fund, "X", &[]);

        assert_eq!(result.canonical_id, "FUND-UNKNOWN-X");
        assert!(!result.matched);
        assert!(result.quality.is_none());
    }

    #[test]
    fn test_placeholder_is_stable() {
        let a = resolve(EntityKind::Company, "V-77", &[]);
        let b = resolve(EntityKind::Company, "V-77", &[]);

        assert_eq!(a.canonical_id, b.canonical_id);
        assert_eq!(a.canonical_id, "COMPANY-UNKNOWN-V-77");
    }

    #[test]
    fn test_high_quality_entry_resolves() {
        let entries = vec![entry("V-1", "ENT-001", MatchQuality::HighQuality)];
        let result = resolve(EntityKind::Investor, "V-1", &entries);

        assert!(result.matched);
        assert_eq!(result.canonical_id, "ENT-001");
        assert_eq!(result.quality, Some(MatchQuality::HighQuality));
    }

    #[test]
    fn test_low_quality_never_resolves() {
        let entries = vec![entry("V-1", "ENT-001", MatchQuality::LowQuality)];
        let result = resolve(EntityKind::Investor, "V-1", &entries);

        assert!(!result.matched);
        assert_eq!(result.canonical_id, "INVESTOR-UNKNOWN-V-1");
    }

    #[test]
    fn test_unresolved_quality_is_excluded() {
        let entries = vec![
            entry("V-1", "ENT-001", MatchQuality::Unresolved),
            entry("V-1", "ENT-002", MatchQuality::MediumQuality),
        ];
        let result = resolve(EntityKind::Fund, "V-1", &entries);

        assert!(result.matched);
        assert_eq!(result.canonical_id, "ENT-002");
    }

    #[test]
    fn test_first_acceptable_entry_wins() {
        let entries = vec![
            entry("V-1", "ENT-FIRST", MatchQuality::MediumQuality),
            entry("V-1", "ENT-SECOND", MatchQuality::HighQuality),
        ];
        let result = resolve(EntityKind::Fund, "V-1", &entries);

        // Insertion order, not quality rank, decides ties
        assert_eq!(result.canonical_id, "ENT-FIRST");
    }

    #[test]
    fn test_indexed_resolver_matches_pure_function() {
        let entries = vec![
            entry("V-1", "ENT-FIRST", MatchQuality::MediumQuality),
            entry("V-1", "ENT-SECOND", MatchQuality::HighQuality),
            entry("V-2", "ENT-010", MatchQuality::LowQuality),
            entry("V-3", "ENT-020", MatchQuality::HighQuality),
        ];
        let resolver = IdentityResolver::from_entries(&entries);

        for vendor_id in ["V-1", "V-2", "V-3", "V-404"] {
            let pure = resolve(EntityKind::Fund, vendor_id, &entries);
            let indexed = resolver.resolve(EntityKind::Fund, vendor_id);
            assert_eq!(pure, indexed, "divergence for {}", vendor_id);
        }
    }

    #[test]
    fn test_quality_parse_unknown_label() {
        assert_eq!(MatchQuality::parse("HIGH_QUALITY"), MatchQuality::HighQuality);
        assert_eq!(MatchQuality::parse("banana"), MatchQuality::Unresolved);
        assert!(!MatchQuality::parse("banana").resolves());
    }
}

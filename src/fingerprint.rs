// 🔏 Fingerprint Generator - Change detection for incremental loads
// Hashes the canonical string form of the declared business fields, in
// declared order, so reprocessing can tell changed rows from unchanged ones.
// Not a security primitive.

use crate::model::{FieldMap, FieldValue};
use sha2::{Digest, Sha256};

/// Version prefix folded into every hash; bump when the canonical format
/// changes so stale stored fingerprints read as "changed".
pub const FINGERPRINT_VERSION: &str = "CANFP_V1";

/// Fingerprint a record over a declared field list.
///
/// Missing fields hash as null, so a field that appears with an explicit
/// null and one that is absent are the same content. Field names are folded
/// into the hash alongside values (with unit separators) so adjacent fields
/// can never smear into each other.
pub fn fingerprint(fields: &FieldMap, field_list: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_VERSION.as_bytes());

    for name in field_list {
        let canonical = fields
            .get(name)
            .map(FieldValue::canonical)
            .unwrap_or_else(|| FieldValue::Null.canonical());

        hasher.update([0x1f]);
        hasher.update(name.as_bytes());
        hasher.update([0x1e]);
        hasher.update(canonical.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields() -> FieldMap {
        let mut f = FieldMap::new();
        f.insert("canonical_id".into(), FieldValue::Text("ENT-001".into()));
        f.insert("amount_usd".into(), FieldValue::Number(1_080_000.0));
        f.insert(
            "effective_date".into(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()),
        );
        f.insert("note".into(), FieldValue::Null);
        f
    }

    fn field_list() -> Vec<String> {
        vec![
            "canonical_id".to_string(),
            "amount_usd".to_string(),
            "effective_date".to_string(),
            "note".to_string(),
        ]
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let f = fields();
        assert_eq!(fingerprint(&f, &field_list()), fingerprint(&f, &field_list()));
    }

    #[test]
    fn test_any_listed_field_change_alters_hash() {
        let base = fingerprint(&fields(), &field_list());

        let mut changed = fields();
        changed.insert("amount_usd".into(), FieldValue::Number(1_080_000.01));
        assert_ne!(fingerprint(&changed, &field_list()), base);

        let mut nulled = fields();
        nulled.insert("canonical_id".into(), FieldValue::Null);
        assert_ne!(fingerprint(&nulled, &field_list()), base);
    }

    #[test]
    fn test_unlisted_fields_never_affect_hash() {
        let base = fingerprint(&fields(), &field_list());

        let mut extra = fields();
        extra.insert("run_note".into(), FieldValue::Text("reprocessed".into()));
        assert_eq!(fingerprint(&extra, &field_list()), base);
    }

    #[test]
    fn test_missing_and_explicit_null_are_identical() {
        let with_null = fields();
        let mut without = fields();
        without.remove("note");

        assert_eq!(
            fingerprint(&with_null, &field_list()),
            fingerprint(&without, &field_list())
        );
    }

    #[test]
    fn test_declared_order_matters() {
        let f = fields();
        let mut reversed = field_list();
        reversed.reverse();

        assert_ne!(fingerprint(&f, &field_list()), fingerprint(&f, &reversed));
    }

    #[test]
    fn test_type_change_alters_hash() {
        let base = fingerprint(&fields(), &field_list());

        // Same digits, different type
        let mut retyped = fields();
        retyped.insert("amount_usd".into(), FieldValue::Text("1080000".into()));
        assert_ne!(fingerprint(&retyped, &field_list()), base);
    }
}

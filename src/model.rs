// 🧱 Data Model - Typed records shared by every engine stage
// SourceRecord comes in from the sanitizer boundary, NormalizedRecord goes out
// to the materialization layer. Reference tables live in their own modules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// FIELD VALUE
// ============================================================================

/// A typed, nullable attribute value.
///
/// Every attribute on a record is one of five shapes. The sanitizer upstream
/// has already done trimming and casting, so values arrive clean; the engine
/// only reads them, derives new ones, and canonicalizes them for hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Flag(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical, type-stable string form used for fingerprinting.
    ///
    /// Each variant carries a distinct prefix so that e.g. the text "42" and
    /// the number 42 can never collide, and null is representable ("~").
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Null => "~".to_string(),
            FieldValue::Flag(b) => format!("b:{}", b),
            FieldValue::Number(n) => format!("n:{}", n),
            FieldValue::Date(d) => format!("d:{}", d.format("%Y-%m-%d")),
            FieldValue::Text(s) => format!("s:{}", s),
        }
    }
}

/// The attribute map carried by every record. BTreeMap keeps iteration
/// deterministic, which matters for serialized payloads and test output.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Read a number field; a missing key behaves like Null.
pub fn field_number(fields: &FieldMap, name: &str) -> Option<f64> {
    fields.get(name).and_then(FieldValue::as_number)
}

/// Read a text field; a missing key behaves like Null.
pub fn field_text<'a>(fields: &'a FieldMap, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(FieldValue::as_text)
}

/// Read a flag field; a missing key behaves like Null.
pub fn field_flag(fields: &FieldMap, name: &str) -> Option<bool> {
    fields.get(name).and_then(FieldValue::as_flag)
}

/// Read a date field; a missing key behaves like Null.
pub fn field_date(fields: &FieldMap, name: &str) -> Option<NaiveDate> {
    fields.get(name).and_then(FieldValue::as_date)
}

// ============================================================================
// ENTITY KIND
// ============================================================================

/// The kinds of canonical entities the resolver knows about.
///
/// The SCREAMING_SNAKE_CASE serialized form is also what appears verbatim in
/// synthesized placeholder IDs ("FUND-UNKNOWN-X").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Company,
    Investor,
    Fund,
    Counterparty,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Company => "COMPANY",
            EntityKind::Investor => "INVESTOR",
            EntityKind::Fund => "FUND",
            EntityKind::Counterparty => "COUNTERPARTY",
        }
    }

    pub fn parse(s: &str) -> Option<EntityKind> {
        match s {
            "COMPANY" => Some(EntityKind::Company),
            "INVESTOR" => Some(EntityKind::Investor),
            "FUND" => Some(EntityKind::Fund),
            "COUNTERPARTY" => Some(EntityKind::Counterparty),
            _ => None,
        }
    }
}

// ============================================================================
// DATA FLAGS
// ============================================================================

/// Explicit markers for "normal" data-quality gaps.
///
/// Gaps never raise per-record errors; they show up as flags on the output
/// row (and as tier values inside classification cascades), so every row is
/// complete and classifiable even when inputs are partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFlag {
    /// No acceptable cross-reference entry; canonical ID is a placeholder.
    NoSource,

    /// The currency pair had no rate at or before the as-of date.
    FxRateMissing,

    /// A field required for a derivation was null or missing.
    IncompleteData,

    /// Catch-all for values the engine could not interpret.
    Unknown,
}

impl DataFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFlag::NoSource => "NO_SOURCE",
            DataFlag::FxRateMissing => "FX_RATE_MISSING",
            DataFlag::IncompleteData => "INCOMPLETE_DATA",
            DataFlag::Unknown => "UNKNOWN",
        }
    }
}

// ============================================================================
// SOURCE RECORD
// ============================================================================

/// A sanitized row from one vendor system. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Vendor tag, e.g. "CRM", "FUND_ADMIN", "PORTFOLIO".
    pub vendor: String,

    /// Vendor-scoped identifier. Never empty: the sanitizer boundary rejects
    /// rows without one before they reach the engine.
    pub vendor_id: String,

    /// Which canonical entity kind this row describes.
    pub entity_kind: EntityKind,

    /// Named attributes, already type-cast and trimmed upstream.
    pub fields: FieldMap,
}

impl SourceRecord {
    pub fn new(vendor: impl Into<String>, vendor_id: impl Into<String>, kind: EntityKind) -> Self {
        SourceRecord {
            vendor: vendor.into(),
            vendor_id: vendor_id.into(),
            entity_kind: kind,
            fields: FieldMap::new(),
        }
    }

    /// Builder: attach a field
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

// ============================================================================
// NORMALIZED RECORD
// ============================================================================

/// The output unit: a SourceRecord enriched with canonical identity, USD
/// fields, trend fields, classification tiers, a priority score, quality
/// flags, and a change-detection fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Stable key for incremental materialization (vendor, vendor id, and
    /// any profile-declared key fields such as reporting period).
    pub record_key: String,

    pub vendor: String,
    pub vendor_id: String,
    pub entity_kind: EntityKind,

    /// Resolved canonical ID, or a deterministic placeholder.
    pub canonical_id: String,

    /// Whether the canonical ID came from the cross-reference table.
    pub identity_matched: bool,

    /// True iff at least one monetary field actually received a conversion.
    pub converted: bool,

    /// The single rate applied across this record's monetary fields.
    pub fx_rate_used: Option<f64>,

    /// Output tier per cascade step, keyed by the step's output field.
    pub tiers: BTreeMap<String, String>,

    /// The profile's primary quality/priority score.
    pub score: f64,

    /// Data-quality gap markers accumulated while processing.
    pub flags: Vec<DataFlag>,

    /// Source fields plus everything the engine derived (USD fields, ratios,
    /// trend fields, tier and score fields).
    pub fields: FieldMap,

    /// Deterministic hash over the profile's declared fingerprint fields.
    pub fingerprint: String,

    /// UUID of the run that produced this row.
    pub run_id: String,
}

impl NormalizedRecord {
    pub fn has_flag(&self, flag: DataFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn tier(&self, output_field: &str) -> Option<&str> {
        self.tiers.get(output_field).map(String::as_str)
    }
}

// ============================================================================
// TESTS
// ============================================================================

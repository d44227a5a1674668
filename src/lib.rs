// Canonical Engine - Core Library
// Cross-source entity resolution, point-in-time currency normalization,
// temporal windows, rule-cascade classification, and change-detection
// fingerprints: one shared engine parameterized by per-entity-kind
// profiles, replacing logic previously duplicated across per-model
// transformation scripts.

pub mod model;       // Shared data model: field values, records, flags
pub mod xref;        // Cross-reference table + identity resolver
pub mod rates;       // Exchange-rate table + point-in-time selection
pub mod currency;    // Uniform base-currency conversion
pub mod windows;     // Latest / prior-period selection, growth rates
pub mod cascade;     // Ordered first-match-wins rule tables + score cards
pub mod rulesets;    // Built-in named classification and scoring tables
pub mod fingerprint; // Change-detection hashing
pub mod pipeline;    // The composed per-record engine
pub mod profiles;    // Built-in per-entity-kind profiles
pub mod loader;      // CSV boundary: reference tables + sanitized records
pub mod store;       // Incremental SQLite materialization

// Re-export commonly used types
pub use model::{
    DataFlag, EntityKind, FieldMap, FieldValue, NormalizedRecord, SourceRecord,
};
pub use xref::{
    resolve, CanonicalEntity, CrossReferenceEntry, IdentityResolver, MatchQuality,
};
pub use rates::{ExchangeRate, RateTable};
pub use currency::{convert_amounts, ConversionOutcome};
pub use windows::{growth_rate, latest_per_entity, prior_period, PeriodKey};
pub use cascade::{
    CascadeChain, CascadeStep, PointCascade, PointRule, Predicate, ScoreBucket, ScoreCard,
    ScoreScale, ScoreStep, TierCascade, TierRule,
};
pub use fingerprint::{fingerprint, FINGERPRINT_VERSION};
pub use pipeline::{
    EntityProfile, GainRatio, NormalizationPipeline, RunContext, TrendConfig,
};
pub use loader::{load_cross_references, load_exchange_rates, load_source_records, SourceLoad};
pub use store::{setup_store, stored_count, upsert_changed, StoreStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ⚙️ Normalization Pipeline - The composed per-record engine
// sanitized row → identity resolution → currency conversion → derivations →
// temporal windows (snapshot kinds) → classification cascades → score cards
// → fingerprint → NormalizedRecord.
//
// Every record is processable independently against the run's immutable
// reference snapshots; the only cross-record stage is the temporal window
// pass, computed within one entity's partition.

use crate::cascade::{CascadeChain, ScoreStep};
use crate::currency::{convert_amounts, ConversionOutcome};
use crate::fingerprint::fingerprint;
use crate::model::{
    field_date, field_number, DataFlag, EntityKind, FieldMap, FieldValue, NormalizedRecord,
    SourceRecord,
};
use crate::rates::RateTable;
use crate::windows::{growth_rate, latest_per_entity, prior_period, PeriodKey};
use crate::xref::{CanonicalEntity, CrossReferenceEntry, IdentityResolver};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// RUN CONTEXT
// ============================================================================

/// Explicit run parameters. The as-of date replaces every ambient clock
/// read the engine might otherwise be tempted to make, which keeps
/// processing deterministic and testable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// The processing date: rate selection and recency derivations are
    /// relative to this, never to wall-clock time.
    pub as_of: NaiveDate,

    pub base_currency: String,

    /// UUID identifying this run in the output store.
    pub run_id: String,
}

impl RunContext {
    pub fn new(as_of: NaiveDate) -> Self {
        RunContext {
            as_of,
            base_currency: "USD".to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Builder: override the base currency
    pub fn with_base_currency(mut self, base: impl Into<String>) -> Self {
        self.base_currency = base.into();
        self
    }
}

// ============================================================================
// ENTITY PROFILE
// ============================================================================

/// Derived return ratio: (value − basis) / basis, defined only when both
/// operands are present and the basis is strictly positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GainRatio {
    pub output_field: String,
    pub value_field: String,
    pub basis_field: String,
}

/// Period-over-period trend configuration for snapshot-type records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub year_field: String,
    pub quarter_field: String,

    /// The metric compared across periods (typically a converted field).
    pub value_field: String,

    /// Where the year-over-year growth percentage lands.
    pub growth_field: String,
}

/// Per-entity-kind parameterization of the shared engine.
///
/// The same resolution/conversion/classification machinery serves every
/// vendor table; profiles carry the field wiring and rule tables that used
/// to be duplicated across per-model transformation scripts.
#[derive(Debug, Clone)]
pub struct EntityProfile {
    pub name: String,
    pub kind: EntityKind,

    /// Field holding the record's currency tag.
    pub currency_field: String,

    /// Monetary fields converted into the base currency.
    pub amount_fields: Vec<String>,

    /// Return ratios derived after conversion.
    pub gain_ratios: Vec<GainRatio>,

    /// Effective-date field used to derive record_age_days from the as-of
    /// date, when set.
    pub age_field: Option<String>,

    /// Present only for snapshot-type records (batch trend pass).
    pub trend: Option<TrendConfig>,

    /// Tier cascades, applied in declared order.
    pub chain: CascadeChain,

    /// Score cards, applied after the chain so they can read tier outputs.
    pub scores: Vec<ScoreStep>,

    /// Which score output becomes the record's primary score.
    pub primary_score: Option<String>,

    /// Business fields hashed for change detection, in declared order.
    pub fingerprint_fields: Vec<String>,

    /// Fields appended to (vendor, vendor_id) to form the record key, e.g.
    /// the reporting period for snapshots.
    pub key_fields: Vec<String>,
}

impl EntityProfile {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        EntityProfile {
            name: name.into(),
            kind,
            currency_field: "currency".to_string(),
            amount_fields: Vec::new(),
            gain_ratios: Vec::new(),
            age_field: None,
            trend: None,
            chain: CascadeChain::empty(),
            scores: Vec::new(),
            primary_score: None,
            fingerprint_fields: Vec::new(),
            key_fields: Vec::new(),
        }
    }

    /// Builder: set the currency field name
    pub fn with_currency_field(mut self, field: impl Into<String>) -> Self {
        self.currency_field = field.into();
        self
    }

    /// Builder: add a monetary field
    pub fn with_amount_field(mut self, field: impl Into<String>) -> Self {
        self.amount_fields.push(field.into());
        self
    }

    /// Builder: add a derived return ratio
    pub fn with_gain_ratio(
        mut self,
        output: impl Into<String>,
        value_field: impl Into<String>,
        basis_field: impl Into<String>,
    ) -> Self {
        self.gain_ratios.push(GainRatio {
            output_field: output.into(),
            value_field: value_field.into(),
            basis_field: basis_field.into(),
        });
        self
    }

    /// Builder: set the effective-date field for recency derivation
    pub fn with_age_field(mut self, field: impl Into<String>) -> Self {
        self.age_field = Some(field.into());
        self
    }

    /// Builder: enable the snapshot trend pass
    pub fn with_trend(mut self, trend: TrendConfig) -> Self {
        self.trend = Some(trend);
        self
    }

    /// Builder: set the cascade chain
    pub fn with_chain(mut self, chain: CascadeChain) -> Self {
        self.chain = chain;
        self
    }

    /// Builder: add a score card output
    pub fn with_score(mut self, step: ScoreStep) -> Self {
        self.scores.push(step);
        self
    }

    /// Builder: name the primary score output
    pub fn with_primary_score(mut self, field: impl Into<String>) -> Self {
        self.primary_score = Some(field.into());
        self
    }

    /// Builder: declare the fingerprint field list
    pub fn with_fingerprint_fields(mut self, fields: &[&str]) -> Self {
        self.fingerprint_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Builder: declare extra record-key fields
    pub fn with_key_fields(mut self, fields: &[&str]) -> Self {
        self.key_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Intermediate state between enrichment and classification.
struct Enriched {
    fields: FieldMap,
    canonical: CanonicalEntity,
    outcome: ConversionOutcome,
    flags: Vec<DataFlag>,
}

pub struct NormalizationPipeline {
    context: RunContext,
    rates: RateTable,
    resolvers: HashMap<EntityKind, IdentityResolver>,
}

impl NormalizationPipeline {
    /// Build a pipeline over the run's immutable reference snapshots.
    /// Cross-reference entries are indexed once per entity kind, preserving
    /// the first-acceptable-entry-wins rule.
    pub fn new(
        context: RunContext,
        rates: RateTable,
        cross_references: HashMap<EntityKind, Vec<CrossReferenceEntry>>,
    ) -> Self {
        let resolvers = cross_references
            .into_iter()
            .map(|(kind, entries)| (kind, IdentityResolver::from_entries(&entries)))
            .collect();

        NormalizationPipeline {
            context,
            rates,
            resolvers,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Process one record. Infallible: data gaps become flags and tiers,
    /// never per-record errors.
    pub fn process(&self, profile: &EntityProfile, record: &SourceRecord) -> NormalizedRecord {
        let enriched = self.enrich(profile, record);
        self.finish(profile, record, enriched)
    }

    /// Process a homogeneous batch. Snapshot profiles take the windowed
    /// path; everything else maps straight through `process`.
    pub fn process_batch(
        &self,
        profile: &EntityProfile,
        records: &[SourceRecord],
    ) -> Vec<NormalizedRecord> {
        if profile.trend.is_some() {
            self.process_snapshots(profile, records)
        } else {
            records.iter().map(|r| self.process(profile, r)).collect()
        }
    }

    /// Batch path for snapshot-type records: enrich every row, then rank
    /// within each canonical entity's partition to attach `is_latest` and
    /// the exact-prior-period growth metric, then classify as usual.
    pub fn process_snapshots(
        &self,
        profile: &EntityProfile,
        records: &[SourceRecord],
    ) -> Vec<NormalizedRecord> {
        let trend = match &profile.trend {
            Some(t) => t,
            None => return records.iter().map(|r| self.process(profile, r)).collect(),
        };

        let mut staged: Vec<Enriched> = records
            .iter()
            .map(|r| self.enrich(profile, r))
            .collect();

        // (index, canonical id, period) for every row that has a period key
        let indexed: Vec<(usize, String, PeriodKey)> = staged
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                PeriodKey::from_fields(&e.fields, &trend.year_field, &trend.quarter_field)
                    .map(|p| (i, e.canonical.canonical_id.clone(), p))
            })
            .collect();

        let latest = latest_per_entity(&indexed, |(_, c, _)| c.clone(), |(_, _, p)| *p);
        let latest_rows: HashSet<usize> = latest.values().map(|entry| entry.0).collect();

        // Growth is computed read-only first; rows are mutated afterwards
        let mut growths: Vec<Option<f64>> = vec![None; staged.len()];
        for (i, canonical, period) in &indexed {
            let current = match field_number(&staged[*i].fields, &trend.value_field) {
                Some(value) => value,
                None => continue,
            };
            let prior = prior_period(
                &indexed,
                canonical,
                *period,
                |(_, c, _)| c.clone(),
                |(_, _, p)| Some(*p),
                PeriodKey::year_earlier,
            )
            .and_then(|(j, _, _)| field_number(&staged[*j].fields, &trend.value_field));
            growths[*i] = growth_rate(current, prior);
        }

        let with_period: HashSet<usize> = indexed.iter().map(|(i, _, _)| *i).collect();

        for (i, enriched) in staged.iter_mut().enumerate() {
            enriched.fields.insert(
                "is_latest".to_string(),
                FieldValue::Flag(latest_rows.contains(&i)),
            );
            if let Some(growth) = growths[i] {
                enriched
                    .fields
                    .insert(trend.growth_field.clone(), FieldValue::Number(growth));
            }
            if !with_period.contains(&i) {
                // No reporting period: the row still flows through, but it
                // can neither rank nor grow
                enriched.flags.push(DataFlag::IncompleteData);
            }
        }

        staged
            .into_iter()
            .zip(records)
            .map(|(enriched, record)| self.finish(profile, record, enriched))
            .collect()
    }

    // ========================================================================
    // STAGES
    // ========================================================================

    fn enrich(&self, profile: &EntityProfile, record: &SourceRecord) -> Enriched {
        let mut fields = record.fields.clone();
        let mut flags = Vec::new();

        // 1. Identity resolution
        let canonical = match self.resolvers.get(&profile.kind) {
            Some(resolver) => resolver.resolve(profile.kind, &record.vendor_id),
            None => IdentityResolver::empty().resolve(profile.kind, &record.vendor_id),
        };
        if !canonical.matched {
            flags.push(DataFlag::NoSource);
        }
        fields.insert(
            "canonical_id".to_string(),
            FieldValue::Text(canonical.canonical_id.clone()),
        );
        fields.insert(
            "identity_matched".to_string(),
            FieldValue::Flag(canonical.matched),
        );

        // 2. Currency normalization (one rate per record, applied uniformly)
        let outcome = convert_amounts(
            &mut fields,
            &profile.currency_field,
            &profile.amount_fields,
            &self.context.base_currency,
            &self.rates,
            self.context.as_of,
        );
        fields.insert(
            "converted".to_string(),
            FieldValue::Flag(outcome.converted),
        );
        fields.insert(
            "fx_rate_missing".to_string(),
            FieldValue::Flag(outcome.flags.contains(&DataFlag::FxRateMissing)),
        );
        flags.extend(outcome.flags.iter().copied());

        // 3. Recency relative to the injected as-of date
        if let Some(age_field) = &profile.age_field {
            if let Some(date) = field_date(&fields, age_field) {
                let age = (self.context.as_of - date).num_days() as f64;
                fields.insert("record_age_days".to_string(), FieldValue::Number(age));
            }
        }

        // 4. Derived return ratios over converted fields
        for ratio in &profile.gain_ratios {
            let value = field_number(&fields, &ratio.value_field);
            let basis = field_number(&fields, &ratio.basis_field);
            if let (Some(v), Some(b)) = (value, basis) {
                if b > 0.0 {
                    fields.insert(
                        ratio.output_field.clone(),
                        FieldValue::Number((v - b) / b),
                    );
                }
            }
        }

        Enriched {
            fields,
            canonical,
            outcome,
            flags,
        }
    }

    fn finish(
        &self,
        profile: &EntityProfile,
        record: &SourceRecord,
        enriched: Enriched,
    ) -> NormalizedRecord {
        let Enriched {
            mut fields,
            canonical,
            outcome,
            flags,
        } = enriched;

        // 5. Tier cascades, then score cards (scores may read tier outputs)
        let tiers = profile.chain.apply(&mut fields);
        for step in &profile.scores {
            step.apply(&mut fields);
        }
        let score = profile
            .primary_score
            .as_deref()
            .and_then(|f| field_number(&fields, f))
            .unwrap_or(0.0);

        // 6. Change-detection fingerprint over the declared business fields
        let print = fingerprint(&fields, &profile.fingerprint_fields);

        let record_key = record_key(record, &fields, &profile.key_fields);

        NormalizedRecord {
            record_key,
            vendor: record.vendor.clone(),
            vendor_id: record.vendor_id.clone(),
            entity_kind: record.entity_kind,
            canonical_id: canonical.canonical_id,
            identity_matched: canonical.matched,
            converted: outcome.converted,
            fx_rate_used: outcome.rate_used,
            tiers,
            score,
            flags,
            fields,
            fingerprint: print,
            run_id: self.context.run_id.clone(),
        }
    }
}

/// Stable materialization key: vendor, vendor id, plus any profile-declared
/// key fields (e.g. reporting period for snapshots).
fn record_key(record: &SourceRecord, fields: &FieldMap, key_fields: &[String]) -> String {
    let mut key = format!("{}:{}", record.vendor, record.vendor_id);
    for name in key_fields {
        let part = match fields.get(name) {
            Some(FieldValue::Text(s)) => s.clone(),
            Some(FieldValue::Number(n)) => format!("{}", n),
            Some(FieldValue::Date(d)) => d.format("%Y-%m-%d").to_string(),
            Some(FieldValue::Flag(b)) => b.to_string(),
            Some(FieldValue::Null) | None => "~".to_string(),
        };
        key.push(':');
        key.push_str(&part);
    }
    key
}

// ============================================================================
// TESTS
// ============================================================================

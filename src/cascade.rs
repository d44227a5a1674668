// 🏷️ Classification Cascade Engine - Ordered first-match-wins rule tables
// Rules are data: an ordered list of (predicate, outcome) pairs evaluated
// top to bottom. The first matching predicate wins and later rules are never
// reached. Every cascade must end in a catch-all rule, validated once at
// construction time. An incomplete ruleset is a configuration defect and
// fails the run before any record is processed.

use crate::model::{FieldMap, FieldValue};
use anyhow::{ensure, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Tolerance for validating that score weights sum to their declared total.
const WEIGHT_TOLERANCE: f64 = 1e-6;

// ============================================================================
// PREDICATE
// ============================================================================

/// A condition over a record's field map.
///
/// Numeric and text tests on a null or missing field evaluate false, so
/// cascades fall through to later rules (ultimately the catch-all) instead
/// of erroring on partial data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Predicate {
    /// The mandatory terminal catch-all.
    Always,

    /// field >= min
    NumberAtLeast { field: String, min: f64 },

    /// field < max
    NumberBelow { field: String, max: f64 },

    /// min <= field < max
    NumberInRange { field: String, min: f64, max: f64 },

    TextEquals { field: String, value: String },

    TextIn { field: String, values: Vec<String> },

    FlagIs { field: String, value: bool },

    /// Null or missing.
    IsNull { field: String },

    NotNull { field: String },

    All(Vec<Predicate>),

    Any(Vec<Predicate>),

    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eval(&self, fields: &FieldMap) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::NumberAtLeast { field, min } => {
                number(fields, field).map_or(false, |v| v >= *min)
            }
            Predicate::NumberBelow { field, max } => {
                number(fields, field).map_or(false, |v| v < *max)
            }
            Predicate::NumberInRange { field, min, max } => {
                number(fields, field).map_or(false, |v| v >= *min && v < *max)
            }
            Predicate::TextEquals { field, value } => {
                text(fields, field).map_or(false, |t| t == value)
            }
            Predicate::TextIn { field, values } => {
                text(fields, field).map_or(false, |t| values.iter().any(|v| v == t))
            }
            Predicate::FlagIs { field, value } => {
                flag(fields, field).map_or(false, |b| b == *value)
            }
            Predicate::IsNull { field } => {
                fields.get(field).map_or(true, FieldValue::is_null)
            }
            Predicate::NotNull { field } => {
                !fields.get(field).map_or(true, FieldValue::is_null)
            }
            Predicate::All(inner) => inner.iter().all(|p| p.eval(fields)),
            Predicate::Any(inner) => inner.iter().any(|p| p.eval(fields)),
            Predicate::Not(inner) => !inner.eval(fields),
        }
    }
}

fn number(fields: &FieldMap, field: &str) -> Option<f64> {
    fields.get(field).and_then(FieldValue::as_number)
}

fn text<'a>(fields: &'a FieldMap, field: &str) -> Option<&'a str> {
    fields.get(field).and_then(FieldValue::as_text)
}

fn flag(fields: &FieldMap, field: &str) -> Option<bool> {
    fields.get(field).and_then(FieldValue::as_flag)
}

// ============================================================================
// TIER CASCADE
// ============================================================================

/// One (predicate, tier) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRule {
    pub predicate: Predicate,
    pub tier: String,
}

impl TierRule {
    pub fn new(predicate: Predicate, tier: impl Into<String>) -> Self {
        TierRule {
            predicate,
            tier: tier.into(),
        }
    }
}

/// An ordered first-match-wins tier classifier.
///
/// Construction fails unless the final rule is `Always`, which guarantees
/// every record, all-null included, classifies into the declared tier
/// set. Compiled once per ruleset, never re-parsed per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCascade {
    pub name: String,
    rules: Vec<TierRule>,
}

impl TierCascade {
    pub fn new(name: impl Into<String>, rules: Vec<TierRule>) -> Result<Self> {
        let name = name.into();
        ensure!(!rules.is_empty(), "cascade '{}' has no rules", name);
        ensure!(
            rules
                .last()
                .map_or(false, |r| matches!(r.predicate, Predicate::Always)),
            "cascade '{}' must end in a catch-all rule",
            name
        );
        Ok(TierCascade { name, rules })
    }

    /// Load a cascade from a JSON rule file, re-validating the catch-all.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read cascade file: {:?}", path.as_ref()))?;
        let raw: TierCascade =
            serde_json::from_str(&content).context("Failed to parse cascade JSON")?;
        TierCascade::new(raw.name, raw.rules)
    }

    /// First matching rule wins. Total by construction.
    pub fn classify(&self, fields: &FieldMap) -> &str {
        for rule in &self.rules {
            if rule.predicate.eval(fields) {
                return &rule.tier;
            }
        }
        // Unreachable given the validated catch-all; the terminal tier is
        // still the right answer if it ever were
        &self.rules[self.rules.len() - 1].tier
    }

    /// The declared tier set, in rule order, deduplicated.
    pub fn tiers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for rule in &self.rules {
            if !seen.contains(&rule.tier.as_str()) {
                seen.push(rule.tier.as_str());
            }
        }
        seen
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// POINT CASCADE
// ============================================================================

/// One (predicate, points) pair inside a score bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRule {
    pub predicate: Predicate,
    pub points: f64,
}

impl PointRule {
    pub fn new(predicate: Predicate, points: f64) -> Self {
        PointRule { predicate, points }
    }
}

/// An ordered first-match-wins point selector: each bucket contributes a
/// fixed point value chosen by the first matching rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCascade {
    rules: Vec<PointRule>,
}

impl PointCascade {
    pub fn new(rules: Vec<PointRule>) -> Result<Self> {
        ensure!(!rules.is_empty(), "point cascade has no rules");
        ensure!(
            rules
                .last()
                .map_or(false, |r| matches!(r.predicate, Predicate::Always)),
            "point cascade must end in a catch-all rule"
        );
        Ok(PointCascade { rules })
    }

    pub fn points(&self, fields: &FieldMap) -> f64 {
        for rule in &self.rules {
            if rule.predicate.eval(fields) {
                return rule.points;
            }
        }
        self.rules[self.rules.len() - 1].points
    }

    /// Largest point value any rule can award.
    pub fn max_points(&self) -> f64 {
        self.rules.iter().fold(0.0_f64, |acc, r| acc.max(r.points))
    }
}

// ============================================================================
// SCORE CARD
// ============================================================================

/// How a score card's weights are validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreScale {
    /// Percentage-style: bucket weights must sum to 1.0.
    Weighted,

    /// Point-style: weighted bucket maxima must sum to the fixed maximum.
    Points { maximum: f64 },
}

/// One weighted attribute bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub name: String,
    pub weight: f64,
    pub points: PointCascade,
}

impl ScoreBucket {
    pub fn new(name: impl Into<String>, weight: f64, points: PointCascade) -> Self {
        ScoreBucket {
            name: name.into(),
            weight,
            points,
        }
    }
}

/// A weighted sum of per-bucket point cascades.
///
/// score = Σ weight × bucket points. Scale invariants are checked once at
/// construction: bad weights are a configuration defect, not a per-record
/// condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCard {
    pub name: String,
    pub scale: ScoreScale,
    buckets: Vec<ScoreBucket>,
}

impl ScoreCard {
    pub fn new(
        name: impl Into<String>,
        scale: ScoreScale,
        buckets: Vec<ScoreBucket>,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(!buckets.is_empty(), "score card '{}' has no buckets", name);
        for bucket in &buckets {
            ensure!(
                bucket.weight > 0.0,
                "score card '{}' bucket '{}' has non-positive weight {}",
                name,
                bucket.name,
                bucket.weight
            );
        }

        match scale {
            ScoreScale::Weighted => {
                let total: f64 = buckets.iter().map(|b| b.weight).sum();
                ensure!(
                    (total - 1.0).abs() <= WEIGHT_TOLERANCE,
                    "score card '{}' weights sum to {}, expected 1.0",
                    name,
                    total
                );
            }
            ScoreScale::Points { maximum } => {
                let total: f64 = buckets
                    .iter()
                    .map(|b| b.weight * b.points.max_points())
                    .sum();
                ensure!(
                    (total - maximum).abs() <= WEIGHT_TOLERANCE,
                    "score card '{}' bucket maxima sum to {}, expected {}",
                    name,
                    total,
                    maximum
                );
            }
        }

        Ok(ScoreCard {
            name,
            scale,
            buckets,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read score card file: {:?}", path.as_ref()))?;
        let raw: ScoreCard =
            serde_json::from_str(&content).context("Failed to parse score card JSON")?;
        ScoreCard::new(raw.name, raw.scale, raw.buckets)
    }

    pub fn score(&self, fields: &FieldMap) -> f64 {
        self.buckets
            .iter()
            .map(|b| b.weight * b.points.points(fields))
            .sum()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

// ============================================================================
// CASCADE CHAIN
// ============================================================================

/// One step of a fixed-order composition: classify, then write the tier
/// back into the field map under `output_field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeStep {
    pub output_field: String,
    pub cascade: TierCascade,
}

impl CascadeStep {
    pub fn new(output_field: impl Into<String>, cascade: TierCascade) -> Self {
        CascadeStep {
            output_field: output_field.into(),
            cascade,
        }
    }
}

/// Fixed-order cascade composition.
///
/// Because each step's output lands in the field map before the next step
/// runs, later cascades can predicate on earlier tiers (e.g. investment
/// quality consuming the performance tier). The ordered list makes circular
/// dependency impossible by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeChain {
    steps: Vec<CascadeStep>,
}

impl CascadeChain {
    pub fn new(steps: Vec<CascadeStep>) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::new();
        for step in &steps {
            ensure!(
                !seen.contains(&step.output_field.as_str()),
                "cascade chain writes '{}' twice",
                step.output_field
            );
            seen.push(&step.output_field);
        }
        Ok(CascadeChain { steps })
    }

    /// A chain with no steps (profiles that only score).
    pub fn empty() -> Self {
        CascadeChain { steps: Vec::new() }
    }

    /// Run every step in declared order, writing each tier into the field
    /// map, and return the tiers keyed by output field.
    pub fn apply(&self, fields: &mut FieldMap) -> BTreeMap<String, String> {
        let mut tiers = BTreeMap::new();
        for step in &self.steps {
            let tier = step.cascade.classify(fields).to_string();
            fields.insert(step.output_field.clone(), FieldValue::Text(tier.clone()));
            tiers.insert(step.output_field.clone(), tier);
        }
        tiers
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// One named score output: evaluate the card, then write the score back
/// into the field map under `output_field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreStep {
    pub output_field: String,
    pub card: ScoreCard,
}

impl ScoreStep {
    pub fn new(output_field: impl Into<String>, card: ScoreCard) -> Self {
        ScoreStep {
            output_field: output_field.into(),
            card,
        }
    }

    pub fn apply(&self, fields: &mut FieldMap) -> f64 {
        let score = self.card.score(fields);
        fields.insert(self.output_field.clone(), FieldValue::Number(score));
        score
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with_number(name: &str, value: f64) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(name.to_string(), FieldValue::Number(value));
        fields
    }

    fn size_cascade() -> TierCascade {
        TierCascade::new(
            "size",
            vec![
                TierRule::new(
                    Predicate::NumberAtLeast {
                        field: "amount".into(),
                        min: 1000.0,
                    },
                    "BIG",
                ),
                TierRule::new(
                    Predicate::NotNull {
                        field: "amount".into(),
                    },
                    "SMALL",
                ),
                TierRule::new(Predicate::Always, "UNKNOWN"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let cascade = size_cascade();

        assert_eq!(cascade.classify(&fields_with_number("amount", 5000.0)), "BIG");
        assert_eq!(cascade.classify(&fields_with_number("amount", 10.0)), "SMALL");
    }

    #[test]
    fn test_all_null_input_hits_catch_all() {
        let cascade = size_cascade();
        let empty = FieldMap::new();

        let tier = cascade.classify(&empty);
        assert_eq!(tier, "UNKNOWN");
        assert!(cascade.tiers().contains(&tier));
    }

    #[test]
    fn test_cascade_without_catch_all_fails_fast() {
        let result = TierCascade::new(
            "broken",
            vec![TierRule::new(
                Predicate::NumberAtLeast {
                    field: "amount".into(),
                    min: 0.0,
                },
                "SOME",
            )],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_empty_cascade_fails_fast() {
        assert!(TierCascade::new("empty", vec![]).is_err());
    }

    #[test]
    fn test_null_field_predicates() {
        let mut fields = FieldMap::new();
        fields.insert("note".into(), FieldValue::Null);

        // Numeric tests on null are false, null tests see both missing
        // keys and explicit nulls
        let at_least = Predicate::NumberAtLeast {
            field: "note".into(),
            min: 0.0,
        };
        assert!(!at_least.eval(&fields));
        assert!(Predicate::IsNull { field: "note".into() }.eval(&fields));
        assert!(Predicate::IsNull { field: "missing".into() }.eval(&fields));
        assert!(!Predicate::NotNull { field: "note".into() }.eval(&fields));
    }

    #[test]
    fn test_combinators() {
        let mut fields = FieldMap::new();
        fields.insert("tier".into(), FieldValue::Text("GOLD".into()));
        fields.insert("amount".into(), FieldValue::Number(50.0));

        let both = Predicate::All(vec![
            Predicate::TextIn {
                field: "tier".into(),
                values: vec!["GOLD".into(), "SILVER".into()],
            },
            Predicate::NumberAtLeast {
                field: "amount".into(),
                min: 25.0,
            },
        ]);
        assert!(both.eval(&fields));

        let negated = Predicate::Not(Box::new(both));
        assert!(!negated.eval(&fields));
    }

    #[test]
    fn test_score_card_weighted_sum() {
        let card = ScoreCard::new(
            "demo",
            ScoreScale::Weighted,
            vec![
                ScoreBucket::new(
                    "a",
                    0.6,
                    PointCascade::new(vec![
                        PointRule::new(
                            Predicate::FlagIs {
                                field: "ok".into(),
                                value: true,
                            },
                            100.0,
                        ),
                        PointRule::new(Predicate::Always, 0.0),
                    ])
                    .unwrap(),
                ),
                ScoreBucket::new(
                    "b",
                    0.4,
                    PointCascade::new(vec![PointRule::new(Predicate::Always, 50.0)]).unwrap(),
                ),
            ],
        )
        .unwrap();

        let mut fields = FieldMap::new();
        fields.insert("ok".into(), FieldValue::Flag(true));

        // 0.6 * 100 + 0.4 * 50
        assert!((card.score(&fields) - 80.0).abs() < 1e-9);

        // All-null still scores: 0.6 * 0 + 0.4 * 50
        assert!((card.score(&FieldMap::new()) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_card_rejects_bad_weights() {
        let bucket = ScoreBucket::new(
            "only",
            0.5,
            PointCascade::new(vec![PointRule::new(Predicate::Always, 100.0)]).unwrap(),
        );
        assert!(ScoreCard::new("bad", ScoreScale::Weighted, vec![bucket]).is_err());
    }

    #[test]
    fn test_points_card_validates_maximum() {
        let bucket = |max: f64| {
            ScoreBucket::new(
                "b",
                1.0,
                PointCascade::new(vec![
                    PointRule::new(
                        Predicate::NotNull {
                            field: "x".into(),
                        },
                        max,
                    ),
                    PointRule::new(Predicate::Always, 0.0),
                ])
                .unwrap(),
            )
        };

        assert!(ScoreCard::new(
            "ok",
            ScoreScale::Points { maximum: 100.0 },
            vec![bucket(60.0), bucket(40.0)]
        )
        .is_ok());

        assert!(ScoreCard::new(
            "short",
            ScoreScale::Points { maximum: 100.0 },
            vec![bucket(60.0)]
        )
        .is_err());
    }

    #[test]
    fn test_chain_feeds_later_steps() {
        let first = TierCascade::new(
            "first",
            vec![
                TierRule::new(
                    Predicate::NumberAtLeast {
                        field: "growth".into(),
                        min: 20.0,
                    },
                    "FAST",
                ),
                TierRule::new(Predicate::Always, "SLOW"),
            ],
        )
        .unwrap();

        // Second cascade consumes the first one's output tier
        let second = TierCascade::new(
            "second",
            vec![
                TierRule::new(
                    Predicate::TextEquals {
                        field: "pace_tier".into(),
                        value: "FAST".into(),
                    },
                    "PRIORITY",
                ),
                TierRule::new(Predicate::Always, "STANDARD"),
            ],
        )
        .unwrap();

        let chain = CascadeChain::new(vec![
            CascadeStep::new("pace_tier", first),
            CascadeStep::new("routing_tier", second),
        ])
        .unwrap();

        let mut fields = fields_with_number("growth", 35.0);
        let tiers = chain.apply(&mut fields);

        assert_eq!(tiers["pace_tier"], "FAST");
        assert_eq!(tiers["routing_tier"], "PRIORITY");
    }

    #[test]
    fn test_chain_rejects_duplicate_outputs() {
        let cascade = size_cascade();
        let result = CascadeChain::new(vec![
            CascadeStep::new("tier", cascade.clone()),
            CascadeStep::new("tier", cascade),
        ]);
        assert!(result.is_err());
    }
}

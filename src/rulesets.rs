// 📋 Built-in Rule Tables - The concrete classification and scoring schemes
// Each scheme ships as one explicit named table with literal weights and
// cut-points. Near-identical schemes stay separate on purpose: their small
// variations are business intent, not accidents, and must not be unified.

use crate::cascade::{
    PointCascade, PointRule, Predicate, ScoreBucket, ScoreCard, ScoreScale, TierCascade, TierRule,
};
use anyhow::Result;

// ============================================================================
// CUT-POINTS
// ============================================================================

/// LARGE_INVESTMENT floor (USD cost basis).
pub const LARGE_INVESTMENT_FLOOR_USD: f64 = 25_000_000.0;

/// MEDIUM_INVESTMENT floor (USD cost basis); below this is SMALL.
pub const MEDIUM_INVESTMENT_FLOOR_USD: f64 = 1_000_000.0;

/// STRATEGIC_PARTNER commitment floor (USD).
pub const STRATEGIC_COMMITMENT_FLOOR_USD: f64 = 100_000_000.0;

/// KEY_INSTITUTIONAL commitment floor (USD).
pub const KEY_COMMITMENT_FLOOR_USD: f64 = 25_000_000.0;

/// CORE commitment floor (USD).
pub const CORE_COMMITMENT_FLOOR_USD: f64 = 5_000_000.0;

// Small constructors to keep the rule tables readable as tables.

fn at_least(field: &str, min: f64) -> Predicate {
    Predicate::NumberAtLeast {
        field: field.to_string(),
        min,
    }
}

fn below(field: &str, max: f64) -> Predicate {
    Predicate::NumberBelow {
        field: field.to_string(),
        max,
    }
}

fn not_null(field: &str) -> Predicate {
    Predicate::NotNull {
        field: field.to_string(),
    }
}

fn text_eq(field: &str, value: &str) -> Predicate {
    Predicate::TextEquals {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn text_in(field: &str, values: &[&str]) -> Predicate {
    Predicate::TextIn {
        field: field.to_string(),
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

fn flag_is(field: &str, value: bool) -> Predicate {
    Predicate::FlagIs {
        field: field.to_string(),
        value,
    }
}

fn all(preds: Vec<Predicate>) -> Predicate {
    Predicate::All(preds)
}

// ============================================================================
// TIER CASCADES
// ============================================================================

/// Investment size bands over the USD cost basis.
///
/// | cut-point                  | tier              |
/// |----------------------------|-------------------|
/// | cost_basis_usd >= 25M      | LARGE_INVESTMENT  |
/// | cost_basis_usd >= 1M       | MEDIUM_INVESTMENT |
/// | cost_basis_usd present     | SMALL_INVESTMENT  |
/// | otherwise                  | UNKNOWN           |
pub fn investment_size_category() -> Result<TierCascade> {
    TierCascade::new(
        "investment_size_category",
        vec![
            TierRule::new(
                at_least("cost_basis_usd", LARGE_INVESTMENT_FLOOR_USD),
                "LARGE_INVESTMENT",
            ),
            TierRule::new(
                at_least("cost_basis_usd", MEDIUM_INVESTMENT_FLOOR_USD),
                "MEDIUM_INVESTMENT",
            ),
            TierRule::new(not_null("cost_basis_usd"), "SMALL_INVESTMENT"),
            TierRule::new(Predicate::Always, "UNKNOWN"),
        ],
    )
}

/// Company performance over year-over-year revenue growth and EBITDA margin.
///
/// | cut-point                                   | tier            |
/// |---------------------------------------------|-----------------|
/// | growth >= 30% and margin >= 20%             | TOP_PERFORMER   |
/// | growth >= 15%                               | OUTPERFORMING   |
/// | growth >= 0%                                | ON_TRACK        |
/// | growth present (i.e. negative)              | UNDERPERFORMING |
/// | growth absent                               | INCOMPLETE_DATA |
pub fn company_performance_tier() -> Result<TierCascade> {
    TierCascade::new(
        "company_performance_tier",
        vec![
            TierRule::new(
                all(vec![
                    at_least("revenue_growth_pct", 30.0),
                    at_least("ebitda_margin_pct", 20.0),
                ]),
                "TOP_PERFORMER",
            ),
            TierRule::new(at_least("revenue_growth_pct", 15.0), "OUTPERFORMING"),
            TierRule::new(at_least("revenue_growth_pct", 0.0), "ON_TRACK"),
            TierRule::new(not_null("revenue_growth_pct"), "UNDERPERFORMING"),
            TierRule::new(Predicate::Always, "INCOMPLETE_DATA"),
        ],
    )
}

/// Investment quality. Consumes the output tier of `company_performance_tier`
/// plus the USD unrealized return multiple, so it must run after the
/// performance cascade in the chain.
///
/// | cut-point                                                | tier            |
/// |----------------------------------------------------------|-----------------|
/// | performance in {TOP_PERFORMER, OUTPERFORMING}, mult >= 2 | HIGH_CONVICTION |
/// | mult >= 1 and performance not UNDERPERFORMING            | PERFORMING      |
/// | mult present                                             | WATCH_LIST      |
/// | otherwise                                                | INCOMPLETE_DATA |
pub fn investment_quality_tier() -> Result<TierCascade> {
    TierCascade::new(
        "investment_quality_tier",
        vec![
            TierRule::new(
                all(vec![
                    text_in(
                        "company_performance_tier",
                        &["TOP_PERFORMER", "OUTPERFORMING"],
                    ),
                    at_least("unrealized_return_multiple_usd", 2.0),
                ]),
                "HIGH_CONVICTION",
            ),
            TierRule::new(
                all(vec![
                    at_least("unrealized_return_multiple_usd", 1.0),
                    Predicate::Not(Box::new(text_eq(
                        "company_performance_tier",
                        "UNDERPERFORMING",
                    ))),
                ]),
                "PERFORMING",
            ),
            TierRule::new(not_null("unrealized_return_multiple_usd"), "WATCH_LIST"),
            TierRule::new(Predicate::Always, "INCOMPLETE_DATA"),
        ],
    )
}

/// Investor tiers over total USD commitment.
///
/// | cut-point             | tier              |
/// |-----------------------|-------------------|
/// | commitment >= 100M    | STRATEGIC_PARTNER |
/// | commitment >= 25M     | KEY_INSTITUTIONAL |
/// | commitment >= 5M      | CORE              |
/// | commitment present    | EMERGING          |
/// | otherwise             | UNCLASSIFIED      |
pub fn investor_tier() -> Result<TierCascade> {
    TierCascade::new(
        "investor_tier",
        vec![
            TierRule::new(
                at_least("total_commitment_usd", STRATEGIC_COMMITMENT_FLOOR_USD),
                "STRATEGIC_PARTNER",
            ),
            TierRule::new(
                at_least("total_commitment_usd", KEY_COMMITMENT_FLOOR_USD),
                "KEY_INSTITUTIONAL",
            ),
            TierRule::new(
                at_least("total_commitment_usd", CORE_COMMITMENT_FLOOR_USD),
                "CORE",
            ),
            TierRule::new(not_null("total_commitment_usd"), "EMERGING"),
            TierRule::new(Predicate::Always, "UNCLASSIFIED"),
        ],
    )
}

// ============================================================================
// SCORE CARDS
// ============================================================================

/// Transaction quality score, 0-100. Percentage-style weights:
/// identity 0.30, conversion 0.25, completeness 0.25, recency 0.20.
pub fn transaction_quality_score() -> Result<ScoreCard> {
    let identity = PointCascade::new(vec![
        PointRule::new(flag_is("identity_matched", true), 100.0),
        // Placeholder identities still materialize but score low
        PointRule::new(Predicate::Always, 40.0),
    ])?;

    let conversion = PointCascade::new(vec![
        PointRule::new(flag_is("fx_rate_missing", true), 30.0),
        // Converted or already in the base currency both get full credit
        PointRule::new(Predicate::Always, 100.0),
    ])?;

    let completeness = PointCascade::new(vec![
        PointRule::new(
            all(vec![
                not_null("amount"),
                not_null("currency"),
                not_null("effective_date"),
            ]),
            100.0,
        ),
        PointRule::new(not_null("amount"), 60.0),
        PointRule::new(Predicate::Always, 20.0),
    ])?;

    let recency = PointCascade::new(vec![
        PointRule::new(below("record_age_days", 90.0), 100.0),
        PointRule::new(below("record_age_days", 365.0), 70.0),
        PointRule::new(not_null("record_age_days"), 40.0),
        PointRule::new(Predicate::Always, 10.0),
    ])?;

    ScoreCard::new(
        "transaction_quality_score",
        ScoreScale::Weighted,
        vec![
            ScoreBucket::new("identity", 0.30, identity),
            ScoreBucket::new("conversion", 0.25, conversion),
            ScoreBucket::new("completeness", 0.25, completeness),
            ScoreBucket::new("recency", 0.20, recency),
        ],
    )
}

/// Distribution tax efficiency, point-style, max 100:
/// character 60 + holding period 25 + withholding 15.
pub fn distribution_tax_efficiency_score() -> Result<ScoreCard> {
    let character = PointCascade::new(vec![
        PointRule::new(text_eq("distribution_type", "RETURN_OF_CAPITAL"), 60.0),
        PointRule::new(text_eq("distribution_type", "LONG_TERM_GAIN"), 45.0),
        PointRule::new(text_eq("distribution_type", "QUALIFIED_DIVIDEND"), 30.0),
        PointRule::new(text_eq("distribution_type", "SHORT_TERM_GAIN"), 15.0),
        // Ordinary income and unrecognized characters earn nothing
        PointRule::new(Predicate::Always, 0.0),
    ])?;

    let holding = PointCascade::new(vec![
        PointRule::new(at_least("holding_period_months", 36.0), 25.0),
        PointRule::new(at_least("holding_period_months", 12.0), 15.0),
        PointRule::new(not_null("holding_period_months"), 5.0),
        PointRule::new(Predicate::Always, 0.0),
    ])?;

    let withholding = PointCascade::new(vec![
        PointRule::new(below("withholding_rate_pct", 0.01), 15.0),
        PointRule::new(below("withholding_rate_pct", 15.0), 8.0),
        PointRule::new(not_null("withholding_rate_pct"), 2.0),
        PointRule::new(Predicate::Always, 0.0),
    ])?;

    ScoreCard::new(
        "distribution_tax_efficiency_score",
        ScoreScale::Points { maximum: 100.0 },
        vec![
            ScoreBucket::new("character", 1.0, character),
            ScoreBucket::new("holding_period", 1.0, holding),
            ScoreBucket::new("withholding", 1.0, withholding),
        ],
    )
}

/// Relationship completeness for CRM investor records, 0-100.
/// Weights: contact 0.40, activity 0.30, commitment 0.30.
pub fn relationship_completeness_score() -> Result<ScoreCard> {
    let contact = PointCascade::new(vec![
        PointRule::new(
            all(vec![not_null("primary_contact"), not_null("contact_email")]),
            100.0,
        ),
        PointRule::new(not_null("primary_contact"), 60.0),
        PointRule::new(Predicate::Always, 0.0),
    ])?;

    let activity = PointCascade::new(vec![
        PointRule::new(below("record_age_days", 180.0), 100.0),
        PointRule::new(below("record_age_days", 540.0), 50.0),
        PointRule::new(not_null("record_age_days"), 20.0),
        PointRule::new(Predicate::Always, 0.0),
    ])?;

    let commitment = PointCascade::new(vec![
        PointRule::new(not_null("total_commitment_usd"), 100.0),
        PointRule::new(Predicate::Always, 0.0),
    ])?;

    ScoreCard::new(
        "relationship_completeness_score",
        ScoreScale::Weighted,
        vec![
            ScoreBucket::new("contact", 0.40, contact),
            ScoreBucket::new("activity", 0.30, activity),
            ScoreBucket::new("commitment", 0.30, commitment),
        ],
    )
}

// ============================================================================
// TESTS
// ============================================================================

// 🗂️ Built-in Entity Profiles - Field wiring per vendor table
// One profile per entity/event kind, combining the shared engine with the
// named rule tables. These replace the per-model transformation scripts
// that used to duplicate resolution/conversion/classification logic.

use crate::cascade::{CascadeChain, CascadeStep, ScoreStep};
use crate::model::EntityKind;
use crate::pipeline::{EntityProfile, TrendConfig};
use crate::rulesets;
use anyhow::Result;

/// Portfolio investments: cost basis and fair value in the deal currency,
/// classified by size and quality. The quality cascade consumes the
/// performance tier, so performance must run first in the chain.
pub fn investment() -> Result<EntityProfile> {
    let chain = CascadeChain::new(vec![
        CascadeStep::new(
            "company_performance_tier",
            rulesets::company_performance_tier()?,
        ),
        CascadeStep::new(
            "investment_size_category",
            rulesets::investment_size_category()?,
        ),
        CascadeStep::new(
            "investment_quality_tier",
            rulesets::investment_quality_tier()?,
        ),
    ])?;

    Ok(EntityProfile::new("investment", EntityKind::Company)
        .with_amount_field("cost_basis")
        .with_amount_field("fair_value")
        .with_gain_ratio(
            "unrealized_return_multiple_usd",
            "fair_value_usd",
            "cost_basis_usd",
        )
        .with_age_field("valuation_date")
        .with_chain(chain)
        .with_score(ScoreStep::new(
            "transaction_quality_score",
            rulesets::transaction_quality_score()?,
        ))
        .with_primary_score("transaction_quality_score")
        .with_fingerprint_fields(&[
            "canonical_id",
            "cost_basis_usd",
            "fair_value_usd",
            "unrealized_return_multiple_usd",
            "company_performance_tier",
            "investment_size_category",
            "investment_quality_tier",
        ]))
}

/// Fund NAV snapshots: one row per fund per reporting period, with the
/// year-over-year trend computed inside each fund's partition.
pub fn nav_snapshot() -> Result<EntityProfile> {
    Ok(EntityProfile::new("nav_snapshot", EntityKind::Fund)
        .with_amount_field("nav")
        .with_trend(TrendConfig {
            year_field: "report_year".to_string(),
            quarter_field: "report_quarter".to_string(),
            value_field: "nav_usd".to_string(),
            growth_field: "nav_yoy_growth_pct".to_string(),
        })
        .with_score(ScoreStep::new(
            "transaction_quality_score",
            rulesets::transaction_quality_score()?,
        ))
        .with_primary_score("transaction_quality_score")
        .with_fingerprint_fields(&[
            "canonical_id",
            "nav_usd",
            "nav_yoy_growth_pct",
            "report_year",
            "report_quarter",
        ])
        .with_key_fields(&["report_year", "report_quarter"]))
}

/// Fund distributions: amount plus tax character, scored for both data
/// quality and tax efficiency.
pub fn distribution() -> Result<EntityProfile> {
    Ok(EntityProfile::new("distribution", EntityKind::Fund)
        .with_amount_field("amount")
        .with_age_field("effective_date")
        .with_score(ScoreStep::new(
            "transaction_quality_score",
            rulesets::transaction_quality_score()?,
        ))
        .with_score(ScoreStep::new(
            "tax_efficiency_score",
            rulesets::distribution_tax_efficiency_score()?,
        ))
        .with_primary_score("transaction_quality_score")
        .with_fingerprint_fields(&[
            "canonical_id",
            "amount_usd",
            "distribution_type",
            "effective_date",
            "tax_efficiency_score",
        ]))
}

/// CRM investor records: commitment-based tiering plus relationship
/// completeness.
pub fn investor() -> Result<EntityProfile> {
    let chain = CascadeChain::new(vec![CascadeStep::new(
        "investor_tier",
        rulesets::investor_tier()?,
    )])?;

    Ok(EntityProfile::new("investor", EntityKind::Investor)
        .with_amount_field("total_commitment")
        .with_age_field("last_activity_date")
        .with_chain(chain)
        .with_score(ScoreStep::new(
            "relationship_completeness_score",
            rulesets::relationship_completeness_score()?,
        ))
        .with_primary_score("relationship_completeness_score")
        .with_fingerprint_fields(&[
            "canonical_id",
            "total_commitment_usd",
            "investor_tier",
            "primary_contact",
            "contact_email",
        ]))
}

/// Portfolio-monitoring company records: performance tiering over metrics
/// the window engine has already attached upstream.
pub fn company() -> Result<EntityProfile> {
    let chain = CascadeChain::new(vec![CascadeStep::new(
        "company_performance_tier",
        rulesets::company_performance_tier()?,
    )])?;

    Ok(EntityProfile::new("company", EntityKind::Company)
        .with_amount_field("revenue")
        .with_amount_field("ebitda")
        .with_chain(chain)
        .with_score(ScoreStep::new(
            "transaction_quality_score",
            rulesets::transaction_quality_score()?,
        ))
        .with_primary_score("transaction_quality_score")
        .with_fingerprint_fields(&[
            "canonical_id",
            "revenue_usd",
            "ebitda_usd",
            "revenue_growth_pct",
            "company_performance_tier",
        ]))
}

/// Counterparty records. Arbitrary cardinality: the source may carry one
/// row or thousands, nothing here assumes a count.
pub fn counterparty() -> Result<EntityProfile> {
    Ok(EntityProfile::new("counterparty", EntityKind::Counterparty)
        .with_amount_field("exposure")
        .with_score(ScoreStep::new(
            "transaction_quality_score",
            rulesets::transaction_quality_score()?,
        ))
        .with_primary_score("transaction_quality_score")
        .with_fingerprint_fields(&["canonical_id", "exposure_usd", "counterparty_type"]))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{field_number, EntityKind, FieldValue, SourceRecord};
    use crate::pipeline::{NormalizationPipeline, RunContext};
    use crate::rates::{ExchangeRate, RateTable};
    use crate::xref::{CrossReferenceEntry, MatchQuality};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_builtin_profiles_construct() {
        assert!(investment().is_ok());
        assert!(nav_snapshot().is_ok());
        assert!(distribution().is_ok());
        assert!(investor().is_ok());
        assert!(company().is_ok());
        assert!(counterparty().is_ok());
    }

    #[test]
    fn test_investment_scenario_eur_to_usd() {
        // Cost basis 1,000,000 EUR, fair value 2,500,000 EUR, EUR->USD 1.08
        let rates = RateTable::from_rates(vec![ExchangeRate::new(
            "EUR",
            "USD",
            1.08,
            date(2024, 6, 30),
        )])
        .unwrap();

        let mut xref = HashMap::new();
        xref.insert(
            EntityKind::Company,
            vec![CrossReferenceEntry::new(
                "PORTFOLIO",
                "C-9",
                "COMPANY-0009",
                MatchQuality::HighQuality,
            )],
        );

        let pipeline =
            NormalizationPipeline::new(RunContext::new(date(2024, 6, 30)), rates, xref);
        let profile = investment().unwrap();

        let record = SourceRecord::new("PORTFOLIO", "C-9", EntityKind::Company)
            .with_field("currency", FieldValue::Text("EUR".into()))
            .with_field("cost_basis", FieldValue::Number(1_000_000.0))
            .with_field("fair_value", FieldValue::Number(2_500_000.0))
            .with_field("valuation_date", FieldValue::Date(date(2024, 6, 30)));

        let out = pipeline.process(&profile, &record);

        assert_eq!(field_number(&out.fields, "cost_basis_usd"), Some(1_080_000.0));
        assert_eq!(field_number(&out.fields, "fair_value_usd"), Some(2_700_000.0));

        let multiple = field_number(&out.fields, "unrealized_return_multiple_usd").unwrap();
        assert!((multiple - 1.5).abs() < 1e-9);

        // 1.08M sits in the 1M-25M band
        assert_eq!(out.tier("investment_size_category"), Some("MEDIUM_INVESTMENT"));
        // No growth metrics on the record: performance is INCOMPLETE_DATA,
        // but the 1.5x multiple still marks the position PERFORMING
        assert_eq!(out.tier("company_performance_tier"), Some("INCOMPLETE_DATA"));
        assert_eq!(out.tier("investment_quality_tier"), Some("PERFORMING"));
    }

    #[test]
    fn test_investor_profile_tiers_on_converted_commitment() {
        let rates = RateTable::from_rates(vec![ExchangeRate::new(
            "EUR",
            "USD",
            1.10,
            date(2024, 1, 1),
        )])
        .unwrap();

        let pipeline = NormalizationPipeline::new(
            RunContext::new(date(2024, 6, 30)),
            rates,
            HashMap::new(),
        );
        let profile = investor().unwrap();

        // 100M EUR converts to 110M USD: STRATEGIC_PARTNER
        let record = SourceRecord::new("CRM", "I-1", EntityKind::Investor)
            .with_field("currency", FieldValue::Text("EUR".into()))
            .with_field("total_commitment", FieldValue::Number(100_000_000.0));

        let out = pipeline.process(&profile, &record);
        assert_eq!(out.tier("investor_tier"), Some("STRATEGIC_PARTNER"));
        // Unmatched CRM id falls to a deterministic placeholder
        assert_eq!(out.canonical_id, "INVESTOR-UNKNOWN-I-1");
    }

    #[test]
    fn test_distribution_profile_scores_both_cards() {
        let pipeline = NormalizationPipeline::new(
            RunContext::new(date(2024, 6, 30)),
            RateTable::new(),
            HashMap::new(),
        );
        let profile = distribution().unwrap();

        let record = SourceRecord::new("FUND_ADMIN", "D-1", EntityKind::Fund)
            .with_field("currency", FieldValue::Text("USD".into()))
            .with_field("amount", FieldValue::Number(500_000.0))
            .with_field("effective_date", FieldValue::Date(date(2024, 5, 15)))
            .with_field(
                "distribution_type",
                FieldValue::Text("RETURN_OF_CAPITAL".into()),
            )
            .with_field("holding_period_months", FieldValue::Number(48.0))
            .with_field("withholding_rate_pct", FieldValue::Number(0.0));

        let out = pipeline.process(&profile, &record);

        let tax = field_number(&out.fields, "tax_efficiency_score").unwrap();
        assert!((tax - 100.0).abs() < 1e-9);
        // Primary score is the quality card
        assert!(out.score > 0.0);
        assert_eq!(
            field_number(&out.fields, "transaction_quality_score"),
            Some(out.score)
        );
    }
}

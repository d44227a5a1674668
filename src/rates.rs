// 💱 Rate Table - Point-in-time exchange rate selection
// The table is a run-scoped, read-only time series. Selection never uses a
// rate dated after the as-of date, and same-currency pairs convert at an
// implicit 1.0 without a lookup.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// EXCHANGE RATE
// ============================================================================

/// One observed rate for a currency pair on a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,

    /// Multiplier applied to amounts in `from_currency`. Always > 0.
    pub rate: f64,

    pub rate_date: NaiveDate,
}

impl ExchangeRate {
    pub fn new(
        from_currency: impl Into<String>,
        to_currency: impl Into<String>,
        rate: f64,
        rate_date: NaiveDate,
    ) -> Self {
        ExchangeRate {
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
            rate,
            rate_date,
        }
    }
}

// ============================================================================
// RATE TABLE
// ============================================================================

/// Insertion-ordered collection of rates for all currency pairs.
///
/// Multiple rates may exist for the same pair at different dates; selection
/// picks the most recent one not later than the as-of date. Date ties keep
/// the earliest-inserted rate, so selection is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateTable {
    rates: Vec<ExchangeRate>,
}

impl RateTable {
    pub fn new() -> Self {
        RateTable { rates: Vec::new() }
    }

    /// Insert a rate, rejecting non-positive values up front. A bad rate is
    /// a reference-data defect and must fail the load, not poison records.
    pub fn insert(&mut self, rate: ExchangeRate) -> Result<()> {
        ensure!(
            rate.rate > 0.0,
            "exchange rate must be positive: {} -> {} = {} on {}",
            rate.from_currency,
            rate.to_currency,
            rate.rate,
            rate.rate_date
        );
        self.rates.push(rate);
        Ok(())
    }

    pub fn from_rates(rates: Vec<ExchangeRate>) -> Result<Self> {
        let mut table = RateTable::new();
        for rate in rates {
            table.insert(rate)?;
        }
        Ok(table)
    }

    /// Select the applicable rate for (from, to) as of a date.
    ///
    /// - from == to returns 1.0 without consulting the table
    /// - candidates are exact pair matches with rate_date <= as_of
    /// - the maximum rate_date wins; ties keep the first inserted
    /// - no candidate → None, which callers treat as "unconverted"
    pub fn select(&self, from: &str, to: &str, as_of: NaiveDate) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }

        let mut best: Option<&ExchangeRate> = None;
        for candidate in &self.rates {
            if candidate.from_currency != from
                || candidate.to_currency != to
                || candidate.rate_date > as_of
            {
                continue;
            }
            match best {
                Some(current) if candidate.rate_date <= current.rate_date => {}
                _ => best = Some(candidate),
            }
        }

        best.map(|r| r.rate)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

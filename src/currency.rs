// 💵 Currency Normalizer - Uniform base-currency conversion per record
// One rate is selected per record currency and applied to every monetary
// field, so fields sharing a currency tag can never drift apart.
//
// A missing rate never drops a value: originals are carried through
// unchanged with converted = false and an FX_RATE_MISSING flag.

use crate::model::{DataFlag, FieldMap, FieldValue};
use crate::rates::RateTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONVERSION OUTCOME
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// True iff at least one field actually required and received a
    /// conversion. Base-currency records are "unconverted" by definition.
    pub converted: bool,

    /// The single rate applied across all fields, when one was found.
    pub rate_used: Option<f64>,

    /// FX_RATE_MISSING or INCOMPLETE_DATA, when applicable.
    pub flags: Vec<DataFlag>,
}

impl ConversionOutcome {
    fn unconverted() -> Self {
        ConversionOutcome {
            converted: false,
            rate_used: None,
            flags: Vec::new(),
        }
    }
}

/// Suffix for converted fields: "cost_basis" -> "cost_basis_usd" under a
/// USD base.
pub fn converted_field_name(field: &str, base_currency: &str) -> String {
    format!("{}_{}", field, base_currency.to_lowercase())
}

// ============================================================================
// CONVERSION
// ============================================================================

/// Convert a record's monetary fields into the base currency.
///
/// For each field F in `amount_fields` a sibling `F_{base}` is written:
/// - record currency == base → the original value, converted = false
/// - a rate exists          → original × rate for every non-null field
/// - no rate                → the original value, converted = false,
///                            flag FX_RATE_MISSING
/// - currency tag null/missing while any amount is present → originals
///   carried through, flag INCOMPLETE_DATA
///
/// Null amount fields stay null in the converted sibling.
pub fn convert_amounts(
    fields: &mut FieldMap,
    currency_field: &str,
    amount_fields: &[String],
    base_currency: &str,
    rates: &RateTable,
    as_of: NaiveDate,
) -> ConversionOutcome {
    let currency = fields
        .get(currency_field)
        .and_then(FieldValue::as_text)
        .map(str::to_owned);

    let any_amount_present = amount_fields
        .iter()
        .any(|f| fields.get(f).and_then(FieldValue::as_number).is_some());

    let currency = match currency {
        Some(c) => c,
        None => {
            copy_originals(fields, amount_fields, base_currency);
            let mut outcome = ConversionOutcome::unconverted();
            if any_amount_present {
                outcome.flags.push(DataFlag::IncompleteData);
            }
            return outcome;
        }
    };

    if currency == base_currency {
        copy_originals(fields, amount_fields, base_currency);
        return ConversionOutcome::unconverted();
    }

    match rates.select(&currency, base_currency, as_of) {
        Some(rate) => {
            let mut converted_any = false;
            for field in amount_fields {
                let target = converted_field_name(field, base_currency);
                match fields.get(field).and_then(FieldValue::as_number) {
                    Some(value) => {
                        fields.insert(target, FieldValue::Number(value * rate));
                        converted_any = true;
                    }
                    None => {
                        fields.insert(target, FieldValue::Null);
                    }
                }
            }
            ConversionOutcome {
                converted: converted_any,
                rate_used: Some(rate),
                flags: Vec::new(),
            }
        }
        None => {
            copy_originals(fields, amount_fields, base_currency);
            let mut outcome = ConversionOutcome::unconverted();
            outcome.flags.push(DataFlag::FxRateMissing);
            outcome
        }
    }
}

/// Carry original values into the converted siblings unchanged.
fn copy_originals(fields: &mut FieldMap, amount_fields: &[String], base_currency: &str) {
    for field in amount_fields {
        let target = converted_field_name(field, base_currency);
        let original = fields.get(field).cloned().unwrap_or(FieldValue::Null);
        fields.insert(target, original);
    }
}

// ============================================================================
// TESTS
// ============================================================================

// 📂 Reference & Record Loaders - CSV boundary into the engine
// Loads the run's reference snapshots (rates, cross-references) and the
// sanitized source-record files. This is the in-repo stand-in for the
// external sanitizer: rows missing their vendor identifier are rejected
// here, at the boundary, and never reach the engine.

use crate::model::{EntityKind, FieldMap, FieldValue, SourceRecord};
use crate::rates::{ExchangeRate, RateTable};
use crate::xref::{CrossReferenceEntry, MatchQuality};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// EXCHANGE RATES
// ============================================================================

/// Load a rate table from CSV with columns:
/// from_currency, to_currency, rate, rate_date (YYYY-MM-DD).
///
/// A non-positive rate fails the load: bad reference data is a run-level
/// defect, not a per-record condition.
pub fn load_exchange_rates(path: &Path) -> Result<RateTable> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open rate file: {:?}", path))?;

    let mut table = RateTable::new();
    for (i, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read rate row {}", i + 1))?;
        let from = row.get(0).unwrap_or("").trim();
        let to = row.get(1).unwrap_or("").trim();
        let rate: f64 = row
            .get(2)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("Bad rate value in row {}", i + 1))?;
        let rate_date = parse_date(row.get(3).unwrap_or("").trim())
            .with_context(|| format!("Bad rate date in row {}", i + 1))?;

        table.insert(ExchangeRate::new(from, to, rate, rate_date))?;
    }

    Ok(table)
}

// ============================================================================
// CROSS-REFERENCES
// ============================================================================

/// Load cross-reference entries from CSV with columns:
/// entity_kind, vendor, vendor_id, canonical_id, quality.
///
/// Entries are grouped per entity kind with file order preserved, so
/// first-acceptable-entry-wins resolution matches the file. Unrecognized
/// quality labels become UNRESOLVED (excluded from resolution, kept in
/// the table).
pub fn load_cross_references(
    path: &Path,
) -> Result<HashMap<EntityKind, Vec<CrossReferenceEntry>>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open cross-reference file: {:?}", path))?;

    let mut by_kind: HashMap<EntityKind, Vec<CrossReferenceEntry>> = HashMap::new();
    for (i, result) in rdr.records().enumerate() {
        let row =
            result.with_context(|| format!("Failed to read cross-reference row {}", i + 1))?;
        let kind_label = row.get(0).unwrap_or("").trim();
        let kind = EntityKind::parse(kind_label)
            .with_context(|| format!("Unknown entity kind '{}' in row {}", kind_label, i + 1))?;

        let entry = CrossReferenceEntry::new(
            row.get(1).unwrap_or("").trim(),
            row.get(2).unwrap_or("").trim(),
            row.get(3).unwrap_or("").trim(),
            MatchQuality::parse(row.get(4).unwrap_or("").trim()),
        );

        by_kind.entry(kind).or_default().push(entry);
    }

    Ok(by_kind)
}

// ============================================================================
// SOURCE RECORDS
// ============================================================================

/// Result of a source-record load, with the sanitizer boundary's reject
/// count alongside the accepted rows.
#[derive(Debug)]
pub struct SourceLoad {
    pub records: Vec<SourceRecord>,
    pub rejected: usize,
}

/// Load sanitized source records from a headered CSV.
///
/// The column named by `id_column` supplies the vendor ID; every other
/// column becomes a typed field. Rows with an empty vendor ID are rejected
/// and counted; malformed input stops at this boundary.
pub fn load_source_records(
    path: &Path,
    vendor: &str,
    kind: EntityKind,
    id_column: &str,
) -> Result<SourceLoad> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open record file: {:?}", path))?;

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let mut records = Vec::new();
    let mut rejected = 0;

    for (i, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read record row {}", i + 1))?;

        let mut vendor_id = None;
        let mut fields = FieldMap::new();
        for (header, raw) in headers.iter().zip(row.iter()) {
            if header == id_column {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    vendor_id = Some(trimmed.to_string());
                }
            } else {
                fields.insert(header.to_string(), parse_cell(raw.trim()));
            }
        }

        match vendor_id {
            Some(id) => records.push(SourceRecord {
                vendor: vendor.to_string(),
                vendor_id: id,
                entity_kind: kind,
                fields,
            }),
            None => rejected += 1,
        }
    }

    Ok(SourceLoad { records, rejected })
}

/// Infer the typed value of one CSV cell: empty → null, then flag, number,
/// ISO date, and finally text.
fn parse_cell(raw: &str) -> FieldValue {
    if raw.is_empty() {
        return FieldValue::Null;
    }
    match raw {
        "true" => return FieldValue::Flag(true),
        "false" => return FieldValue::Flag(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<f64>() {
        return FieldValue::Number(n);
    }
    if let Ok(d) = parse_date(raw) {
        return FieldValue::Date(d);
    }
    FieldValue::Text(raw.to_string())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Expected YYYY-MM-DD date, got '{}'", raw))
}

// ============================================================================
// TESTS
// ============================================================================

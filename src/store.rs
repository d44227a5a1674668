// 🗄️ Output Store - Incremental materialization of normalized records
// SQLite-backed, keyed by the stable record key. The fingerprint column is
// what makes reprocessing idempotent: unchanged rows are skipped, changed
// rows replaced, and the caller gets the counts.

use crate::model::NormalizedRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

// ============================================================================
// STORE STATS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_store(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS normalized_records (
            record_key TEXT PRIMARY KEY,
            vendor TEXT NOT NULL,
            vendor_id TEXT NOT NULL,
            entity_kind TEXT NOT NULL,
            canonical_id TEXT NOT NULL,
            identity_matched INTEGER NOT NULL,
            converted INTEGER NOT NULL,
            fx_rate_used REAL,
            score REAL NOT NULL,
            tiers TEXT NOT NULL,
            flags TEXT NOT NULL,
            fields TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            run_id TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_canonical_id ON normalized_records(canonical_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fingerprint ON normalized_records(fingerprint)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// INCREMENTAL UPSERT
// ============================================================================

/// Write a batch, skipping rows whose stored fingerprint already matches.
pub fn upsert_changed(conn: &Connection, records: &[NormalizedRecord]) -> Result<StoreStats> {
    let mut stats = StoreStats::default();
    let now = Utc::now().to_rfc3339();

    for record in records {
        let existing: Option<String> = conn
            .query_row(
                "SELECT fingerprint FROM normalized_records WHERE record_key = ?1",
                params![record.record_key],
                |row| row.get(0),
            )
            .optional()?;

        match existing.as_deref() {
            Some(stored) if stored == record.fingerprint => {
                stats.unchanged += 1;
                continue;
            }
            Some(_) => stats.updated += 1,
            None => stats.inserted += 1,
        }

        let tiers_json =
            serde_json::to_string(&record.tiers).context("Failed to serialize tiers")?;
        let flags_json =
            serde_json::to_string(&record.flags).context("Failed to serialize flags")?;
        let fields_json =
            serde_json::to_string(&record.fields).context("Failed to serialize fields")?;

        conn.execute(
            "INSERT OR REPLACE INTO normalized_records (
                record_key, vendor, vendor_id, entity_kind, canonical_id,
                identity_matched, converted, fx_rate_used, score,
                tiers, flags, fields, fingerprint, run_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.record_key,
                record.vendor,
                record.vendor_id,
                record.entity_kind.as_str(),
                record.canonical_id,
                record.identity_matched,
                record.converted,
                record.fx_rate_used,
                record.score,
                tiers_json,
                flags_json,
                fields_json,
                record.fingerprint,
                record.run_id,
                now,
            ],
        )?;
    }

    Ok(stats)
}

/// Total rows currently materialized.
pub fn stored_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM normalized_records", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

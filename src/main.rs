use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::env;
use std::path::Path;

use canonical_engine::{
    load_cross_references, load_exchange_rates, load_source_records, profiles, setup_store,
    stored_count, upsert_changed, EntityKind, NormalizationPipeline, RunContext,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() == 7 && args[1] == "run" {
        run_pipeline(&args[2], &args[3], &args[4], &args[5], &args[6])
    } else {
        eprintln!("Usage: canonical-engine run <as-of YYYY-MM-DD> <rates.csv> <xref.csv> <distributions.csv> <output.db>");
        std::process::exit(2);
    }
}

fn run_pipeline(
    as_of: &str,
    rates_path: &str,
    xref_path: &str,
    records_path: &str,
    db_path: &str,
) -> Result<()> {
    println!("⚙️  Canonical Engine - Normalization Run");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let as_of = NaiveDate::parse_from_str(as_of, "%Y-%m-%d")
        .context("As-of date must be YYYY-MM-DD")?;

    // 1. Reference snapshots (loaded once, immutable for the run)
    println!("\n📂 Loading reference tables...");
    let rates = load_exchange_rates(Path::new(rates_path))?;
    println!("✓ Loaded {} exchange rates", rates.len());

    let cross_references = load_cross_references(Path::new(xref_path))?;
    let entry_count: usize = cross_references.values().map(Vec::len).sum();
    println!("✓ Loaded {} cross-reference entries", entry_count);

    // 2. Sanitized source records (rows without a vendor ID stop here)
    println!("\n📂 Loading source records...");
    let load = load_source_records(
        Path::new(records_path),
        "FUND_ADMIN",
        EntityKind::Fund,
        "record_id",
    )?;
    println!(
        "✓ Accepted {} records ({} rejected at the sanitizer boundary)",
        load.records.len(),
        load.rejected
    );
    if load.records.is_empty() {
        bail!("No records to process");
    }

    // 3. Build the pipeline; rule tables validate before any record runs
    let context = RunContext::new(as_of);
    let run_id = context.run_id.clone();
    let pipeline = NormalizationPipeline::new(context, rates, cross_references);
    let profile = profiles::distribution()?;

    // 4. Process
    println!("\n⚙️  Processing as of {}...", as_of);
    let normalized = pipeline.process_batch(&profile, &load.records);

    let matched = normalized.iter().filter(|r| r.identity_matched).count();
    let converted = normalized.iter().filter(|r| r.converted).count();
    println!("✓ Normalized {} records", normalized.len());
    println!("✓ Identity matched: {} / {}", matched, normalized.len());
    println!("✓ Currency converted: {} / {}", converted, normalized.len());

    // 5. Materialize incrementally
    println!("\n💾 Materializing to {}...", db_path);
    let conn = Connection::open(Path::new(db_path))?;
    setup_store(&conn)?;
    let stats = upsert_changed(&conn, &normalized)?;
    println!(
        "✓ Inserted {}, updated {}, unchanged {}",
        stats.inserted, stats.updated, stats.unchanged
    );

    let total = stored_count(&conn)?;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Run {} complete: {} rows materialized", run_id, total);

    Ok(())
}

// Small dev utility: run the full derivation pipeline over a scan
// export and print the batch summary as JSON.
//
// Usage:
//   cargo run --bin process_batch -- <events.csv> <offices.csv> <duration_matrix.csv> [item|bag]
//
// This is intentionally lightweight: reference data is loaded once,
// derived output is summarized on stdout, nothing is persisted.

use anyhow::Context;
use chrono::Utc;
use postal_flow::{
    BatchPipeline, BatchStats, CsvParser, DurationMatrix, RegionResolver, TransitionReport,
    UnitKind, UploadRecord,
};
use std::collections::HashSet;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    postal_flow::logging::init();

    let mut args = std::env::args().skip(1);
    let events_path = args.next().context("missing argument: events CSV path")?;
    let offices_path = args.next().context("missing argument: offices CSV path")?;
    let matrix_path = args
        .next()
        .context("missing argument: duration matrix CSV path")?;
    let kind = match args.next().as_deref() {
        None | Some("item") => UnitKind::Item,
        Some("bag") => UnitKind::Bag,
        Some(other) => anyhow::bail!("unknown unit kind: {other} (expected item or bag)"),
    };

    tracing::info!(version = postal_flow::VERSION, "postal-flow batch processor");

    let resolver = RegionResolver::load_csv(Path::new(&offices_path))
        .with_context(|| format!("loading office table from {offices_path}"))?;
    let matrix = DurationMatrix::load_csv(Path::new(&matrix_path))
        .with_context(|| format!("loading duration matrix from {matrix_path}"))?;
    tracing::info!(
        offices = resolver.office_count(),
        regions = resolver.region_count(),
        sla_entries = matrix.len(),
        "reference data loaded"
    );

    let table = CsvParser::parse_file(Path::new(&events_path), kind)
        .with_context(|| format!("parsing scan export {events_path}"))?;
    let file_size = std::fs::metadata(&events_path).map(|m| m.len()).unwrap_or(0);

    let pipeline = BatchPipeline::new(&resolver, &matrix);
    let mut existing_keys = HashSet::new();
    let output = pipeline.process_table(kind, &table, Utc::now(), &mut existing_keys)?;

    let upload = UploadRecord::new(
        Path::new(&events_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(events_path.clone()),
        file_size,
        output.metadata.clone(),
    );
    let stats = BatchStats::compute(&output.units, &output.lifecycles);
    let transitions = TransitionReport::compute(&output.transitions);

    let summary = serde_json::json!({
        "upload": upload,
        "stats": stats,
        "transition_report": transitions,
        "alerts_created": output.alerts.len(),
        "failed_units": output.failed_units,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

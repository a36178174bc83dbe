//! Stale command - List documents invalidated by upstream edits
//!
//! Edits come from repeated `--edit ID[:PATH]` flags, an `--edits` JSON file
//! holding an array of edit events, or both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use lineage_config::LineageConfig;
use lineage_core::{CanonicalResolver, EditEvent, IntegrityWarning, StaleDetector, StaleReport};
use serde::Serialize;

use super::{print_info, print_json, print_warning, resolver_config, GraphSession};
use crate::GlobalOptions;

/// Arguments for the stale command
#[derive(Args, Debug)]
pub struct StaleArgs {
    /// Snapshot JSON file ("-" reads stdin)
    snapshot: PathBuf,

    /// Edited content node, optionally with the changed JSON path
    #[arg(long = "edit", value_name = "ID[:PATH]", value_parser = parse_edit)]
    edits: Vec<EditEvent>,

    /// JSON file holding an array of edit events
    #[arg(long = "edits", value_name = "FILE")]
    edits_file: Option<PathBuf>,

    /// Only list stale documents that are currently canonical
    #[arg(long)]
    user_facing: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Parse `ID` or `ID:PATH` into an edit event
fn parse_edit(s: &str) -> Result<EditEvent, String> {
    let (id, path) = s.split_once(':').unwrap_or((s, ""));
    if id.trim().is_empty() {
        return Err(format!("missing content id in edit '{}'", s));
    }
    Ok(EditEvent::new(id.trim(), path.trim()))
}

fn read_edits(path: &Path) -> Result<Vec<EditEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read edits file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse edits file {}", path.display()))
}

/// JSON output: the stale report plus the integrity warnings of the graph
/// it was computed on.
#[derive(Debug, Serialize)]
struct StaleOutput<'a> {
    report: &'a StaleReport,
    warnings: &'a [IntegrityWarning],
}

/// Execute the stale command
pub fn execute(args: StaleArgs, config: &LineageConfig, global: &GlobalOptions) -> Result<()> {
    let mut edits = args.edits;
    if let Some(ref path) = args.edits_file {
        edits.extend(read_edits(path)?);
    }
    if edits.is_empty() {
        anyhow::bail!("No edits given; pass --edit <ID[:PATH]> or --edits <FILE>");
    }

    let graph = GraphSession::new(config).graph(&args.snapshot)?;
    let canonical = CanonicalResolver::with_config(&graph, resolver_config(config)).resolve();
    let mut report = StaleDetector::new(&graph, &canonical).detect(&edits);

    for id in &report.unknown_sources {
        print_warning(&format!("edit names unknown content node '{}'", id));
    }

    if args.user_facing {
        report.entries.retain(|entry| entry.reason.user_facing);
    }

    if args.json {
        return print_json(&StaleOutput {
            report: &report,
            warnings: graph.warnings(),
        });
    }

    print_report(&report);
    if !graph.warnings().is_empty() {
        print_warning(&format!(
            "{} integrity warning(s) in {}; run `lineage check` for details",
            graph.warnings().len(),
            args.snapshot.display()
        ));
    }
    print_info(
        &format!(
            "{} edit(s) checked against {} content nodes",
            edits.len(),
            graph.content_count()
        ),
        global.quiet,
    );
    Ok(())
}

fn print_report(report: &StaleReport) {
    if report.is_empty() {
        println!("No stale documents");
        return;
    }

    println!("{} stale document(s):", report.len());
    for entry in &report.entries {
        let canonical = entry
            .slot
            .map(|slot| format!(" [canonical {}]", slot))
            .unwrap_or_default();
        println!("  {} ({}){}", entry.content_id, entry.schema_type, canonical);
        println!("      {}", entry.reason);
    }

    let slots = report.stale_slots();
    if !slots.is_empty() {
        let names: Vec<String> = slots.keys().map(ToString::to_string).collect();
        println!();
        println!("Slots to regenerate: {}", names.join(", "));
    }
}

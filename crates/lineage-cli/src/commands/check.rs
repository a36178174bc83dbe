//! Check command - Build a snapshot's lineage graph and report its health

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use lineage_config::LineageConfig;
use lineage_core::{GraphStats, IntegrityWarning};
use serde::Serialize;

use super::{print_info, print_json, GraphSession};
use crate::GlobalOptions;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Snapshot JSON files ("-" reads stdin)
    #[arg(required = true)]
    snapshots: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Exit with an error when the graph carries integrity warnings
    #[arg(long)]
    deny_warnings: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    snapshot: PathBuf,
    stats: GraphStats,
    warnings: Vec<IntegrityWarning>,
}

/// Execute the check command
///
/// Corrupt snapshots (cycles, multiple producers) fail while building. With
/// several snapshots the JSON output is an array of reports.
pub fn execute(args: CheckArgs, config: &LineageConfig, global: &GlobalOptions) -> Result<()> {
    let session = GraphSession::new(config);
    let mut reports = Vec::with_capacity(args.snapshots.len());

    for path in &args.snapshots {
        let graph = session.graph(path)?;
        let report = CheckReport {
            snapshot: path.clone(),
            stats: graph.stats(),
            warnings: graph.warnings().to_vec(),
        };
        if !args.json {
            if !reports.is_empty() {
                println!();
            }
            print_stats(&report.snapshot, &report.stats);
            print_warnings(&report.warnings);
        }
        reports.push(report);
    }

    if args.json {
        match reports.as_slice() {
            [single] => print_json(single)?,
            all => print_json(&all)?,
        }
    }

    let metrics = session.cache().metrics();
    if metrics.hits > 0 {
        print_info(
            &format!("{} duplicate snapshot(s) reused from the graph cache", metrics.hits),
            global.quiet,
        );
    }

    let warned: Vec<&CheckReport> = reports.iter().filter(|r| !r.warnings.is_empty()).collect();
    if args.deny_warnings && !warned.is_empty() {
        let total: usize = warned.iter().map(|r| r.warnings.len()).sum();
        let names: Vec<String> = warned
            .iter()
            .map(|r| r.snapshot.display().to_string())
            .collect();
        anyhow::bail!(
            "{} integrity warning(s) found in {}",
            total,
            names.join(", ")
        );
    }

    Ok(())
}

fn print_stats(snapshot: &Path, stats: &GraphStats) {
    println!("Snapshot: {}", snapshot.display());
    println!("  Content nodes: {}", stats.content_nodes);
    println!("  Transforms:    {}", stats.transforms);
    println!("  Edges:         {}", stats.edges);
    println!("  Roots:         {}", stats.roots);

    if !stats.by_schema.is_empty() {
        println!();
        println!("By schema:");
        for (schema, count) in &stats.by_schema {
            println!("  {:<24} {}", schema, count);
        }
    }
}

fn print_warnings(warnings: &[IntegrityWarning]) {
    println!();
    if warnings.is_empty() {
        println!("Integrity: OK");
        return;
    }

    println!("Integrity: {} warning(s)", warnings.len());
    for warning in warnings {
        println!("  - {}", warning);
    }
}

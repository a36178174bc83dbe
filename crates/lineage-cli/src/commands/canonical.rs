//! Canonical command - Show the current version of every document slot

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lineage_config::LineageConfig;
use lineage_core::{
    CanonicalContext, CanonicalRef, CanonicalResolver, CanonicalSlot, IntegrityWarning, SlotValue,
};
use serde::Serialize;

use super::{print_json, print_warning, resolver_config, GraphSession};

/// Arguments for the canonical command
#[derive(Args, Debug)]
pub struct CanonicalArgs {
    /// Snapshot JSON file ("-" reads stdin)
    snapshot: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// JSON output: the resolved context plus the integrity warnings of the
/// graph it was resolved from.
#[derive(Debug, Serialize)]
struct CanonicalOutput<'a> {
    context: &'a CanonicalContext,
    warnings: &'a [IntegrityWarning],
}

/// Execute the canonical command
pub fn execute(args: CanonicalArgs, config: &LineageConfig) -> Result<()> {
    let graph = GraphSession::new(config).graph(&args.snapshot)?;
    let context = CanonicalResolver::with_config(&graph, resolver_config(config)).resolve();

    if args.json {
        return print_json(&CanonicalOutput {
            context: &context,
            warnings: graph.warnings(),
        });
    }

    print_context(&context);
    if !graph.warnings().is_empty() {
        print_warning(&format!(
            "{} integrity warning(s) in {}; run `lineage check` for details",
            graph.warnings().len(),
            args.snapshot.display()
        ));
    }
    Ok(())
}

fn print_context(context: &CanonicalContext) {
    println!("Canonical documents:");
    for slot in CanonicalSlot::ALL {
        println!("  {:<24} {}", slot.as_str(), describe_slot(context.get(slot)));
    }

    if let Some(selection) = context.selection() {
        let item = selection
            .index
            .map(|i| format!(" (item {})", i))
            .unwrap_or_default();
        println!();
        println!(
            "Selection: {} picked from {}{} by {}",
            selection.selected_id, selection.collection_id, item, selection.transform_id
        );
    }
}

fn describe_slot(value: Option<&SlotValue>) -> String {
    match value {
        Some(SlotValue::Single(Some(node))) => describe_ref(node),
        Some(SlotValue::List(entries)) if !entries.is_empty() => entries
            .iter()
            .map(|entry| format!("#{} {}", entry.index, entry.node.content_id))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "-".to_string(),
    }
}

fn describe_ref(node: &CanonicalRef) -> String {
    match node.produced_by {
        Some(ref transform) => format!(
            "{} ({}, via {})",
            node.content_id, node.origin_type, transform
        ),
        None => format!("{} ({})", node.content_id, node.origin_type),
    }
}

//! Integration tests for the lineage CLI
//!
//! These tests run full CLI workflows against the story fixture snapshot.
//! Every command runs in a scratch directory with `HOME` pointed inside it,
//! so neither global nor project config from the machine leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for the lineage binary
#[allow(deprecated)]
fn lineage() -> Command {
    Command::cargo_bin("lineage").expect("Failed to find lineage binary")
}

/// Path to a snapshot fixture
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A lineage command isolated inside `sandbox`
fn isolated(sandbox: &TempDir) -> Command {
    let mut cmd = lineage();
    cmd.current_dir(sandbox.path())
        .env("HOME", sandbox.path().join("home"))
        .env_remove("RUST_LOG")
        .env_remove("LINEAGE_CONFIG")
        .env_remove("LINEAGE_PROJECT_DIR")
        .env_remove("LINEAGE_LOG_FORMAT");
    cmd
}

fn write_snapshot(sandbox: &TempDir, name: &str, snapshot: &Value) -> PathBuf {
    let path = sandbox.path().join(name);
    std::fs::write(&path, serde_json::to_string_pretty(snapshot).unwrap()).unwrap();
    path
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is not valid JSON")
}

/// a -> t1 -> b -> t2 -> a
fn cyclic_snapshot() -> Value {
    json!({
        "content_nodes": [
            { "id": "a", "project_id": "p", "schema_type": "outline_settings",
              "origin_type": "derived", "created_at": "2024-03-01T09:00:00Z" },
            { "id": "b", "project_id": "p", "schema_type": "chronicles",
              "origin_type": "derived", "created_at": "2024-03-01T09:01:00Z" }
        ],
        "transforms": [
            { "id": "t1", "kind": "automated", "status": "completed", "created_at": "2024-03-01T09:00:00Z" },
            { "id": "t2", "kind": "automated", "status": "completed", "created_at": "2024-03-01T09:01:00Z" }
        ],
        "input_edges": [
            { "transform_id": "t1", "content_id": "a" },
            { "transform_id": "t2", "content_id": "b" }
        ],
        "output_edges": [
            { "transform_id": "t1", "content_id": "b" },
            { "transform_id": "t2", "content_id": "a" }
        ]
    })
}

/// One seed with an edge to a content node that was never exported
fn dangling_snapshot() -> Value {
    json!({
        "content_nodes": [
            { "id": "outline", "project_id": "p", "schema_type": "outline_settings",
              "origin_type": "seed", "created_at": "2024-03-01T09:00:00Z" }
        ],
        "transforms": [
            { "id": "t1", "kind": "automated", "status": "completed", "created_at": "2024-03-01T09:01:00Z" }
        ],
        "input_edges": [
            { "transform_id": "t1", "content_id": "outline" }
        ],
        "output_edges": [
            { "transform_id": "t1", "content_id": "ghost" }
        ]
    })
}

// ============================================================================
// Check Tests
// ============================================================================

#[test]
fn test_check_reports_stats() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .arg("check")
        .arg(fixture_path("story.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Content nodes: 8"))
        .stdout(predicate::str::contains("Transforms:    6"))
        .stdout(predicate::str::contains("Roots:         1"))
        .stdout(predicate::str::contains("episode_synopsis"))
        .stdout(predicate::str::contains("Integrity: OK"));
}

#[test]
fn test_check_json() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["check", "--json"])
        .arg(fixture_path("story.json"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let report = stdout_json(&output.stdout);
    assert_eq!(report["stats"]["content_nodes"], 8);
    assert_eq!(report["stats"]["by_schema"]["episode_synopsis"], 3);
    assert_eq!(report["warnings"], json!([]));
}

#[test]
fn test_check_reads_stdin() {
    let sandbox = TempDir::new().unwrap();
    let snapshot = std::fs::read_to_string(fixture_path("story.json")).unwrap();
    isolated(&sandbox)
        .args(["check", "-"])
        .write_stdin(snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Content nodes: 8"));
}

#[test]
fn test_check_fails_on_cycle() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "cycle.json", &cyclic_snapshot());

    isolated(&sandbox)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to build lineage graph"))
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn test_check_warns_but_succeeds_on_dangling_edge() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    isolated(&sandbox)
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Integrity: 1 warning(s)"))
        .stdout(predicate::str::contains("ghost"));
}

#[test]
fn test_check_deny_warnings() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    isolated(&sandbox)
        .args(["check", "--deny-warnings"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 integrity warning(s)"));
}

#[test]
fn test_strict_flag_rejects_warnings() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    isolated(&sandbox)
        .args(["--strict", "check"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity check failed"));
}

#[test]
fn test_check_several_snapshots_reuses_duplicates() {
    let sandbox = TempDir::new().unwrap();
    let copy = sandbox.path().join("copy.json");
    std::fs::copy(fixture_path("story.json"), &copy).unwrap();
    let dangling = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    let output = isolated(&sandbox)
        .args(["check", "--json"])
        .arg(fixture_path("story.json"))
        .arg(&dangling)
        .arg(&copy)
        .output()
        .unwrap();

    assert!(output.status.success());
    let reports = stdout_json(&output.stdout);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1]["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(reports[0]["stats"], reports[2]["stats"]);
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("1 duplicate snapshot(s) reused from the graph cache"));
}

#[test]
fn test_cache_capacity_setting_bounds_reuse() {
    let sandbox = TempDir::new().unwrap();
    let config = sandbox.path().join("tiny.toml");
    std::fs::write(&config, "[cache]\ncapacity = 1\n").unwrap();
    let dangling = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    // story, dangling, story: with room for one graph the second story is rebuilt
    isolated(&sandbox)
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(fixture_path("story.json"))
        .arg(&dangling)
        .arg(fixture_path("story.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("reused from the graph cache").not());
}

#[test]
fn test_check_missing_file() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .args(["check", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

#[test]
fn test_check_malformed_json() {
    let sandbox = TempDir::new().unwrap();
    let path = sandbox.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    isolated(&sandbox)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse snapshot"));
}

// ============================================================================
// Canonical Tests
// ============================================================================

#[test]
fn test_canonical_text() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .arg("canonical")
        .arg(fixture_path("story.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("outline (derived, via t-outline)"))
        .stdout(predicate::str::contains("#1 synopsis-1, #2 synopsis-2b"))
        .stdout(predicate::str::contains(
            "Selection: idea picked from collection (item 1) by t-select",
        ));
}

#[test]
fn test_canonical_json() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["canonical", "--json"])
        .arg(fixture_path("story.json"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let output = stdout_json(&output.stdout);
    assert_eq!(output["warnings"], json!([]));
    let context = &output["context"];
    let slots = &context["slots"];

    assert_eq!(slots["brainstorm_collection"], Value::Null);
    assert_eq!(slots["brainstorm_idea"]["content_id"], "idea");
    assert_eq!(slots["chronicles"]["content_id"], "chronicles");
    assert_eq!(slots["episode_planning"]["content_id"], "planning");

    let synopses: Vec<(u64, &str)> = slots["episode_synopses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["index"].as_u64().unwrap(),
                e["node"]["content_id"].as_str().unwrap(),
            )
        })
        .collect();
    assert_eq!(synopses, vec![(1, "synopsis-1"), (2, "synopsis-2b")]);

    assert_eq!(context["selection"]["collection_id"], "collection");
    assert_eq!(context["selection"]["index"], 1);
}

#[test]
fn test_canonical_is_repeatable() {
    let sandbox = TempDir::new().unwrap();
    let run = || {
        isolated(&sandbox)
            .args(["canonical", "--json"])
            .arg(fixture_path("story.json"))
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn test_canonical_json_carries_integrity_warnings() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    let output = isolated(&sandbox)
        .args(["canonical", "--json"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let output = stdout_json(&output.stdout);
    assert_eq!(output["context"]["slots"]["outline_settings"]["content_id"], "outline");
    let warnings = output["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["content_id"], "ghost");
}

// ============================================================================
// Stale Tests
// ============================================================================

#[test]
fn test_stale_json_carries_integrity_warnings() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    let output = isolated(&sandbox)
        .args(["stale", "--json", "--edit", "outline"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let output = stdout_json(&output.stdout);
    assert_eq!(output["report"]["entries"], json!([]));
    assert_eq!(output["warnings"].as_array().unwrap().len(), 1);
}

#[test]
fn test_stale_text_mentions_integrity_warnings() {
    let sandbox = TempDir::new().unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    isolated(&sandbox)
        .args(["stale", "--edit", "outline"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No stale documents"))
        .stderr(predicate::str::contains("1 integrity warning(s)"));
}

#[test]
fn test_stale_after_outline_edit() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .arg("stale")
        .arg(fixture_path("story.json"))
        .args(["--edit", "outline:$.tone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 stale document(s)"))
        .stdout(predicate::str::contains("chronicles (chronicles) [canonical chronicles]"))
        .stdout(predicate::str::contains(
            "outline changed at $.tone (1 generation upstream)",
        ))
        .stdout(predicate::str::contains(
            "Slots to regenerate: chronicles, episode_planning, episode_synopses",
        ));
}

#[test]
fn test_stale_json_orders_upstream_first() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["stale", "--json", "--edit", "outline:$.tone"])
        .arg(fixture_path("story.json"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let output = stdout_json(&output.stdout);
    let report = &output["report"];
    let ids: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["content_id"].as_str().unwrap())
        .collect();

    assert_eq!(ids.len(), 5);
    assert_eq!(ids[0], "chronicles");
    assert_eq!(ids[1], "planning");
    let position = |id: &str| ids.iter().position(|x| *x == id).unwrap();
    assert!(position("synopsis-2") < position("synopsis-2b"));
    assert!(!ids.contains(&"outline"));
}

#[test]
fn test_stale_user_facing_only() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["stale", "--json", "--user-facing", "--edit", "outline"])
        .arg(fixture_path("story.json"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let output = stdout_json(&output.stdout);
    let report = &output["report"];
    let ids: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["content_id"].as_str().unwrap())
        .collect();

    assert_eq!(ids.len(), 4);
    assert!(!ids.contains(&"synopsis-2"));
    assert!(report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["reason"]["user_facing"] == true));
}

#[test]
fn test_stale_edits_file() {
    let sandbox = TempDir::new().unwrap();
    let edits = sandbox.path().join("edits.json");
    std::fs::write(
        &edits,
        serde_json::to_string(&json!([
            { "content_id": "synopsis-2", "path": "$.summary", "before": "old", "after": "new" }
        ]))
        .unwrap(),
    )
    .unwrap();

    isolated(&sandbox)
        .arg("stale")
        .arg(fixture_path("story.json"))
        .arg("--edits")
        .arg(&edits)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 stale document(s)"))
        .stdout(predicate::str::contains("synopsis-2b"));
}

#[test]
fn test_stale_leaf_edit_reports_nothing() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .arg("stale")
        .arg(fixture_path("story.json"))
        .args(["--edit", "synopsis-2b:$.summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stale documents"));
}

#[test]
fn test_stale_unknown_node_is_warning() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .arg("stale")
        .arg(fixture_path("story.json"))
        .args(["--edit", "missing-node"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: edit names unknown content node 'missing-node'",
        ))
        .stdout(predicate::str::contains("No stale documents"));
}

#[test]
fn test_stale_requires_an_edit() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .arg("stale")
        .arg(fixture_path("story.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No edits given"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_show_defaults() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[resolver]"))
        .stdout(predicate::str::contains("include_pending = true"))
        .stdout(predicate::str::contains("capacity = 32"));
}

#[test]
fn test_config_show_applies_flags() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["--strict", "--exclude-pending", "config", "show", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let config = stdout_json(&output.stdout);
    assert_eq!(config["builder"]["strict_integrity"], true);
    assert_eq!(config["resolver"]["include_pending"], false);
}

#[test]
fn test_config_init_then_show_local_value() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let local = sandbox.path().join(".lineage/config.toml");
    assert!(local.exists());

    std::fs::write(&local, "[cache]\ncapacity = 5\n").unwrap();
    isolated(&sandbox)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("capacity = 5"));

    // A second init leaves the edited file alone
    isolated(&sandbox)
        .args(["config", "init"])
        .assert()
        .success()
        .stderr(predicate::str::contains("left unchanged"));
    assert_eq!(
        std::fs::read_to_string(&local).unwrap(),
        "[cache]\ncapacity = 5\n"
    );
}

#[test]
fn test_config_init_global_uses_home() {
    let sandbox = TempDir::new().unwrap();
    isolated(&sandbox)
        .args(["config", "init", "--global"])
        .assert()
        .success();

    assert!(sandbox.path().join("home/.lineage/config.toml").exists());
    assert!(!sandbox.path().join(".lineage").exists());
}

#[test]
fn test_config_path_json() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["config", "path", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let paths = stdout_json(&output.stdout);
    assert_eq!(paths["local_exists"], false);
    assert_eq!(paths["global_exists"], false);
    assert!(paths["local"]
        .as_str()
        .unwrap()
        .ends_with(".lineage/config.toml"));
}

#[test]
fn test_explicit_config_file() {
    let sandbox = TempDir::new().unwrap();
    let config = sandbox.path().join("ci.toml");
    std::fs::write(&config, "[builder]\nstrict_integrity = true\n").unwrap();
    let path = write_snapshot(&sandbox, "dangling.json", &dangling_snapshot());

    isolated(&sandbox)
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity check failed"));
}

#[test]
fn test_invalid_config_is_reported() {
    let sandbox = TempDir::new().unwrap();
    let config = sandbox.path().join("bad.toml");
    std::fs::write(&config, "[cache]\ncapacity = 0\n").unwrap();

    isolated(&sandbox)
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cache.capacity"));
}

#[test]
fn test_json_logs_go_to_stderr() {
    let sandbox = TempDir::new().unwrap();
    let output = isolated(&sandbox)
        .args(["--log-format", "json", "check", "--json"])
        .arg(fixture_path("story.json"))
        .output()
        .unwrap();

    assert!(output.status.success());
    // stdout stays machine-readable with logging enabled
    stdout_json(&output.stdout);
}

//! Resumability: skip-filtering, merging and result-file round trips

mod helpers;

use gqa_validator::models::{OutputFormat, ValidationResult};
use gqa_validator::services::checkpoint_writer::CheckpointWriter;
use gqa_validator::services::result_store;
use gqa_validator::services::RunOptions;
use helpers::{keys_of, orchestrator_with, read_json_results, record, write_input_csv, FakeOracle};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn existing(key: &str, reasoning: &str) -> ValidationResult {
    ValidationResult {
        item_key: key.to_string(),
        merchant: "Acme Sports".to_string(),
        reasoning: reasoning.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_skip_filter_dispatches_only_new_key() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), "input.csv", &[record("A"), record("B"), record("C")]);
    let output = dir.path().join("results.json");
    CheckpointWriter::new(&output, OutputFormat::Json)
        .write(&[existing("A", "earlier run"), existing("B", "earlier run")])
        .await
        .unwrap();

    let oracle = Arc::new(FakeOracle::new());
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));

    let report = orchestrator
        .run(&RunOptions::new(&input, &output), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(oracle.calls(), 1);
    assert_eq!(oracle.called_keys(), vec!["C"]);
    assert_eq!(report.existing_count, 2);
    assert_eq!(report.new_count, 1);
    assert_eq!(report.skipped_count, 2);
    assert_eq!(report.total_count(), 3);

    let saved = read_json_results(&output);
    assert_eq!(keys_of(&saved), vec!["A", "B", "C"]);
    assert_eq!(saved[0].reasoning, "earlier run");
}

#[tokio::test]
async fn test_prefix_then_resume_matches_single_run() {
    let records: Vec<_> = ["A", "B", "C", "D", "E"].iter().map(|k| record(k)).collect();

    // Interrupted-style run: first two rows, then a full resume
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), "input.csv", &records);
    let output = dir.path().join("results.json");
    let oracle = Arc::new(FakeOracle::new());
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));

    let mut options = RunOptions::new(&input, &output);
    options.limit = Some(2);
    orchestrator.run(&options, CancellationToken::new()).await.unwrap();
    options.limit = None;
    let resumed = orchestrator.run(&options, CancellationToken::new()).await.unwrap();

    assert_eq!(oracle.calls(), 5);
    assert_eq!(resumed.existing_count, 2);
    assert_eq!(resumed.new_count, 3);

    // Single uninterrupted run
    let single_dir = TempDir::new().unwrap();
    let single_input = write_input_csv(single_dir.path(), "input.csv", &records);
    let single_output = single_dir.path().join("results.json");
    let (single, _bus) = orchestrator_with(Arc::new(FakeOracle::new()));
    single
        .run(&RunOptions::new(&single_input, &single_output), CancellationToken::new())
        .await
        .unwrap();

    let resumed_keys: BTreeSet<_> = keys_of(&read_json_results(&output)).into_iter().collect();
    let single_keys: BTreeSet<_> = keys_of(&read_json_results(&single_output)).into_iter().collect();
    assert_eq!(resumed_keys, single_keys);
    assert_eq!(resumed_keys.len(), 5);
}

#[tokio::test]
async fn test_all_processed_short_circuits_without_rewrite() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), "input.csv", &[record("A"), record("B")]);
    let output = dir.path().join("results.json");
    // Hand-formatted so any rewrite would be visible
    let original = r#"[{"item_key": "A", "corrected_columns": []}, {"item_key": "B", "corrected_columns": ["l1"]}]"#;
    std::fs::write(&output, original).unwrap();

    let oracle = Arc::new(FakeOracle::new());
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));
    let report = orchestrator
        .run(&RunOptions::new(&input, &output), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(oracle.calls(), 0);
    assert_eq!(report.new_count, 0);
    assert!(report.timing.is_none());
    assert_eq!(report.summary.corrected_count, 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), original);
}

#[tokio::test]
async fn test_no_skip_replaces_existing_results_by_key() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), "input.csv", &[record("A"), record("C")]);
    let output = dir.path().join("results.json");
    CheckpointWriter::new(&output, OutputFormat::Json)
        .write(&[existing("A", "stale"), existing("B", "kept")])
        .await
        .unwrap();

    let oracle = Arc::new(FakeOracle::new());
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));
    let mut options = RunOptions::new(&input, &output);
    options.skip_existing = false;

    let report = orchestrator.run(&options, CancellationToken::new()).await.unwrap();

    assert_eq!(oracle.calls(), 2);
    let saved = read_json_results(&output);
    assert_eq!(keys_of(&saved), vec!["B", "A", "C"]);
    let a = saved.iter().find(|r| r.item_key == "A").unwrap();
    assert_eq!(a.reasoning, "A looks right");
    assert_eq!(report.total_count(), 3);
}

#[tokio::test]
async fn test_duplicate_input_keys_dispatch_last_occurrence() {
    let dir = TempDir::new().unwrap();
    let mut second = record("A");
    second.merchant = "Second Merchant".to_string();
    let input = write_input_csv(dir.path(), "input.csv", &[record("A"), record("B"), second]);
    let output = dir.path().join("results.json");

    let oracle = Arc::new(FakeOracle::new());
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));
    let report = orchestrator
        .run(&RunOptions::new(&input, &output), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(oracle.called_keys(), vec!["B", "A"]);
    let a = report.results.iter().find(|r| r.item_key == "A").unwrap();
    assert_eq!(a.merchant, "Second Merchant");
}

#[tokio::test]
async fn test_csv_output_round_trips_through_store() {
    let dir = TempDir::new().unwrap();
    let mut odd = record("B");
    odd.web_categories = "Tops, \"Polos\"\nand more".to_string();
    let input = write_input_csv(dir.path(), "input.csv", &[record("A"), odd]);
    let output = dir.path().join("results.csv");

    let oracle = Arc::new(FakeOracle::new().failing_on("A"));
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));
    let mut options = RunOptions::new(&input, &output);
    options.format = OutputFormat::Csv;

    let report = orchestrator.run(&options, CancellationToken::new()).await.unwrap();

    let loaded = result_store::load_results(&output, OutputFormat::Csv);
    assert_eq!(loaded, report.results);
    assert_eq!(loaded[0].corrected_columns, vec!["ERROR"]);
    assert_eq!(loaded[1].web_categories, "Tops, \"Polos\"\nand more");
    assert_eq!(loaded[1].l3, None);

    let keys = result_store::load_keys(&output, OutputFormat::Csv);
    assert_eq!(keys.len(), 2);

    // Resume against the CSV output dispatches nothing
    let again = orchestrator.run(&options, CancellationToken::new()).await.unwrap();
    assert_eq!(again.new_count, 0);
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_missing_input_fails_before_any_call() {
    let dir = TempDir::new().unwrap();
    let oracle = Arc::new(FakeOracle::new());
    let (orchestrator, _bus) = orchestrator_with(Arc::clone(&oracle));

    let err = orchestrator
        .run(
            &RunOptions::new(dir.path().join("absent.csv"), dir.path().join("out.json")),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, gqa_validator::ValidatorError::SourceNotFound(_)));
    assert_eq!(oracle.calls(), 0);
    assert!(!dir.path().join("out.json").exists());
}

//! Input and result file fixtures

use super::FakeOracle;
use gqa_common::events::EventBus;
use gqa_validator::models::{ClassificationField, Record, ValidationResult};
use gqa_validator::services::{ReferenceDocs, ValidationOrchestrator};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Record with a plausible set of classification values
pub fn record(key: &str) -> Record {
    Record::new(key, "Acme Sports", "Apparel > Tops")
        .with_field(ClassificationField::L1, "Apparel")
        .with_field(ClassificationField::L2, "Tops")
        .with_field(ClassificationField::Gender, "Men's")
}

/// Write `records` as an input CSV with the full header
pub fn write_input_csv(dir: &Path, name: &str, records: &[Record]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    if records.is_empty() {
        writer
            .write_record([
                "item_key",
                "merchant",
                "web_categories",
                "l1",
                "l2",
                "l3",
                "gender",
                "primary_fop",
                "sub_sport",
            ])
            .unwrap();
    }
    for record in records {
        writer.serialize(record).unwrap();
    }
    writer.flush().unwrap();
    path
}

pub fn read_json_results(path: &Path) -> Vec<ValidationResult> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn keys_of(results: &[ValidationResult]) -> Vec<String> {
    results.iter().map(|r| r.item_key.clone()).collect()
}

pub fn orchestrator_with(oracle: Arc<FakeOracle>) -> (ValidationOrchestrator, EventBus) {
    let bus = EventBus::new(1024);
    let orchestrator =
        ValidationOrchestrator::new(oracle, Arc::new(ReferenceDocs::from_text("test docs")), bus.clone());
    (orchestrator, bus)
}

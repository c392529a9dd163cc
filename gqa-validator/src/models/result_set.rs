//! Existing + newly produced results for one run

use super::validation_result::ValidationResult;
use std::collections::HashMap;

/// Results of a run, split by provenance
///
/// Merge policy is replace-by-key: a newly produced result replaces any
/// existing result with the same `item_key`, and among newly produced results
/// the later-collected one wins. Duplicate keys inside the existing set are
/// also later-wins. Existing results keep their relative order and new
/// results follow in collection order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    existing: Vec<ValidationResult>,
    produced: Vec<ValidationResult>,
}

impl ResultSet {
    pub fn new(existing: Vec<ValidationResult>) -> Self {
        Self {
            existing,
            produced: Vec::new(),
        }
    }

    /// Append a newly produced result
    pub fn push(&mut self, result: ValidationResult) {
        self.produced.push(result);
    }

    pub fn existing(&self) -> &[ValidationResult] {
        &self.existing
    }

    pub fn produced(&self) -> &[ValidationResult] {
        &self.produced
    }

    pub fn existing_count(&self) -> usize {
        self.existing.len()
    }

    pub fn produced_count(&self) -> usize {
        self.produced.len()
    }

    /// Merged view with at most one result per key
    pub fn merged(&self) -> Vec<ValidationResult> {
        // Index of the winning produced result for each key
        let mut latest: HashMap<&str, usize> = HashMap::with_capacity(self.produced.len());
        for (idx, result) in self.produced.iter().enumerate() {
            latest.insert(result.item_key.as_str(), idx);
        }

        let mut last_existing: HashMap<&str, usize> = HashMap::with_capacity(self.existing.len());
        for (idx, result) in self.existing.iter().enumerate() {
            last_existing.insert(result.item_key.as_str(), idx);
        }

        let mut merged = Vec::with_capacity(self.existing.len() + self.produced.len());

        for (idx, result) in self.existing.iter().enumerate() {
            let key = result.item_key.as_str();
            if latest.contains_key(key) || last_existing.get(key) != Some(&idx) {
                continue;
            }
            merged.push(result.clone());
        }

        for (idx, result) in self.produced.iter().enumerate() {
            if latest.get(result.item_key.as_str()) == Some(&idx) {
                merged.push(result.clone());
            }
        }

        merged
    }

    /// Consume into the merged result list
    pub fn into_merged(self) -> Vec<ValidationResult> {
        self.merged()
    }
}

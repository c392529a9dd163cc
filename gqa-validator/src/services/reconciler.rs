//! Oracle proposal to `ValidationResult`
//!
//! Original and proposed values use different null rules: the literal text
//! `None` counts as missing in the input file but is a real value when the
//! oracle proposes it.

use crate::models::{Record, ValidationResult, ERROR_MARKER};
use crate::services::oracle_client::OracleProposal;

const ORIGINAL_NULLS: [&str; 4] = ["null", "NULL", "", "None"];
const PROPOSED_NULLS: [&str; 3] = ["null", "NULL", ""];

/// Normalize a value read from the input file
pub fn normalize_original(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !ORIGINAL_NULLS.contains(v))
        .map(str::to_string)
}

/// Normalize a value proposed by the oracle
pub fn normalize_proposed(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !PROPOSED_NULLS.contains(v))
        .map(str::to_string)
}

/// Combine a record with the oracle's proposal
///
/// `corrected_columns` is taken from the proposal as-is.
pub fn reconcile(record: &Record, proposal: OracleProposal) -> ValidationResult {
    let mut result = with_originals(record);
    result.l1_validated = normalize_proposed(proposal.l1_validated.as_deref());
    result.l2_validated = normalize_proposed(proposal.l2_validated.as_deref());
    result.l3_validated = normalize_proposed(proposal.l3_validated.as_deref());
    result.gender_validated = normalize_proposed(proposal.gender_validated.as_deref());
    result.primary_fop_validated = normalize_proposed(proposal.primary_fop_validated.as_deref());
    result.sub_sport_validated = normalize_proposed(proposal.sub_sport_validated.as_deref());
    result.corrected_columns = proposal.corrected_columns;
    result.reasoning = proposal.reasoning;
    result
}

/// Result recorded for a record whose validation failed
pub fn error_result(record: &Record, message: &str) -> ValidationResult {
    let mut result = with_originals(record);
    result.corrected_columns = vec![ERROR_MARKER.to_string()];
    result.reasoning = format!("Validation failed: {}", message);
    result
}

fn with_originals(record: &Record) -> ValidationResult {
    ValidationResult {
        item_key: record.item_key.clone(),
        merchant: record.merchant.clone(),
        web_categories: record.web_categories.clone(),
        l1: normalize_original(record.l1.as_deref()),
        l2: normalize_original(record.l2.as_deref()),
        l3: normalize_original(record.l3.as_deref()),
        gender: normalize_original(record.gender.as_deref()),
        primary_fop: normalize_original(record.primary_fop.as_deref()),
        sub_sport: normalize_original(record.sub_sport.as_deref()),
        ..ValidationResult::default()
    }
}

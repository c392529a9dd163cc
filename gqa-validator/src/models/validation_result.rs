//! Validation result entity and its tabular row form

use super::record::ClassificationField;
use serde::{Deserialize, Deserializer, Serialize};

/// Marker placed in `corrected_columns` when validation of a record failed
pub const ERROR_MARKER: &str = "ERROR";

/// Persisted outcome of validating one record
///
/// Never mutated after creation. The JSON form uses these field names
/// verbatim; the CSV form is `CsvResultRow`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub item_key: String,
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub web_categories: String,

    // Original values (normalized)
    #[serde(default)]
    pub l1: Option<String>,
    #[serde(default)]
    pub l2: Option<String>,
    #[serde(default)]
    pub l3: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub primary_fop: Option<String>,
    #[serde(default)]
    pub sub_sport: Option<String>,

    // Oracle-proposed values
    #[serde(default)]
    pub l1_validated: Option<String>,
    #[serde(default)]
    pub l2_validated: Option<String>,
    #[serde(default)]
    pub l3_validated: Option<String>,
    #[serde(default)]
    pub gender_validated: Option<String>,
    #[serde(default)]
    pub primary_fop_validated: Option<String>,
    #[serde(default)]
    pub sub_sport_validated: Option<String>,

    // Correction tracking
    #[serde(default, deserialize_with = "deserialize_corrected_columns")]
    pub corrected_columns: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl ValidationResult {
    /// True when the record failed validation
    pub fn is_error(&self) -> bool {
        self.corrected_columns.iter().any(|c| c == ERROR_MARKER)
    }

    /// True when the corrected-set is non-empty (error results included)
    pub fn has_corrections(&self) -> bool {
        !self.corrected_columns.is_empty()
    }

    pub fn original(&self, field: ClassificationField) -> Option<&str> {
        match field {
            ClassificationField::L1 => self.l1.as_deref(),
            ClassificationField::L2 => self.l2.as_deref(),
            ClassificationField::L3 => self.l3.as_deref(),
            ClassificationField::Gender => self.gender.as_deref(),
            ClassificationField::PrimaryFop => self.primary_fop.as_deref(),
            ClassificationField::SubSport => self.sub_sport.as_deref(),
        }
    }

    pub fn validated(&self, field: ClassificationField) -> Option<&str> {
        match field {
            ClassificationField::L1 => self.l1_validated.as_deref(),
            ClassificationField::L2 => self.l2_validated.as_deref(),
            ClassificationField::L3 => self.l3_validated.as_deref(),
            ClassificationField::Gender => self.gender_validated.as_deref(),
            ClassificationField::PrimaryFop => self.primary_fop_validated.as_deref(),
            ClassificationField::SubSport => self.sub_sport_validated.as_deref(),
        }
    }
}

/// Decode `corrected_columns` from a list, a JSON-encoded list string, or null
///
/// A string that does not decode to a list of strings yields an empty list.
fn deserialize_corrected_columns<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Columns {
        List(Vec<String>),
        Encoded(String),
    }

    Ok(match Option::<Columns>::deserialize(deserializer)? {
        Some(Columns::List(list)) => list,
        Some(Columns::Encoded(text)) => decode_corrected_columns(&text),
        None => Vec::new(),
    })
}

/// Decode the embedded JSON list used in CSV cells
pub fn decode_corrected_columns(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str::<Vec<String>>(text).unwrap_or_else(|e| {
        tracing::debug!(value = %text, error = %e, "Undecodable corrected_columns cell, using []");
        Vec::new()
    })
}

/// Encode the corrected-set as an embedded JSON list for a CSV cell
pub fn encode_corrected_columns(columns: &[String]) -> String {
    // Serializing a slice of strings cannot fail
    serde_json::to_string(columns).unwrap_or_else(|_| "[]".to_string())
}

/// Flattened CSV row; `corrected_columns` holds a JSON-encoded list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CsvResultRow {
    #[serde(default)]
    pub item_key: String,
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub web_categories: String,
    #[serde(default)]
    pub l1: Option<String>,
    #[serde(default)]
    pub l2: Option<String>,
    #[serde(default)]
    pub l3: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub primary_fop: Option<String>,
    #[serde(default)]
    pub sub_sport: Option<String>,
    #[serde(default)]
    pub l1_validated: Option<String>,
    #[serde(default)]
    pub l2_validated: Option<String>,
    #[serde(default)]
    pub l3_validated: Option<String>,
    #[serde(default)]
    pub gender_validated: Option<String>,
    #[serde(default)]
    pub primary_fop_validated: Option<String>,
    #[serde(default)]
    pub sub_sport_validated: Option<String>,
    #[serde(default)]
    pub corrected_columns: String,
    #[serde(default)]
    pub reasoning: String,
}

impl From<&ValidationResult> for CsvResultRow {
    fn from(r: &ValidationResult) -> Self {
        Self {
            item_key: r.item_key.clone(),
            merchant: r.merchant.clone(),
            web_categories: r.web_categories.clone(),
            l1: r.l1.clone(),
            l2: r.l2.clone(),
            l3: r.l3.clone(),
            gender: r.gender.clone(),
            primary_fop: r.primary_fop.clone(),
            sub_sport: r.sub_sport.clone(),
            l1_validated: r.l1_validated.clone(),
            l2_validated: r.l2_validated.clone(),
            l3_validated: r.l3_validated.clone(),
            gender_validated: r.gender_validated.clone(),
            primary_fop_validated: r.primary_fop_validated.clone(),
            sub_sport_validated: r.sub_sport_validated.clone(),
            corrected_columns: encode_corrected_columns(&r.corrected_columns),
            reasoning: r.reasoning.clone(),
        }
    }
}

impl From<CsvResultRow> for ValidationResult {
    fn from(row: CsvResultRow) -> Self {
        Self {
            corrected_columns: decode_corrected_columns(&row.corrected_columns),
            item_key: row.item_key,
            merchant: row.merchant,
            web_categories: row.web_categories,
            l1: row.l1,
            l2: row.l2,
            l3: row.l3,
            gender: row.gender,
            primary_fop: row.primary_fop,
            sub_sport: row.sub_sport,
            l1_validated: row.l1_validated,
            l2_validated: row.l2_validated,
            l3_validated: row.l3_validated,
            gender_validated: row.gender_validated,
            primary_fop_validated: row.primary_fop_validated,
            sub_sport_validated: row.sub_sport_validated,
            reasoning: row.reasoning,
        }
    }
}

//! Input records and classification field names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification field carried by every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationField {
    L1,
    L2,
    L3,
    Gender,
    PrimaryFop,
    SubSport,
}

impl ClassificationField {
    /// All fields in column order
    pub const ALL: [ClassificationField; 6] = [
        ClassificationField::L1,
        ClassificationField::L2,
        ClassificationField::L3,
        ClassificationField::Gender,
        ClassificationField::PrimaryFop,
        ClassificationField::SubSport,
    ];

    /// Original column name (`primary_fop`)
    pub fn column_name(self) -> &'static str {
        match self {
            ClassificationField::L1 => "l1",
            ClassificationField::L2 => "l2",
            ClassificationField::L3 => "l3",
            ClassificationField::Gender => "gender",
            ClassificationField::PrimaryFop => "primary_fop",
            ClassificationField::SubSport => "sub_sport",
        }
    }

    /// Oracle-proposed column name (`primary_fop_validated`)
    pub fn validated_column_name(self) -> &'static str {
        match self {
            ClassificationField::L1 => "l1_validated",
            ClassificationField::L2 => "l2_validated",
            ClassificationField::L3 => "l3_validated",
            ClassificationField::Gender => "gender_validated",
            ClassificationField::PrimaryFop => "primary_fop_validated",
            ClassificationField::SubSport => "sub_sport_validated",
        }
    }

    /// Label used in oracle prompts
    pub fn display_label(self) -> &'static str {
        match self {
            ClassificationField::L1 => "L1",
            ClassificationField::L2 => "L2",
            ClassificationField::L3 => "L3",
            ClassificationField::Gender => "Gender",
            ClassificationField::PrimaryFop => "Primary FoP",
            ClassificationField::SubSport => "Sub-sport",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column_name() == name)
    }
}

impl fmt::Display for ClassificationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One input row to validate
///
/// Classification values are kept exactly as read; normalization happens in
/// the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
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
}

impl Record {
    /// Record with only identifying fields set
    pub fn new(
        item_key: impl Into<String>,
        merchant: impl Into<String>,
        web_categories: impl Into<String>,
    ) -> Self {
        Self {
            item_key: item_key.into(),
            merchant: merchant.into(),
            web_categories: web_categories.into(),
            ..Self::default()
        }
    }

    /// Builder-style setter for a classification value
    pub fn with_field(mut self, field: ClassificationField, value: impl Into<String>) -> Self {
        *self.field_mut(field) = Some(value.into());
        self
    }

    /// Raw value of a classification field
    pub fn field(&self, field: ClassificationField) -> Option<&str> {
        match field {
            ClassificationField::L1 => self.l1.as_deref(),
            ClassificationField::L2 => self.l2.as_deref(),
            ClassificationField::L3 => self.l3.as_deref(),
            ClassificationField::Gender => self.gender.as_deref(),
            ClassificationField::PrimaryFop => self.primary_fop.as_deref(),
            ClassificationField::SubSport => self.sub_sport.as_deref(),
        }
    }

    fn field_mut(&mut self, field: ClassificationField) -> &mut Option<String> {
        match field {
            ClassificationField::L1 => &mut self.l1,
            ClassificationField::L2 => &mut self.l2,
            ClassificationField::L3 => &mut self.l3,
            ClassificationField::Gender => &mut self.gender,
            ClassificationField::PrimaryFop => &mut self.primary_fop,
            ClassificationField::SubSport => &mut self.sub_sport,
        }
    }
}

/// Per-record scheduling state
///
/// `Pending → Dispatched → {Completed | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordState {
    /// Waiting in the work queue
    Pending,
    /// Oracle call in flight
    Dispatched,
    /// Oracle answered and the answer was reconciled
    Completed,
    /// Oracle call or parsing failed; an error result was recorded
    Failed,
}

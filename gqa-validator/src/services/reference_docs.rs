//! Reference documentation embedded in every oracle prompt
//!
//! Loaded once per run and shared read-only between workers.

use crate::error::ValidatorResult;
use std::path::Path;
use tracing::{debug, warn};

/// Documentation files, in prompt order
pub const REFERENCE_DOC_FILES: [&str; 3] = [
    "L1-L3 Hierarchy Definitions.md",
    "Gender Classification Definitions.md",
    "FoP Definitions.md",
];

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Concatenated classification definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDocs {
    text: String,
    sections: usize,
}

impl ReferenceDocs {
    /// Load the definition files from `dir`
    ///
    /// Each found file becomes a `## <file name>` section. Missing files are
    /// skipped with a warning; unreadable files are errors.
    pub fn load(dir: &Path) -> ValidatorResult<Self> {
        let mut sections = Vec::with_capacity(REFERENCE_DOC_FILES.len());

        for name in REFERENCE_DOC_FILES {
            let path = dir.join(name);
            if !path.exists() {
                warn!(path = %path.display(), "Reference document not found, skipping");
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(gqa_common::Error::from)?;
            debug!(file = name, bytes = content.len(), "Loaded reference document");
            sections.push(format!("## {}\n\n{}", name, content));
        }

        Ok(Self {
            sections: sections.len(),
            text: sections.join(SECTION_SEPARATOR),
        })
    }

    /// Wrap already-assembled documentation text
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let sections = usize::from(!text.is_empty());
        Self { text, sections }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of loaded sections
    pub fn section_count(&self) -> usize {
        self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

//! Oracle prompt construction

use crate::models::{taxonomy, ClassificationField, Record};
use crate::services::reference_docs::ReferenceDocs;
use std::fmt::Write;

/// Build the single user message sent to the oracle for one record
pub fn build_validation_prompt(record: &Record, docs: &ReferenceDocs) -> String {
    let mut prompt = String::with_capacity(docs.as_str().len() + 4096);

    prompt.push_str(
        "You are a product classification expert. Your task is to validate and correct \
         product classifications based on the provided documentation.\n\n",
    );
    prompt.push_str("## Classification Documentation\n\n");
    prompt.push_str(docs.as_str());
    prompt.push_str("\n\n---\n\n## Product to Validate\n\n");

    // Writing to a String cannot fail
    let _ = writeln!(prompt, "**Item Key:** {}", record.item_key);
    let _ = writeln!(prompt, "**Merchant:** {}", record.merchant);
    let _ = writeln!(prompt, "**Web Categories:** {}", record.web_categories);
    prompt.push_str("\n**Current Classifications:**\n");
    for field in ClassificationField::ALL {
        let _ = writeln!(
            prompt,
            "- {}: {}",
            field.display_label(),
            record.field(field).unwrap_or("null")
        );
    }

    prompt.push_str(
        "\n---\n\n## Instructions\n\n\
         1. Analyze the item_key, merchant, and web_categories to understand what product this is.\n\
         2. Based on the classification documentation, determine the CORRECT values for each classification field.\n\
         3. Compare your classifications with the current ones and identify any corrections needed.\n\n",
    );

    prompt.push_str("## Valid Values Reference\n\n");
    prompt.push_str(&taxonomy::valid_values_reference());

    prompt.push_str("\n---\n\n## Response Format\n\n");
    prompt.push_str(
        "Respond ONLY with a valid JSON object in this exact format (no markdown, no extra text):\n\n",
    );
    prompt.push_str(&response_schema_line());
    prompt.push_str(
        "\n\nIMPORTANT:\n\
         - Use EXACT values from the valid values lists above\n\
         - Use \"null\" (as a string) for null/missing values\n\
         - Only list columns in corrected_columns if you changed their value\n",
    );
    let originals: Vec<String> = ClassificationField::ALL
        .iter()
        .map(|f| format!("\"{}\"", f.column_name()))
        .collect();
    let _ = writeln!(
        prompt,
        "- Use ORIGINAL column names in corrected_columns: {} (NOT the _validated versions)",
        originals.join(", ")
    );
    prompt.push_str(
        "- If no corrections needed, use an empty list [] for corrected_columns\n\
         - Keep reasoning concise but informative\n",
    );

    prompt
}

/// One-line JSON template of the expected response object
fn response_schema_line() -> String {
    let mut parts: Vec<String> = ClassificationField::ALL
        .iter()
        .map(|f| format!("\"{}\": \"<value or null>\"", f.validated_column_name()))
        .collect();
    parts.push("\"corrected_columns\": [\"<original_column_name>\", ...]".to_string());
    parts.push("\"reasoning\": \"<brief explanation of any corrections made>\"".to_string());
    format!("{{{}}}", parts.join(", "))
}

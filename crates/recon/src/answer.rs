//! Post-processing of the group-1 structured LLM answer.

use serde_json::{Map, Value};

use crate::error::ReconError;
use crate::model::CandidateLists;

const KEY_INACTIVE: &str = "FoundInactiveIngredients";
const KEY_PRINTING: &str = "IngredientsPrintingInk";
const KEY_PRINTING_OUTSIDE: &str = "IngredientsPrintingInkOutside";
const KEY_ROUTE: &str = "Product_route";
const KEY_DOSAGE_FORM: &str = "Product_dosage_form";
const KEY_MINT: &str = "Product_found_mint";
const KEY_MENTHOL: &str = "Product_found_menthol";
const KEY_NDC_INFO: &str = "Found NDC Specific Information";

/// Parsed group-1 answer: candidate lists plus product flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateAnswer {
    pub candidates: CandidateLists,
    pub route: String,
    pub dosage_form: String,
    pub found_mint: bool,
    pub found_menthol: bool,
    pub found_ndc_info: bool,
}

impl CandidateAnswer {
    /// Parse the raw answer text.
    ///
    /// Markdown fences and `json` tags are removed before parsing. Missing
    /// keys read as empty. Every name is lowercased; an inactive entry with
    /// more than one comma is a flattened list and is split. Mint and menthol
    /// flags add `mint` / `menthol` to the inactive list.
    pub fn parse(raw: &str) -> Result<Self, ReconError> {
        let cleaned = raw.replace("json", "").replace("```", "");
        let value: Value = serde_json::from_str(cleaned.trim())
            .map_err(|e| ReconError::AnswerParse(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| ReconError::AnswerParse("answer is not a JSON object".into()))?;

        let mut inactive = Vec::new();
        for entry in string_list(obj, KEY_INACTIVE) {
            if entry.matches(',').count() > 1 {
                inactive.extend(entry.split(',').map(str::to_lowercase));
            } else {
                inactive.push(entry.to_lowercase());
            }
        }

        let found_mint = obj.get(KEY_MINT).is_some_and(is_truthy);
        let found_menthol = obj.get(KEY_MENTHOL).is_some_and(is_truthy);
        if found_mint {
            inactive.push("mint".into());
        }
        if found_menthol {
            inactive.push("menthol".into());
        }

        let lowered = |key: &str| -> Vec<String> {
            string_list(obj, key).iter().map(|s| s.to_lowercase()).collect()
        };

        Ok(Self {
            candidates: CandidateLists {
                inactive,
                inprint: lowered(KEY_PRINTING),
                inprint_outside: lowered(KEY_PRINTING_OUTSIDE),
            },
            route: string_field(obj, KEY_ROUTE).to_lowercase(),
            dosage_form: string_field(obj, KEY_DOSAGE_FORM).to_lowercase(),
            found_mint,
            found_menthol,
            found_ndc_info: obj.get(KEY_NDC_INFO).is_some_and(is_truthy),
        })
    }
}

/// `1`, `"1"` and `true` are set; anything else is not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}

/// String elements of an array field; non-string elements are skipped.
fn string_list<'a>(obj: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

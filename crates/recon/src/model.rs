use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Reported-inactive identifier (`ReportedInactiveID`).
pub type IngredientId = u32;

/// Ingredient complexity group (`GroupNumber`), 1..=5.
pub type Group = u8;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The three candidate-name lists produced for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateLists {
    /// Every mentioned inactive ingredient.
    pub inactive: Vec<String>,
    /// Mentioned as a printing-ink component.
    pub inprint: Vec<String>,
    /// Mentioned as a printing-ink component and also used outside the ink.
    pub inprint_outside: Vec<String>,
}

/// Everything the candidate-extraction collaborator answered for one
/// document, as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentAnswers {
    /// Raw text of the group-1 structured answer.
    #[serde(default)]
    pub group1: String,
    /// Group 2/3 decisions: ingredient name -> `Include` | `Exclude` | choice.
    #[serde(default)]
    pub group2_3: BTreeMap<String, String>,
    /// Group 4/5 flags: `Found <Name>` -> 1/0.
    #[serde(default)]
    pub group4_5: BTreeMap<String, serde_json::Value>,
    /// Label text the answers were drawn from, when kept. Decides which
    /// group-5 flag was asked.
    #[serde(default)]
    pub label_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Result of running one document through the matcher and rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentExtraction {
    pub ids: BTreeSet<IngredientId>,
    /// Canonical names matched from the group-1 candidate lists.
    pub matched: BTreeSet<String>,
    pub candidates: CandidateLists,
    pub route: String,
    pub dosage_form: String,
    pub found_ndc_info: bool,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// One identifier on either side of a comparison, resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub id: IngredientId,
    pub name: String,
    pub group: Group,
}

/// Expected (ground truth) vs found (LLM) identifiers for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub expected: Vec<IngredientId>,
    pub found: Vec<IngredientId>,
    /// In `expected`, absent from `found`.
    pub missing: Vec<DiffEntry>,
    /// In `found`, absent from `expected`.
    pub extra: Vec<DiffEntry>,
}

impl Comparison {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Per-document record of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub search: String,
    pub set_id: String,
    pub extraction: DocumentExtraction,
    pub comparison: Comparison,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub documents: usize,
    pub all_ok: usize,
    pub with_missing: usize,
    pub with_extra: usize,
    pub missing_by_group: BTreeMap<Group, usize>,
    pub extra_by_group: BTreeMap<Group, usize>,
    pub missing_by_id: BTreeMap<IngredientId, usize>,
    pub extra_by_id: BTreeMap<IngredientId, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub meta: BatchMeta,
    pub summary: BatchSummary,
    pub documents: Vec<DocumentReport>,
    /// Searches with no answer or no resolvable SetID.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchMeta {
    pub config_name: String,
    pub level: String,
    pub groups: Vec<Group>,
    pub engine_version: String,
    pub run_at: String,
}

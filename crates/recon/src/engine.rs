use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::alias::AliasTable;
use crate::answer::CandidateAnswer;
use crate::classify::{compare, format_simple};
use crate::config::{Level, RunConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::ground_truth::GroundTruth;
use crate::matcher::match_ingredients;
use crate::model::{
    BatchMeta, BatchResult, DocumentAnswers, DocumentExtraction, DocumentReport, IngredientId,
};
use crate::rules::RulesTable;

/// Where a document's candidate-extraction answers come from.
pub trait AnswerSource {
    /// `Ok(None)` when nothing was answered for `search`.
    fn answers(&self, search: &str) -> Result<Option<DocumentAnswers>, ReconError>;
}

impl AnswerSource for HashMap<String, DocumentAnswers> {
    fn answers(&self, search: &str) -> Result<Option<DocumentAnswers>, ReconError> {
        Ok(self.get(search).cloned())
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Raw text of every reference table, as read by the caller.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub inactive: String,
    pub aliases: String,
    pub ndc_spl: String,
    pub ndc_ri: String,
    pub rules: Option<String>,
}

/// Parsed reference tables for one run.
#[derive(Debug, Clone)]
pub struct Reference {
    pub aliases: AliasTable,
    pub rules: Option<RulesTable>,
    pub truth: GroundTruth,
}

impl Reference {
    pub fn load(config: &RunConfig, data: &ReferenceData) -> Result<Self, ReconError> {
        let aliases = AliasTable::from_csv(&data.inactive, &data.aliases, &config.alias_options())?;
        let rules = data
            .rules
            .as_deref()
            .map(|csv| RulesTable::from_csv(csv, &config.selection.groups))
            .transpose()?;
        let truth = GroundTruth::from_csv(&data.ndc_spl, &data.ndc_ri)?;

        debug!(
            ingredients = aliases.len(),
            rules = rules.as_ref().map_or(0, RulesTable::len),
            "reference data loaded"
        );

        Ok(Self {
            aliases,
            rules,
            truth,
        })
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Turn one document's answers into a validated identifier set.
///
/// A group-1 answer that cannot be parsed is logged and treated as empty;
/// the group 4-5 answers still count. Group 2/3 decisions count only for
/// rules triggered by a matched ingredient.
pub fn extract_document(
    table: &AliasTable,
    rules: Option<&RulesTable>,
    answers: &DocumentAnswers,
) -> DocumentExtraction {
    let answer = if answers.group1.trim().is_empty() {
        CandidateAnswer::default()
    } else {
        CandidateAnswer::parse(&answers.group1).unwrap_or_else(|e| {
            warn!(error = %e, "group 1 answer ignored");
            CandidateAnswer::default()
        })
    };

    debug!(
        inactive = ?answer.candidates.inactive,
        inprint = ?answer.candidates.inprint,
        inprint_outside = ?answer.candidates.inprint_outside,
        "candidates before filtering"
    );

    let matched = match_ingredients(&answer.candidates, table);
    let mut ids: BTreeSet<IngredientId> = matched
        .iter()
        .filter(|i| i.group == 1)
        .filter_map(|i| i.primary_id())
        .collect();
    let matched: BTreeSet<String> = matched.iter().map(|i| i.name.clone()).collect();

    if let Some(rules) = rules {
        ids.extend(rules.resolve_group2_3(&answers.group2_3, &matched));
        ids.extend(rules.resolve_flags(&answers.group4_5, answers.label_text.as_deref()));
    }

    debug!(matched = ?matched, ids = ?ids, "after filtering");

    DocumentExtraction {
        ids,
        matched,
        candidates: answer.candidates,
        route: answer.route,
        dosage_form: answer.dosage_form,
        found_ndc_info: answer.found_ndc_info,
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Extract and reconcile one document against ground truth.
pub fn run_document(
    reference: &Reference,
    level: Level,
    search: &str,
    set_id: &str,
    ndc11: &str,
    answers: &DocumentAnswers,
) -> Result<DocumentReport, ReconError> {
    let extraction = extract_document(&reference.aliases, reference.rules.as_ref(), answers);
    let expected = reference
        .truth
        .expected_ids(search, level, ndc11, &reference.aliases.ids());
    let comparison = compare(expected, extraction.ids.iter().copied(), &reference.aliases)?;

    debug!(set_id, search, report = %format_simple(&comparison), "document reconciled");

    Ok(DocumentReport {
        search: search.to_string(),
        set_id: set_id.to_string(),
        extraction,
        comparison,
    })
}

/// Progress of a batch, reported as each search is settled.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    Document(&'a DocumentReport),
    Skipped(&'a str),
}

/// Run every search. Searches with no answer, an unreadable answer, or (at
/// NDC level) a raw NDC missing from the NDC table, are skipped with a
/// warning.
pub fn run_batch(
    config: &RunConfig,
    reference: &Reference,
    searches: &[String],
    source: &dyn AnswerSource,
) -> Result<BatchResult, ReconError> {
    run_batch_with(config, reference, searches, source, |_| {})
}

/// [`run_batch`], calling `on_event` for each document and skip as it
/// happens, so callers can record progress that survives a failed batch.
pub fn run_batch_with(
    config: &RunConfig,
    reference: &Reference,
    searches: &[String],
    source: &dyn AnswerSource,
    mut on_event: impl FnMut(BatchEvent<'_>),
) -> Result<BatchResult, ReconError> {
    let level = config.selection.level;
    let mut documents: Vec<DocumentReport> = Vec::with_capacity(searches.len());
    let mut skipped = Vec::new();

    for search in searches {
        let (set_id, ndc11) = match level {
            Level::SetId => (search.clone(), String::new()),
            Level::Ndc => match reference.truth.resolve_ndc(search) {
                Some(r) => (r.set_id, r.ndc11),
                None => {
                    warn!(search = %search, "NDC not in the NDC table, skipped");
                    on_event(BatchEvent::Skipped(search));
                    skipped.push(search.clone());
                    continue;
                }
            },
        };

        let answers = match source.answers(search) {
            Ok(Some(answers)) => answers,
            Ok(None) => {
                warn!(search = %search, "no answer, skipped");
                on_event(BatchEvent::Skipped(search));
                skipped.push(search.clone());
                continue;
            }
            Err(e) => {
                warn!(search = %search, error = %e, "unreadable answer, skipped");
                on_event(BatchEvent::Skipped(search));
                skipped.push(search.clone());
                continue;
            }
        };

        let report = run_document(reference, level, search, &set_id, &ndc11, &answers)?;
        on_event(BatchEvent::Document(&report));
        documents.push(report);
    }

    let summary = compute_summary(documents.iter().map(|d| &d.comparison));

    Ok(BatchResult {
        meta: BatchMeta {
            config_name: config.name.clone(),
            level: level.to_string(),
            groups: config.selection.groups.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        documents,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const INACTIVE: &str = "\
ReportedInactiveID,GroupNumber,FDB_HICDDESC
101,1,Magnesium Stearate
102,1,Lactose Monohydrate
103,1,Titanium Dioxide
104,1,Shellac
201,2,Sulfites
401,4,Gluten
";

    const ALIASES: &str = "\
ReportedInactiveID,Alias,AliasType
101,Mag Stearate,SYN
102,Lactose,SYN
103,TiO2,SYN
";

    const RULES: &str = "\
Name,ReportedInactiveID,Group,FDB_HICDDESC
Sulfites,201,2,Magnesium Stearate
Gluten,401,4,
";

    const NDC_SPL: &str = "\
NDC11,RawNDC,SetID
00591086001,0591-0860-01,set-a
00591086005,0591-0860-05,set-a
00591086101,0591-0861-01,set-b
";

    const NDC_RI: &str = "\
NDC11,HICSEQNO,ReportedInactiveID
00591086001,1,101
00591086001,2,102
00591086005,1,101
00591086005,2,401
00591086101,1,103
";

    fn config(level: &str) -> RunConfig {
        RunConfig::from_toml(&format!(
            r#"
[reference]
inactive = "ri.csv"
aliases = "alias.csv"
ndc_spl = "spl.csv"
ndc_ri = "ndcri.csv"

[selection]
level = "{level}"
"#
        ))
        .unwrap()
    }

    fn reference(with_rules: bool) -> Reference {
        let data = ReferenceData {
            inactive: INACTIVE.into(),
            aliases: ALIASES.into(),
            ndc_spl: NDC_SPL.into(),
            ndc_ri: NDC_RI.into(),
            rules: with_rules.then(|| RULES.to_string()),
        };
        Reference::load(&config("ndc"), &data).unwrap()
    }

    fn answers(group1: &str) -> DocumentAnswers {
        DocumentAnswers {
            group1: group1.into(),
            ..Default::default()
        }
    }

    #[test]
    fn alias_matches_case_insensitively() {
        let r = reference(false);
        let doc = answers(r#"{"FoundInactiveIngredients": ["Mag Stearate"]}"#);
        let ex = extract_document(&r.aliases, None, &doc);
        assert_eq!(ex.ids, BTreeSet::from([101]));
        assert_eq!(ex.matched, BTreeSet::from(["magnesium stearate".to_string()]));
    }

    #[test]
    fn only_group1_matches_count_without_rules() {
        let r = reference(false);
        let doc = answers(r#"{"FoundInactiveIngredients": ["Sulfites", "Shellac"]}"#);
        let ex = extract_document(&r.aliases, None, &doc);
        assert_eq!(ex.ids, BTreeSet::from([104]));
        assert!(ex.matched.contains("sulfites"));
    }

    #[test]
    fn unparseable_answer_is_empty() {
        let r = reference(true);
        let mut doc = answers("Sorry, I cannot read this label.");
        doc.group4_5 = BTreeMap::from([("Found Gluten".to_string(), serde_json::json!(1))]);
        let ex = extract_document(&r.aliases, r.rules.as_ref(), &doc);
        assert!(ex.candidates.inactive.is_empty());
        assert_eq!(ex.ids, BTreeSet::from([401]));
    }

    #[test]
    fn rules_add_follow_up_ids() {
        let r = reference(true);
        let mut doc = answers(r#"{"FoundInactiveIngredients": ["magnesium stearate"], "Product_route": "Oral"}"#);
        doc.group2_3 = BTreeMap::from([("Sulfites".to_string(), "Include".to_string())]);
        let ex = extract_document(&r.aliases, r.rules.as_ref(), &doc);
        assert_eq!(ex.ids, BTreeSet::from([101, 201]));
        assert_eq!(ex.route, "oral");
    }

    #[test]
    fn batch_at_ndc_level() {
        let r = reference(true);
        let mut wrong = answers(r#"{"FoundInactiveIngredients": ["Mag Stearate", "Titanium Dioxide"]}"#);
        wrong.group4_5 = BTreeMap::from([("Found Gluten".to_string(), serde_json::json!(0))]);
        let source: HashMap<String, DocumentAnswers> = HashMap::from([
            (
                "0591-0860-01".to_string(),
                answers(r#"{"FoundInactiveIngredients": ["Magnesium Stearate", "Lactose"]}"#),
            ),
            ("0591-0860-05".to_string(), wrong),
            ("9999-0000-01".to_string(), answers("{}")),
        ]);
        let searches: Vec<String> = ["0591-0860-01", "0591-0860-05", "9999-0000-01", "0591-0861-01"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = run_batch(&config("ndc"), &r, &searches, &source).unwrap();

        assert_eq!(result.skipped, vec!["9999-0000-01", "0591-0861-01"]);
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0].set_id, "set-a");
        assert!(result.documents[0].comparison.is_ok());

        let c = &result.documents[1].comparison;
        assert_eq!(c.expected, vec![101, 401]);
        assert_eq!(c.found, vec![101, 103]);
        assert_eq!(
            format_simple(c),
            "missing: gluten ; too much: titanium dioxide ; expected: [101, 401] ; got: [101, 103]"
        );

        assert_eq!(result.summary.documents, 2);
        assert_eq!(result.summary.all_ok, 1);
        assert_eq!(result.meta.level, "ndc");
    }

    #[test]
    fn batch_at_setid_level() {
        let r = reference(true);
        let mut doc = answers(r#"{"FoundInactiveIngredients": ["Lactose", "Mag Stearate"]}"#);
        doc.group4_5 = BTreeMap::from([("Found Gluten".to_string(), serde_json::json!("1"))]);
        let source = HashMap::from([("set-a".to_string(), doc)]);

        let result = run_batch(&config("setid"), &r, &["set-a".to_string()], &source).unwrap();
        let report = &result.documents[0];
        assert_eq!(report.set_id, "set-a");
        assert_eq!(report.comparison.expected, vec![101, 102, 401]);
        assert!(report.comparison.is_ok());
    }

    #[test]
    fn untriggered_group2_decision_ignored() {
        let r = reference(true);
        let mut doc = answers(r#"{"FoundInactiveIngredients": ["talc"]}"#);
        doc.group2_3 = BTreeMap::from([("Sulfites".to_string(), "Include".to_string())]);
        let ex = extract_document(&r.aliases, r.rules.as_ref(), &doc);
        assert!(ex.matched.is_empty());
        assert!(ex.ids.is_empty());
    }

    /// Answers from a store where some entries cannot be decoded.
    struct Flaky(HashMap<String, DocumentAnswers>);

    impl AnswerSource for Flaky {
        fn answers(&self, search: &str) -> Result<Option<DocumentAnswers>, ReconError> {
            if search == "0591-0860-05" {
                return Err(ReconError::AnswerParse("invalid type: map, expected a string".into()));
            }
            self.0.answers(search)
        }
    }

    #[test]
    fn unreadable_answer_skips_only_that_document() {
        let r = reference(true);
        let source = Flaky(HashMap::from([(
            "0591-0860-01".to_string(),
            answers(r#"{"FoundInactiveIngredients": ["Magnesium Stearate", "Lactose"]}"#),
        )]));
        let searches = vec!["0591-0860-05".to_string(), "0591-0860-01".to_string()];

        let mut events = Vec::new();
        let result = run_batch_with(&config("ndc"), &r, &searches, &source, |e| {
            events.push(match e {
                BatchEvent::Document(d) => format!("doc {}", d.search),
                BatchEvent::Skipped(s) => format!("skip {s}"),
            });
        })
        .unwrap();

        assert_eq!(result.skipped, vec!["0591-0860-05"]);
        assert_eq!(result.documents.len(), 1);
        assert!(result.documents[0].comparison.is_ok());
        assert_eq!(events, vec!["skip 0591-0860-05", "doc 0591-0860-01"]);
    }
}

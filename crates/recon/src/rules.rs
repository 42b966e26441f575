//! Group 2-5 rules table and resolution of follow-up answers.
//!
//! Group 1 ingredients are decided by alias matching alone. Groups 2 and 3
//! depend on a group-1 ingredient plus the product's route and dosage form;
//! group 4 is asked of every label; group 5 (latex / rubber) only when the
//! label text mentions it. The questions themselves are asked elsewhere; this
//! module selects which rules apply and turns the answers into identifiers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::answer::is_truthy;
use crate::error::ReconError;
use crate::model::{Group, IngredientId};
use crate::table::CsvTable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub id: IngredientId,
    pub group: Group,
    /// Lowercase group-1 ingredient this rule depends on.
    pub trigger: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Group5Probe {
    Latex,
    Rubber,
}

impl Group5Probe {
    /// Rule name (lowercase) answered by this probe.
    pub fn rule_name(&self) -> &'static str {
        match self {
            Self::Latex => "latex",
            Self::Rubber => "rubber",
        }
    }
}

/// Group 2/3 follow-up decision for one ingredient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Include,
    Exclude,
    /// A specific ingredient chosen from the rule's alternatives.
    Choose(String),
}

impl Decision {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Include" => Self::Include,
            "Exclude" => Self::Exclude,
            other => Self::Choose(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RulesTable {
    rules: Vec<Rule>,
    name_to_id: HashMap<String, IngredientId>,
}

impl RulesTable {
    /// Load rules (`Name`, `ReportedInactiveID`, `Group`, `FDB_HICDDESC`),
    /// keeping only the selected groups.
    pub fn from_csv(rules_csv: &str, groups: &[Group]) -> Result<Self, ReconError> {
        let table = CsvTable::parse("rules", rules_csv)?;
        let name_idx = table.column("Name")?;
        let id_idx = table.column("ReportedInactiveID")?;
        let group_idx = table.column("Group")?;
        let trigger_idx = table.column("FDB_HICDDESC")?;

        let mut rules = Vec::with_capacity(table.len());
        for row in table.rows() {
            let group: Group = row.parse(group_idx)?;
            if !groups.is_empty() && !groups.contains(&group) {
                continue;
            }
            rules.push(Rule {
                name: row.text(name_idx).to_string(),
                id: row.parse(id_idx)?,
                group,
                trigger: row.text(trigger_idx).to_lowercase(),
            });
        }

        Ok(Self::from_rules(rules))
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let name_to_id = rules
            .iter()
            .map(|r| (r.name.to_lowercase(), r.id))
            .collect();
        Self { rules, name_to_id }
    }

    pub fn id_of(&self, name: &str) -> Option<IngredientId> {
        self.name_to_id.get(&name.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Group 2 and 3 rules triggered by the matched group-1 ingredients.
    pub fn follow_up<'a>(&'a self, matched: &BTreeSet<String>) -> Vec<&'a Rule> {
        self.rules
            .iter()
            .filter(|r| (r.group == 2 || r.group == 3) && matched.contains(&r.trigger))
            .collect()
    }

    pub fn group4(&self) -> Vec<&Rule> {
        self.rules.iter().filter(|r| r.group == 4).collect()
    }

    /// Which group-5 question the label text calls for, if any.
    pub fn group5_probe(document_text: &str) -> Option<Group5Probe> {
        let lower = document_text.to_lowercase();
        if lower.contains("latex") {
            Some(Group5Probe::Latex)
        } else if lower.contains("rubber") {
            Some(Group5Probe::Rubber)
        } else {
            None
        }
    }

    /// Identifiers from group 2/3 decisions keyed by ingredient name
    /// (underscores standing for spaces).
    ///
    /// Only rules triggered by `matched` were asked, so a decision counts
    /// only when it lands on one of their identifiers. Unknown names are
    /// skipped.
    pub fn resolve_group2_3(
        &self,
        answers: &BTreeMap<String, String>,
        matched: &BTreeSet<String>,
    ) -> BTreeSet<IngredientId> {
        let asked: BTreeSet<IngredientId> = self.follow_up(matched).iter().map(|r| r.id).collect();
        if asked.is_empty() {
            return BTreeSet::new();
        }

        let mut ids = BTreeSet::new();
        for (name, value) in answers {
            let name = name.replace('_', " ");
            let id = match Decision::parse(value) {
                Decision::Include => self.id_of(&name),
                Decision::Exclude => None,
                Decision::Choose(choice) => self.id_of(&choice),
            };
            ids.extend(id.filter(|id| asked.contains(id)));
        }
        ids
    }

    /// Rules answered by `"Found <Name>"` flags: every group-4 rule, plus
    /// the group-5 rule the label text calls for. Without label text every
    /// group-5 rule is accepted.
    fn flag_rules(&self, label_text: Option<&str>) -> Vec<&Rule> {
        let probe = label_text.map(Self::group5_probe);
        let mut rules = self.group4();
        rules.extend(self.rules.iter().filter(|r| {
            r.group == 5
                && match probe {
                    None => true,
                    Some(p) => p.is_some_and(|p| r.name.eq_ignore_ascii_case(p.rule_name())),
                }
        }));
        rules
    }

    /// Identifiers from `"Found <Name>": flag` answers (groups 4 and 5).
    pub fn resolve_flags(
        &self,
        answers: &BTreeMap<String, Value>,
        label_text: Option<&str>,
    ) -> BTreeSet<IngredientId> {
        let asked = self.flag_rules(label_text);
        answers
            .iter()
            .filter(|(_, flag)| is_truthy(flag))
            .filter_map(|(key, _)| {
                let name = key.replace("Found ", "");
                asked
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
                    .map(|r| r.id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &str = "\
Name,ReportedInactiveID,Group,FDB_HICDDESC,Rule
Sulfites,201,2,Sodium Metabisulfite,include when injectable
Aspartame,202,2,Aspartame,include when oral
Lactose (milk),301,3,Lactose,choose by source
Lactose (non-milk),302,3,Lactose,choose by source
Gluten,401,4,,any wheat derivative
Latex,501,5,,latex mention
Rubber,502,5,,rubber mention
";

    fn table() -> RulesTable {
        RulesTable::from_csv(RULES, &[]).unwrap()
    }

    #[test]
    fn follow_up_selects_triggered_rules() {
        let matched = BTreeSet::from(["lactose".to_string(), "talc".to_string()]);
        let rules = table();
        let names: Vec<_> = rules.follow_up(&matched).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Lactose (milk)", "Lactose (non-milk)"]);
    }

    #[test]
    fn group_filter_on_load() {
        let rules = RulesTable::from_csv(RULES, &[4, 5]).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules.group4().len(), 1);
        assert!(rules.id_of("sulfites").is_none());
    }

    #[test]
    fn group2_3_decisions() {
        let answers = BTreeMap::from([
            ("Sulfites".to_string(), "Include".to_string()),
            ("Aspartame".to_string(), "Exclude".to_string()),
            ("Lactose_source".to_string(), "Lactose (non-milk)".to_string()),
            ("Unknown_thing".to_string(), "Include".to_string()),
        ]);
        let matched = BTreeSet::from([
            "sodium metabisulfite".to_string(),
            "aspartame".to_string(),
            "lactose".to_string(),
        ]);
        assert_eq!(table().resolve_group2_3(&answers, &matched), BTreeSet::from([201, 302]));
    }

    #[test]
    fn group2_3_needs_its_trigger() {
        let answers = BTreeMap::from([
            ("Sulfites".to_string(), "Include".to_string()),
            ("Lactose_source".to_string(), "Lactose (milk)".to_string()),
        ]);
        let rules = table();

        let lactose_only = BTreeSet::from(["lactose".to_string()]);
        assert_eq!(rules.resolve_group2_3(&answers, &lactose_only), BTreeSet::from([301]));

        let nothing_matched = BTreeSet::new();
        assert!(rules.resolve_group2_3(&answers, &nothing_matched).is_empty());
    }

    #[test]
    fn flag_answers() {
        let answers = BTreeMap::from([
            ("Found Gluten".to_string(), json!(1)),
            ("Found Latex".to_string(), json!("0")),
            ("Found Rubber".to_string(), json!("1")),
            ("Found Peanut".to_string(), json!(1)),
        ]);
        assert_eq!(table().resolve_flags(&answers, None), BTreeSet::from([401, 502]));
    }

    #[test]
    fn flags_only_answer_groups_4_and_5() {
        let answers = BTreeMap::from([
            ("Found Sulfites".to_string(), json!(1)),
            ("Found Gluten".to_string(), json!(1)),
        ]);
        assert_eq!(table().resolve_flags(&answers, None), BTreeSet::from([401]));
    }

    #[test]
    fn group5_flag_follows_label_text() {
        let answers = BTreeMap::from([
            ("Found Latex".to_string(), json!(1)),
            ("Found Rubber".to_string(), json!(1)),
        ]);
        let rules = table();
        assert_eq!(
            rules.resolve_flags(&answers, Some("stopper made with natural rubber latex")),
            BTreeSet::from([501])
        );
        assert_eq!(rules.resolve_flags(&answers, Some("rubber stopper")), BTreeSet::from([502]));
        assert!(rules.resolve_flags(&answers, Some("film-coated tablets")).is_empty());
    }

    #[test]
    fn group5_probe_prefers_latex() {
        assert_eq!(RulesTable::group5_probe("Vial stopper is not made with natural rubber LATEX"), Some(Group5Probe::Latex));
        assert_eq!(RulesTable::group5_probe("rubber stopper"), Some(Group5Probe::Rubber));
        assert_eq!(RulesTable::group5_probe("tablets"), None);
        assert_eq!(table().id_of(Group5Probe::Rubber.rule_name()), Some(502));
    }
}

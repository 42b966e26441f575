use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::alias::{AliasTableOptions, DEFAULT_DESCRIPTION_FIELD};
use crate::error::ReconError;
use crate::model::Group;

pub const ALL_GROUPS: [Group; 5] = [1, 2, 3, 4, 5];
pub const KNOWN_ALIAS_TYPES: [&str; 3] = ["SYN", "PT", "UNII"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything a run needs, replacing process-wide environment settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub batch: Option<BatchConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "inactive ingredients".into()
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// Reference table paths, relative to the config file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    /// Reported-inactive table (`LLM03_RI`).
    pub inactive: PathBuf,
    /// Alias table (`LLM04_RI_ALIAS`).
    pub aliases: PathBuf,
    #[serde(default = "default_description_field")]
    pub description_field: String,
    /// NDC -> SPL table (`LLM01_NDCSPL`).
    pub ndc_spl: PathBuf,
    /// NDC -> reported inactive table (`LLM02_NDCRI`).
    pub ndc_ri: PathBuf,
    /// Group 2-5 rules table. Without it only group 1 is extracted.
    #[serde(default)]
    pub rules: Option<PathBuf>,
}

fn default_description_field() -> String {
    DEFAULT_DESCRIPTION_FIELD.into()
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_groups")]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub alias_types: Option<Vec<String>>,
    #[serde(default)]
    pub level: Level,
}

fn default_groups() -> Vec<Group> {
    ALL_GROUPS.to_vec()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            groups: default_groups(),
            alias_types: None,
            level: Level::default(),
        }
    }
}

/// Whether a search names a whole label (SetID) or one package (raw NDC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[serde(alias = "setid")]
    SetId,
    #[default]
    Ndc,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetId => write!(f, "setid"),
            Self::Ndc => write!(f, "ndc"),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Directory of `<search>.json` answer files.
    pub answers_dir: PathBuf,
    pub searches: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<PathBuf>,
    /// Directory receiving one `run_<timestamp>.log` per batch run.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let groups = &self.selection.groups;
        if groups.is_empty() {
            return Err(ReconError::ConfigValidation(
                "selection.groups must name at least one group".into(),
            ));
        }
        if let Some(bad) = groups.iter().find(|g| !ALL_GROUPS.contains(*g)) {
            return Err(ReconError::ConfigValidation(format!(
                "group must be 1..=5, got {bad}"
            )));
        }

        if let Some(types) = &self.selection.alias_types {
            if let Some(bad) = types.iter().find(|t| !KNOWN_ALIAS_TYPES.contains(&t.as_str())) {
                return Err(ReconError::ConfigValidation(format!(
                    "unknown alias type '{bad}' (expected one of {})",
                    KNOWN_ALIAS_TYPES.join(", ")
                )));
            }
        }

        if self.reference.description_field.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "reference.description_field must not be empty".into(),
            ));
        }

        if let Some(batch) = &self.batch {
            if batch.searches.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "batch.searches must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Loader options for the alias table.
    pub fn alias_options(&self) -> AliasTableOptions {
        AliasTableOptions {
            groups: self.selection.groups.clone(),
            alias_types: self.selection.alias_types.clone(),
            description_field: self.reference.description_field.clone(),
        }
    }

    /// Rewrite every relative path against `base` (the config file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.reference.inactive);
        join(&mut self.reference.aliases);
        join(&mut self.reference.ndc_spl);
        join(&mut self.reference.ndc_ri);
        if let Some(rules) = self.reference.rules.as_mut() {
            join(rules);
        }
        if let Some(batch) = self.batch.as_mut() {
            join(&mut batch.answers_dir);
        }
        if let Some(json) = self.output.json.as_mut() {
            join(json);
        }
        if let Some(dir) = self.output.log_dir.as_mut() {
            join(dir);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[reference]
inactive = "data/LLM03_RI.txt"
aliases  = "data/LLM04_RI_ALIAS.txt"
ndc_spl  = "data/LLM01_NDCSPL.txt"
ndc_ri   = "data/LLM02_NDCRI.txt"
"#;

    #[test]
    fn parse_minimal_defaults() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "inactive ingredients");
        assert_eq!(config.selection.groups, vec![1, 2, 3, 4, 5]);
        assert_eq!(config.selection.level, Level::Ndc);
        assert!(config.selection.alias_types.is_none());
        assert_eq!(config.reference.description_field, "FDB_HICDDESC");
        assert!(config.reference.rules.is_none());
        assert!(config.batch.is_none());
    }

    #[test]
    fn parse_full() {
        let input = format!(
            r#"name = "Canada run"
{MINIMAL}
rules = "data/LLM05_GROUP_2-5_RULES.csv"

[selection]
groups = [1, 2]
alias_types = ["SYN", "PT"]
level = "setid"

[batch]
answers_dir = "answers"
searches = ["0591-0860-01", "0591-0860-05"]

[output]
json = "out/result.json"
log_dir = "logs"
"#
        );
        let config = RunConfig::from_toml(&input).unwrap();
        assert_eq!(config.name, "Canada run");
        assert_eq!(config.selection.level, Level::SetId);
        assert_eq!(config.selection.groups, vec![1, 2]);
        assert_eq!(config.batch.as_ref().unwrap().searches.len(), 2);
        assert!(config.reference.rules.is_some());

        let options = config.alias_options();
        assert_eq!(options.groups, vec![1, 2]);
        assert_eq!(options.alias_types.unwrap(), vec!["SYN", "PT"]);
    }

    #[test]
    fn level_accepts_set_id_spelling() {
        let input = format!("{MINIMAL}\n[selection]\nlevel = \"set_id\"\n");
        let config = RunConfig::from_toml(&input).unwrap();
        assert_eq!(config.selection.level, Level::SetId);
    }

    #[test]
    fn reject_bad_group() {
        let input = format!("{MINIMAL}\n[selection]\ngroups = [1, 6]\n");
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("got 6"));
    }

    #[test]
    fn reject_empty_groups() {
        let input = format!("{MINIMAL}\n[selection]\ngroups = []\n");
        assert!(RunConfig::from_toml(&input).is_err());
    }

    #[test]
    fn reject_unknown_alias_type() {
        let input = format!("{MINIMAL}\n[selection]\nalias_types = [\"SYN\", \"NICK\"]\n");
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'NICK'"));
    }

    #[test]
    fn reject_empty_searches() {
        let input = format!("{MINIMAL}\n[batch]\nanswers_dir = \"a\"\nsearches = []\n");
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("batch.searches"));
    }

    #[test]
    fn reject_unknown_level() {
        let input = format!("{MINIMAL}\n[selection]\nlevel = \"package\"\n");
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn resolve_relative_paths() {
        let input = format!("{MINIMAL}\n[batch]\nanswers_dir = \"/abs/answers\"\nsearches = [\"x\"]\n");
        let mut config = RunConfig::from_toml(&input).unwrap();
        config.resolve_paths(Path::new("/runs/canada"));
        assert_eq!(config.reference.inactive, PathBuf::from("/runs/canada/data/LLM03_RI.txt"));
        assert_eq!(config.batch.unwrap().answers_dir, PathBuf::from("/abs/answers"));
    }
}

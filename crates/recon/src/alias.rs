//! Canonical ingredient table: name -> aliases, group, identifiers.
//!
//! Built once per run from the reported-inactive and alias reference tables,
//! read-only afterwards. Alias token keys are computed at build time so the
//! matcher never re-decomposes the vocabulary.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::ReconError;
use crate::model::{Group, IngredientId};
use crate::table::CsvTable;
use crate::tokenize::{token_key, TokenKey};

pub const DEFAULT_DESCRIPTION_FIELD: &str = "FDB_HICDDESC";

/// One canonical ingredient.
#[derive(Debug, Clone)]
pub struct Ingredient {
    pub name: String,
    /// Deduplicated, non-empty, includes `name`.
    pub aliases: Vec<String>,
    pub group: Group,
    pub ids: BTreeSet<IngredientId>,
    alias_keys: Vec<TokenKey>,
}

impl Ingredient {
    pub fn new(
        name: &str,
        aliases: impl IntoIterator<Item = impl AsRef<str>>,
        group: Group,
        ids: impl IntoIterator<Item = IngredientId>,
    ) -> Self {
        let name = name.trim().to_lowercase();

        let mut unique: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = alias.as_ref().trim().to_lowercase();
            if !alias.is_empty() && !unique.contains(&alias) {
                unique.push(alias);
            }
        }
        if !name.is_empty() && !unique.contains(&name) {
            unique.push(name.clone());
        }

        let alias_keys = unique.iter().map(|a| token_key(a, false)).collect();

        Self {
            name,
            aliases: unique,
            group,
            ids: ids.into_iter().collect(),
            alias_keys,
        }
    }

    /// Token keys of `aliases`, same order.
    pub fn alias_keys(&self) -> &[TokenKey] {
        &self.alias_keys
    }

    /// The identifier reported for this ingredient when it matches.
    pub fn primary_id(&self) -> Option<IngredientId> {
        self.ids.first().copied()
    }
}

/// Row selection applied while loading the reference tables.
#[derive(Debug, Clone)]
pub struct AliasTableOptions {
    /// Keep only these groups; empty keeps all.
    pub groups: Vec<Group>,
    /// Keep only these alias types (`SYN`, `PT`, `UNII`); `None` keeps all.
    pub alias_types: Option<Vec<String>>,
    /// Column of the inactive table holding the canonical name.
    pub description_field: String,
}

impl Default for AliasTableOptions {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            alias_types: None,
            description_field: DEFAULT_DESCRIPTION_FIELD.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<Ingredient>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<IngredientId, usize>,
}

impl AliasTable {
    /// Build from ingredients in the given order. A later entry with the
    /// same name replaces an earlier one.
    pub fn from_ingredients(ingredients: impl IntoIterator<Item = Ingredient>) -> Self {
        let mut table = Self::default();
        for ingredient in ingredients {
            table.insert(ingredient);
        }
        table
    }

    fn insert(&mut self, ingredient: Ingredient) {
        let idx = match self.by_name.get(&ingredient.name) {
            Some(&idx) => {
                self.entries[idx] = ingredient;
                idx
            }
            None => {
                self.entries.push(ingredient);
                self.entries.len() - 1
            }
        };
        let entry = &self.entries[idx];
        self.by_name.insert(entry.name.clone(), idx);
        for &id in &entry.ids {
            self.by_id.insert(id, idx);
        }
    }

    /// Load from the reported-inactive table (`ReportedInactiveID`,
    /// `GroupNumber`, description column) and the alias table
    /// (`ReportedInactiveID`, `Alias`, `AliasType`).
    ///
    /// Every selected inactive row survives even without aliases. Rows are
    /// grouped by lowercase canonical name; entries come out in ascending
    /// name order.
    pub fn from_csv(
        inactive_csv: &str,
        alias_csv: &str,
        options: &AliasTableOptions,
    ) -> Result<Self, ReconError> {
        let inactive = CsvTable::parse("inactive", inactive_csv)?;
        let id_idx = inactive.column("ReportedInactiveID")?;
        let group_idx = inactive.column("GroupNumber")?;
        let desc_idx = inactive.column(&options.description_field)?;

        let alias = CsvTable::parse("alias", alias_csv)?;
        let alias_id_idx = alias.column("ReportedInactiveID")?;
        let alias_idx = alias.column("Alias")?;
        let alias_type_idx = match options.alias_types {
            Some(_) => Some(alias.column("AliasType")?),
            None => None,
        };

        let mut aliases_by_id: HashMap<IngredientId, Vec<String>> = HashMap::new();
        for row in alias.rows() {
            if let (Some(types), Some(ti)) = (&options.alias_types, alias_type_idx) {
                let kind = row.text(ti);
                if !types.iter().any(|t| t.eq_ignore_ascii_case(kind)) {
                    continue;
                }
            }
            let id: IngredientId = row.parse(alias_id_idx)?;
            aliases_by_id
                .entry(id)
                .or_default()
                .push(row.text(alias_idx).to_string());
        }

        // name -> (aliases in first-seen order, first group, ids)
        let mut grouped: BTreeMap<String, (Vec<String>, Group, BTreeSet<IngredientId>)> =
            BTreeMap::new();
        for row in inactive.rows() {
            let group: Group = row.parse(group_idx)?;
            if !options.groups.is_empty() && !options.groups.contains(&group) {
                continue;
            }
            let id: IngredientId = row.parse(id_idx)?;
            let name = row.text(desc_idx).to_lowercase();

            let entry = grouped
                .entry(name)
                .or_insert_with(|| (Vec::new(), group, BTreeSet::new()));
            if let Some(aliases) = aliases_by_id.get(&id) {
                entry.0.extend(aliases.iter().cloned());
            }
            entry.2.insert(id);
        }

        let table = Self::from_ingredients(
            grouped
                .into_iter()
                .map(|(name, (aliases, group, ids))| Ingredient::new(&name, aliases, group, ids)),
        );

        debug!(
            ingredients = table.len(),
            aliases = table.entries.iter().map(|e| e.aliases.len()).sum::<usize>(),
            "loaded alias table"
        );

        Ok(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ingredient> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Ingredient> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn by_id(&self, id: IngredientId) -> Result<&Ingredient, ReconError> {
        self.by_id
            .get(&id)
            .map(|&i| &self.entries[i])
            .ok_or(ReconError::UnknownIngredientId(id))
    }

    pub fn name_of(&self, id: IngredientId) -> Result<&str, ReconError> {
        self.by_id(id).map(|e| e.name.as_str())
    }

    pub fn group_of(&self, id: IngredientId) -> Result<Group, ReconError> {
        self.by_id(id).map(|e| e.group)
    }

    /// Every identifier known to the table.
    pub fn ids(&self) -> BTreeSet<IngredientId> {
        self.by_id.keys().copied().collect()
    }
}

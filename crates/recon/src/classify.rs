use std::collections::BTreeSet;

use crate::alias::AliasTable;
use crate::error::ReconError;
use crate::model::{Comparison, DiffEntry, IngredientId};

/// Compare ground-truth identifiers against found identifiers.
///
/// Both sides are sorted and deduplicated. Every identifier that ends up in
/// `missing` or `extra` must resolve through `table`; a miss means the
/// reference data and the ground truth disagree and is returned as
/// `UnknownIngredientId`.
pub fn compare(
    expected: impl IntoIterator<Item = IngredientId>,
    found: impl IntoIterator<Item = IngredientId>,
    table: &AliasTable,
) -> Result<Comparison, ReconError> {
    let expected: BTreeSet<IngredientId> = expected.into_iter().collect();
    let found: BTreeSet<IngredientId> = found.into_iter().collect();

    let missing = resolve(expected.difference(&found), table)?;
    let extra = resolve(found.difference(&expected), table)?;

    Ok(Comparison {
        expected: expected.into_iter().collect(),
        found: found.into_iter().collect(),
        missing,
        extra,
    })
}

fn resolve<'a>(
    ids: impl Iterator<Item = &'a IngredientId>,
    table: &AliasTable,
) -> Result<Vec<DiffEntry>, ReconError> {
    ids.map(|&id| {
        let ingredient = table.by_id(id)?;
        Ok(DiffEntry {
            id,
            name: ingredient.name.clone(),
            group: ingredient.group,
        })
    })
    .collect()
}

/// `[3, 7, 9]`
pub fn format_id_list(ids: &[IngredientId]) -> String {
    let parts: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn join_names(entries: &[DiffEntry]) -> String {
    entries
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-line report: `all ok.`, or the missing / too-much names followed by
/// both identifier lists.
pub fn format_simple(c: &Comparison) -> String {
    if c.is_ok() {
        return "all ok.".into();
    }

    let mut parts = Vec::with_capacity(4);
    if !c.missing.is_empty() {
        parts.push(format!("missing: {}", join_names(&c.missing)));
    }
    if !c.extra.is_empty() {
        parts.push(format!("too much: {}", join_names(&c.extra)));
    }
    parts.push(format!("expected: {}", format_id_list(&c.expected)));
    parts.push(format!("got: {}", format_id_list(&c.found)));
    parts.join(" ; ")
}

/// Multi-line report naming both sides.
pub fn format_labeled(c: &Comparison, expected_label: &str, found_label: &str) -> String {
    let mut lines = vec![format!("'{expected_label}' vs '{found_label}'")];

    if c.missing.is_empty() {
        lines.push(format!("All in '{expected_label}' in '{found_label}'"));
    } else {
        lines.push(format!(
            "In '{expected_label}' not in '{found_label}': {}",
            join_names(&c.missing)
        ));
    }

    if c.extra.is_empty() {
        lines.push(format!("All in '{found_label}' in '{expected_label}'"));
    } else {
        lines.push(format!(
            "In '{found_label}' not in '{expected_label}': {}",
            join_names(&c.extra)
        ));
    }

    lines.join("\n")
}

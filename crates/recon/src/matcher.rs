use std::collections::BTreeSet;

use crate::alias::{AliasTable, Ingredient};
use crate::model::{CandidateLists, IngredientId};
use crate::tokenize::{token_key, TokenKey};

/// Canonical ingredients matched by the candidate lists, in table order.
///
/// Steps:
/// 1. Every `inactive` name contributes two keys: as written, and with its
///    parenthetical stripped (empty when there is none).
/// 2. Ink-only names are the `inprint` keys not also in `inprint_outside`.
/// 3. Inactive keys equal to an ink-only key are dropped, as are empty keys.
/// 4. For each ingredient, the first alias whose key is still in the working
///    list matches; exactly one occurrence of that key is consumed.
pub fn match_ingredients<'t>(
    candidates: &CandidateLists,
    table: &'t AliasTable,
) -> Vec<&'t Ingredient> {
    let outside: Vec<TokenKey> = candidates
        .inprint_outside
        .iter()
        .map(|s| token_key(s, false))
        .collect();

    let ink_only: Vec<TokenKey> = candidates
        .inprint
        .iter()
        .map(|s| token_key(s, false))
        .filter(|k| !k.is_empty() && !outside.contains(k))
        .collect();

    let mut working: Vec<TokenKey> = candidates
        .inactive
        .iter()
        .map(|s| token_key(s, false))
        .chain(candidates.inactive.iter().map(|s| token_key(s, true)))
        .filter(|k| !k.is_empty() && !ink_only.contains(k))
        .collect();

    let mut matched = Vec::new();

    for ingredient in table.iter() {
        if working.is_empty() {
            break;
        }
        for key in ingredient.alias_keys() {
            if let Some(pos) = working.iter().position(|w| w == key) {
                working.remove(pos);
                matched.push(ingredient);
                break;
            }
        }
    }

    matched
}

/// Validated identifier set for a document's candidate lists.
///
/// Each matched ingredient contributes its primary identifier.
pub fn filter_valid_ingredients(
    candidates: &CandidateLists,
    table: &AliasTable,
) -> BTreeSet<IngredientId> {
    match_ingredients(candidates, table)
        .into_iter()
        .filter_map(Ingredient::primary_id)
        .collect()
}

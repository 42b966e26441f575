// Property-based tests for tokenizer, matcher and comparison laws.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use inactives_recon::classify::compare;
use inactives_recon::matcher::match_ingredients;
use inactives_recon::model::CandidateLists;
use inactives_recon::tokenize::{decompose, token_key, IGNORED_TOKENS};
use inactives_recon::{filter_valid_ingredients, AliasTable, Ingredient};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Fixtures + Generators
// ---------------------------------------------------------------------------

const VOCAB: [&str; 6] = ["talc", "lactose", "shellac", "starch", "gelatin", "sucrose"];

/// One ingredient per vocabulary word, ids 1..=6, no extra aliases.
fn vocab_table() -> AliasTable {
    AliasTable::from_ingredients(
        VOCAB
            .iter()
            .zip(1u32..)
            .map(|(name, id)| Ingredient::new(name, Vec::<String>::new(), 1, [id])),
    )
}

/// Candidate names: mostly vocabulary words in random case, sometimes noise.
fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0..VOCAB.len(), any::<bool>()).prop_map(|(i, upper)| {
            if upper { VOCAB[i].to_uppercase() } else { VOCAB[i].to_string() }
        }),
        1 => "[a-z]{3,8}",
    ]
}

fn arb_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_name(), 0..max)
}

fn arb_ids() -> impl Strategy<Value = BTreeSet<u32>> {
    prop::collection::btree_set(1u32..=6, 0..6)
}

fn lower_set(names: &[String]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_lowercase()).collect()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn no_parenthetical_no_variant(s in "[A-Za-z0-9&. ]{0,30}") {
        prop_assert!(decompose(&s, true).is_empty());
    }

    #[test]
    fn tokens_lowercase_and_never_ignored(s in "[A-Za-z0-9&. ()]{0,40}") {
        for token in decompose(&s, false) {
            prop_assert_eq!(token.clone(), token.to_lowercase());
            prop_assert!(!IGNORED_TOKENS.contains(&token.as_str()));
        }
    }

    #[test]
    fn token_key_ignores_case(s in "[A-Za-z0-9&. ]{0,30}") {
        prop_assert_eq!(token_key(&s.to_uppercase(), false), token_key(&s, false));
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// With single-word ingredients the matched set is exactly the inactive
    /// names that are in the table and not ink-only.
    #[test]
    fn matched_set_oracle(
        inactive in arb_names(10),
        inprint in arb_names(4),
        outside in arb_names(3),
    ) {
        let table = vocab_table();
        let candidates = CandidateLists {
            inactive: inactive.clone(),
            inprint: inprint.clone(),
            inprint_outside: outside.clone(),
        };

        let outside = lower_set(&outside);
        let ink_only: BTreeSet<String> = lower_set(&inprint)
            .into_iter()
            .filter(|n| !outside.contains(n))
            .collect();
        let expected: BTreeSet<String> = lower_set(&inactive)
            .into_iter()
            .filter(|n| VOCAB.contains(&n.as_str()) && !ink_only.contains(n))
            .collect();

        let matched: BTreeSet<String> = match_ingredients(&candidates, &table)
            .into_iter()
            .map(|i| i.name.clone())
            .collect();
        prop_assert_eq!(matched, expected);
    }

    #[test]
    fn filtering_is_idempotent(inactive in arb_names(10), inprint in arb_names(4)) {
        let table = vocab_table();
        let candidates = CandidateLists {
            inactive,
            inprint,
            inprint_outside: Vec::new(),
        };
        let first = filter_valid_ingredients(&candidates, &table);
        let second = filter_valid_ingredients(&candidates, &table);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn inactive_order_does_not_matter(inactive in arb_names(10)) {
        let table = vocab_table();
        let mut reversed = inactive.clone();
        reversed.reverse();
        let forward = CandidateLists { inactive, ..Default::default() };
        let backward = CandidateLists { inactive: reversed, ..Default::default() };
        prop_assert_eq!(
            filter_valid_ingredients(&forward, &table),
            filter_valid_ingredients(&backward, &table)
        );
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn comparison_partitions_sets(expected in arb_ids(), found in arb_ids()) {
        let c = compare(expected.iter().copied(), found.iter().copied(), &vocab_table()).unwrap();

        let missing: BTreeSet<u32> = c.missing.iter().map(|e| e.id).collect();
        let extra: BTreeSet<u32> = c.extra.iter().map(|e| e.id).collect();

        prop_assert_eq!(&missing, &expected.difference(&found).copied().collect::<BTreeSet<u32>>());
        prop_assert_eq!(&extra, &found.difference(&expected).copied().collect::<BTreeSet<u32>>());
        prop_assert_eq!(c.is_ok(), expected == found);
        prop_assert!(c.expected.windows(2).all(|w| w[0] < w[1]));
    }
}

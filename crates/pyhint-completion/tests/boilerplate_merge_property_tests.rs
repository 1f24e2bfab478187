/// Property-based tests for merging boilerplate into scope results

use std::collections::HashSet;

use proptest::prelude::*;
use pyhint_cache::{Candidate, CandidateCategory};
use pyhint_completion::mix_boilerplate;

/// Strategy for generating candidate words, mixed case so sorting matters
fn word_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,8}".prop_map(|s| s.to_string())
}

fn candidates_strategy() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec(word_strategy(), 0..20).prop_map(|words| {
        words
            .into_iter()
            .map(|word| Candidate::new(word, CandidateCategory::Vars))
            .collect()
    })
}

fn word_set(candidates: &[Candidate]) -> HashSet<String> {
    candidates.iter().map(|c| c.word.clone()).collect()
}

proptest! {
    /// Property: every display text appears exactly once
    #[test]
    fn prop_merge_has_no_duplicate_words(
        boilerplate in candidates_strategy(),
        completions in candidates_strategy()
    ) {
        let merged = mix_boilerplate(&boilerplate, &completions);
        let unique = word_set(&merged);
        prop_assert_eq!(unique.len(), merged.len());
    }

    /// Property: nothing is lost and nothing is invented
    #[test]
    fn prop_merge_keeps_every_word(
        boilerplate in candidates_strategy(),
        completions in candidates_strategy()
    ) {
        let merged = mix_boilerplate(&boilerplate, &completions);
        let mut expected = word_set(&boilerplate);
        expected.extend(word_set(&completions));
        prop_assert_eq!(word_set(&merged), expected);
    }

    /// Property: output is sorted case-insensitively
    #[test]
    fn prop_merge_is_sorted_ignoring_case(
        boilerplate in candidates_strategy(),
        completions in candidates_strategy()
    ) {
        let merged = mix_boilerplate(&boilerplate, &completions);
        for pair in merged.windows(2) {
            prop_assert!(pair[0].word.to_lowercase() <= pair[1].word.to_lowercase());
        }
    }

    /// Property: swapping the two inputs yields the same words in the same order
    /// whenever no two distinct words differ only by case
    #[test]
    fn prop_merge_order_is_commutative(
        boilerplate in candidates_strategy(),
        completions in candidates_strategy()
    ) {
        let mut all = word_set(&boilerplate);
        all.extend(word_set(&completions));
        let folded: HashSet<String> = all.iter().map(|w| w.to_lowercase()).collect();
        prop_assume!(folded.len() == all.len());

        let forward: Vec<String> = mix_boilerplate(&boilerplate, &completions)
            .into_iter()
            .map(|c| c.word)
            .collect();
        let backward: Vec<String> = mix_boilerplate(&completions, &boilerplate)
            .into_iter()
            .map(|c| c.word)
            .collect();
        prop_assert_eq!(forward, backward);
    }
}

//! Merging the always-on boilerplate set into scope results

use std::collections::HashSet;

use pyhint_cache::Candidate;

/// Merge `boilerplate` into `completions`.
///
/// Both sets are sorted together case-insensitively (stable, boilerplate
/// first on ties) and each display text is emitted once, first occurrence
/// winning.
pub fn mix_boilerplate(boilerplate: &[Candidate], completions: &[Candidate]) -> Vec<Candidate> {
    let mut merged: Vec<&Candidate> = boilerplate.iter().chain(completions).collect();
    merged.sort_by_cached_key(|c| c.text().to_lowercase());

    let mut seen = HashSet::with_capacity(merged.len());
    let mut mixed = Vec::with_capacity(merged.len());
    for candidate in merged {
        if seen.insert(candidate.text()) {
            mixed.push(candidate.clone());
        }
    }
    mixed
}

#[cfg(test)]
mod tests {
    use pyhint_cache::CandidateCategory;

    use super::*;

    fn words(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(Candidate::text).collect()
    }

    fn vars(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|name| Candidate::new(*name, CandidateCategory::Vars))
            .collect()
    }

    #[test]
    fn test_merge_dedups_and_sorts() {
        let boilerplate = vars(&["len"]);
        let result = vars(&["len", "abs"]);
        assert_eq!(words(&mix_boilerplate(&boilerplate, &result)), vec!["abs", "len"]);
    }

    #[test]
    fn test_sort_ignores_case() {
        let merged = mix_boilerplate(&vars(&["Zed", "alpha"]), &vars(&["Beta"]));
        assert_eq!(words(&merged), vec!["alpha", "Beta", "Zed"]);
    }

    #[test]
    fn test_case_variants_are_distinct() {
        let merged = mix_boilerplate(&vars(&["None"]), &vars(&["none"]));
        assert_eq!(words(&merged), vec!["None", "none"]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let boilerplate = vec![Candidate::new("print", CandidateCategory::Function)];
        let result = vec![Candidate::new("print", CandidateCategory::Vars)];
        let merged = mix_boilerplate(&boilerplate, &result);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].category, CandidateCategory::Function);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(mix_boilerplate(&[], &[]).is_empty());
        assert_eq!(words(&mix_boilerplate(&vars(&["abs"]), &[])), vec!["abs"]);
    }
}

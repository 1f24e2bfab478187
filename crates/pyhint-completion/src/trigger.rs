//! When to complete, where the completed word starts, and import filtering

use std::sync::OnceLock;

use pyhint_cache::CandidateCategory;
use regex::Regex;

/// Inputs that always trigger completion: attribute access, decorators and
/// import statements
fn trigger_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"[^. \t0-9]\.\w*$|",
            r"^\s*@\w*$|",
            r"^\s*from\s.+import \w*|",
            r"^\s*from \w*|",
            r"^\s*import \w*",
        ))
        .expect("Invalid regex")
    })
}

fn word_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\w*$").expect("Invalid regex"))
}

fn import_start_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\s*(from|import)\s+").expect("Invalid regex"))
}

fn from_module_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\s*from\s+\S+\s+").expect("Invalid regex"))
}

/// Byte offset where the word under the cursor starts
pub fn complete_position(input: &str) -> usize {
    word_regex()
        .find(input)
        .map_or(input.len(), |m| m.start())
}

/// Whether `input` should trigger a completion request
pub fn is_trigger_input(input: &str, min_length: usize) -> bool {
    if trigger_regex().is_match(input) {
        return true;
    }
    let word = &input[complete_position(input)..];
    word.chars().count() >= min_length
}

/// Category the results must be restricted to, if any.
///
/// While the module name of an `import`/`from` statement is being typed only
/// modules make sense; once past `from X ` anything importable does.
pub fn import_filter(input: &str) -> Option<CandidateCategory> {
    if import_start_regex().is_match(input) && !from_module_regex().is_match(input) {
        Some(CandidateCategory::Module)
    } else {
        None
    }
}

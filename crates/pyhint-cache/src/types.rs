//! Completion payload types shared by the cache, the workers and the source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::CacheKey;
use crate::strategy::ModuleMtimes;

/// Closed set of candidate categories reported by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateCategory {
    Module,
    Vars,
    Class,
    Function,
    Instance,
    Keyword,
    Param,
    Property,
    Statement,
    Path,
}

impl CandidateCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Vars => "vars",
            Self::Class => "class",
            Self::Function => "function",
            Self::Instance => "instance",
            Self::Keyword => "keyword",
            Self::Param => "param",
            Self::Property => "property",
            Self::Statement => "statement",
            Self::Path => "path",
        }
    }

    /// Abbreviated form used when short type display is enabled
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Module => "mod",
            Self::Vars => "var",
            Self::Class => "cls",
            Self::Function => "def",
            Self::Instance => "inst",
            Self::Keyword => "kw",
            Self::Param => "prm",
            Self::Property => "prop",
            Self::Statement => "stmt",
            Self::Path => "path",
        }
    }
}

/// Free-form display metadata attached to a candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDisplay {
    /// Text shown in the menu instead of the word (e.g. with a signature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbr: Option<String>,
    /// Short description, usually the statement that defines the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<String>,
    /// Docstring excerpt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Rendered category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A single completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Display and insertion text
    pub word: String,
    pub category: CandidateCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<CandidateDisplay>,
}

impl Candidate {
    pub fn new(word: impl Into<String>, category: CandidateCategory) -> Self {
        Self {
            word: word.into(),
            category,
            display: None,
        }
    }

    pub fn with_display(mut self, display: CandidateDisplay) -> Self {
        self.display = Some(display);
        self
    }

    pub fn text(&self) -> &str {
        &self.word
    }
}

/// A computed result flowing from a worker back to the cache
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub key: CacheKey,
    /// `None` when the analysis failed
    pub completions: Option<Vec<Candidate>>,
    pub modules: ModuleMtimes,
    pub time: DateTime<Utc>,
}

impl ResultRecord {
    /// Creates a record stamped with the current time.
    pub fn new(key: CacheKey, completions: Option<Vec<Candidate>>, modules: ModuleMtimes) -> Self {
        Self::at(key, completions, modules, Utc::now())
    }

    /// Creates a record with an explicit timestamp.
    pub fn at(
        key: CacheKey,
        completions: Option<Vec<Candidate>>,
        modules: ModuleMtimes,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            completions,
            modules,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_serializes_category_lowercase() {
        let candidate = Candidate::new("path", CandidateCategory::Module);
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json, serde_json::json!({"word": "path", "category": "module"}));
    }

    #[test]
    fn test_candidate_display_roundtrip_keeps_metadata() {
        let display = CandidateDisplay {
            menu: Some("def join(a, *p)".to_string()),
            ..Default::default()
        };
        let candidate = Candidate::new("join", CandidateCategory::Function).with_display(display);
        let json = serde_json::to_string(&candidate).unwrap();
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);
        assert_eq!(back.text(), "join");
    }

    #[test]
    fn test_short_names_differ_from_long_names() {
        assert_eq!(CandidateCategory::Function.short_name(), "def");
        assert_eq!(CandidateCategory::Function.as_str(), "function");
    }
}

//! Candidate display formatting applied by workers

use pyhint_cache::Candidate;

const ELLIPSIS: &str = "...";

/// Display settings fixed at bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Maximum menu text length in characters, 0 for unlimited
    pub statement_length: usize,
    /// Render kinds with their short names
    pub short_types: bool,
    /// Keep docstring excerpts
    pub show_docstring: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            statement_length: 50,
            short_types: false,
            show_docstring: false,
        }
    }
}

impl DisplayOptions {
    pub fn format_all(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.into_iter().map(|c| self.format(c)).collect()
    }

    pub fn format(&self, mut candidate: Candidate) -> Candidate {
        let kind = if self.short_types {
            candidate.category.short_name()
        } else {
            candidate.category.as_str()
        };

        let mut display = candidate.display.take().unwrap_or_default();
        display.kind = Some(kind.to_string());
        display.menu = display.menu.map(|menu| self.truncate(menu));
        if !self.show_docstring {
            display.info = None;
        }

        candidate.display = Some(display);
        candidate
    }

    fn truncate(&self, text: String) -> String {
        if self.statement_length == 0 || text.chars().count() <= self.statement_length {
            return text;
        }
        let mut truncated: String = text.chars().take(self.statement_length).collect();
        truncated.push_str(ELLIPSIS);
        truncated
    }
}

#[cfg(test)]
mod tests {
    use pyhint_cache::{CandidateCategory, CandidateDisplay};

    use super::*;

    fn function_candidate() -> Candidate {
        Candidate::new("join", CandidateCategory::Function).with_display(CandidateDisplay {
            menu: Some("def join(a, *paths)".to_string()),
            info: Some("Join two or more pathname components".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_long_menu_is_truncated() {
        let options = DisplayOptions {
            statement_length: 8,
            ..Default::default()
        };
        let formatted = options.format(function_candidate());
        let display = formatted.display.unwrap();
        assert_eq!(display.menu.as_deref(), Some("def join..."));
    }

    #[test]
    fn test_zero_length_keeps_full_menu() {
        let options = DisplayOptions {
            statement_length: 0,
            ..Default::default()
        };
        let display = options.format(function_candidate()).display.unwrap();
        assert_eq!(display.menu.as_deref(), Some("def join(a, *paths)"));
    }

    #[test]
    fn test_docstring_dropped_unless_enabled() {
        let hidden = DisplayOptions::default().format(function_candidate());
        assert!(hidden.display.unwrap().info.is_none());

        let shown = DisplayOptions {
            show_docstring: true,
            ..Default::default()
        }
        .format(function_candidate());
        assert!(shown.display.unwrap().info.is_some());
    }

    #[test]
    fn test_kind_uses_short_types() {
        let long = DisplayOptions::default().format(function_candidate());
        assert_eq!(long.display.unwrap().kind.as_deref(), Some("function"));

        let short = DisplayOptions {
            short_types: true,
            ..Default::default()
        }
        .format(function_candidate());
        assert_eq!(short.display.unwrap().kind.as_deref(), Some("def"));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let options = DisplayOptions {
            statement_length: 3,
            ..Default::default()
        };
        let candidate = Candidate::new("x", CandidateCategory::Vars).with_display(CandidateDisplay {
            menu: Some("äöüß".to_string()),
            ..Default::default()
        });
        let display = options.format(candidate).display.unwrap();
        assert_eq!(display.menu.as_deref(), Some("äöü..."));
    }
}

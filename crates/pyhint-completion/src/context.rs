//! Cache key construction from the editing context
//!
//! [`CacheKeyBuilder`] maps the text before the cursor to the key of the
//! smallest scope whose completions answer the request, plus the files that
//! scope depends on. Two requests that would produce the same candidates map
//! to the same key, so the cache can serve one from the other's result.
//!
//! | input                   | key                                   |
//! |-------------------------|---------------------------------------|
//! | `import o`, `from o`    | `(import~)`                           |
//! | `from os.path import j` | `(os, path, module)`                  |
//! | `os.path.j` (imported)  | `(os, path)`                          |
//! | `self.x` in `A.f`       | `(buffer, A, f, self)`                |
//! | `x` in `A.f`            | `(buffer, A, f, vars)`                |

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use pyhint_cache::CacheKey;
use regex::Regex;
use tracing::trace;

fn import_sentinel_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\s*(import\s+[\w.]*(\s*,\s*[\w.]*)*|from\s+[\w.]*)$").expect("Invalid regex")
    })
}

fn from_import_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\s*from\s+(?P<dots>\.*)(?P<module>[\w.]*)\s+import\b").expect("Invalid regex")
    })
}

fn import_binding_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\s*import\s+(?P<names>[^#]+)").expect("Invalid regex"))
}

fn from_binding_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\s*from\s+(?P<module>\w[\w.]*)\s+import\s+\(?(?P<names>[^#()]+)")
            .expect("Invalid regex")
    })
}

fn scope_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\s*(?:async\s+def|def|class)\s+(?P<name>\w+)").expect("Invalid regex")
    })
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Finds the file backing a dotted module name
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    python_path: Vec<PathBuf>,
}

impl ModuleResolver {
    pub fn new(python_path: Vec<PathBuf>) -> Self {
        Self { python_path }
    }

    /// Resolve an absolute module name, searching `buffer_dir` first.
    ///
    /// `a.b.c` tries `a/b/c.py` and `a/b/c/__init__.py`, then the same for
    /// `a.b` and `a`, since the trailing names may be attributes of a parent.
    pub fn resolve(&self, dotted: &str, buffer_dir: Option<&Path>) -> Option<PathBuf> {
        let segments: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }

        let search_path = self.python_path.iter().map(PathBuf::as_path);
        let roots = buffer_dir.into_iter().chain(search_path);
        for root in roots {
            if let Some(found) = resolve_in(root, &segments) {
                return Some(found);
            }
        }
        trace!(module = dotted, "module not found");
        None
    }

    /// Resolve a relative import (`from ..pkg import x`) against `anchor`
    pub fn resolve_relative(&self, anchor: &Path, dotted: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            let init = anchor.join("__init__.py");
            return init.is_file().then_some(init);
        }
        resolve_in(anchor, &segments)
    }
}

fn resolve_in(root: &Path, segments: &[&str]) -> Option<PathBuf> {
    for len in (1..=segments.len()).rev() {
        let base: PathBuf = segments[..len]
            .iter()
            .fold(root.to_path_buf(), |path, s| path.join(s));

        let file = base.with_extension("py");
        if file.is_file() {
            return Some(file);
        }
        let init = base.join("__init__.py");
        if init.is_file() {
            return Some(init);
        }
    }
    None
}

/// Builds cache keys from the text before the cursor
#[derive(Debug, Clone, Default)]
pub struct CacheKeyBuilder {
    resolver: ModuleResolver,
}

impl CacheKeyBuilder {
    pub fn new(python_path: Vec<PathBuf>) -> Self {
        Self {
            resolver: ModuleResolver::new(python_path),
        }
    }

    /// Build the key and dependency files for a request.
    ///
    /// `line` is the 1-based cursor line, `input` the text of that line up to
    /// the cursor and `lines` the whole buffer. Returns `None` when there is
    /// nothing to complete.
    pub fn build(
        &self,
        buffer: &Path,
        line: usize,
        input: &str,
        lines: &[String],
    ) -> Option<(CacheKey, Vec<PathBuf>)> {
        let text = input.trim_start();
        let text = text.strip_prefix('@').unwrap_or(text);
        let inert = |c: char| c.is_whitespace() || c.is_ascii_digit() || c == '.';
        if text.chars().all(inert) {
            return None;
        }

        let buffer_dir = buffer.parent().filter(|dir| !dir.as_os_str().is_empty());

        if let Some(caps) = from_import_regex().captures(input) {
            let dots = caps.name("dots").map_or("", |m| m.as_str());
            let module = caps.name("module").map_or("", |m| m.as_str());
            return Some(self.from_import_key(buffer_dir, dots, module));
        }

        if import_sentinel_regex().is_match(input) {
            return Some((CacheKey::import_sentinel(), Vec::new()));
        }

        let buffer_name = buffer.to_string_lossy().into_owned();
        let buffer_deps: Vec<PathBuf> = if buffer.is_file() {
            vec![buffer.to_path_buf()]
        } else {
            Vec::new()
        };
        let scope = scope_chain(lines, line, indent_of(input));

        let head = text.trim_end_matches(is_word_char);
        if head.ends_with('.') {
            let segments = attribute_segments(head)?;
            let bindings = import_bindings(lines);
            if let Some(module) = bindings.get(segments[0].as_str()) {
                let key = CacheKey::attribute(
                    module
                        .split('.')
                        .map(str::to_string)
                        .chain(segments.into_iter().skip(1)),
                );
                let deps = self
                    .resolver
                    .resolve(&key.scope().join("."), buffer_dir)
                    .into_iter()
                    .collect();
                return Some((key, deps));
            }

            let key = CacheKey::local_attribute(buffer_name, scope.into_iter().chain(segments));
            return Some((key, buffer_deps));
        }

        Some((CacheKey::vars(buffer_name, scope), buffer_deps))
    }

    fn from_import_key(
        &self,
        buffer_dir: Option<&Path>,
        dots: &str,
        module: &str,
    ) -> (CacheKey, Vec<PathBuf>) {
        if dots.is_empty() {
            let deps = self.resolver.resolve(module, buffer_dir);
            let segments = module.split('.').filter(|s| !s.is_empty());
            return (CacheKey::module(segments), deps.into_iter().collect());
        }

        // `from .` is the buffer's own package, each further dot one level up
        let mut anchor = buffer_dir.map(Path::to_path_buf).unwrap_or_default();
        for _ in 1..dots.len() {
            anchor.pop();
        }
        let deps = self.resolver.resolve_relative(&anchor, module);
        let segments = module.split('.').filter(|s| !s.is_empty()).map(str::to_string);
        let scope = std::iter::once(anchor.to_string_lossy().into_owned()).chain(segments);
        (CacheKey::module(scope), deps.into_iter().collect())
    }
}

/// Names of the enclosing `def`/`class` blocks, outermost first
fn scope_chain(lines: &[String], line: usize, cursor_indent: usize) -> Vec<String> {
    let mut scope = Vec::new();
    let mut limit = cursor_indent;

    let end = line.saturating_sub(1).min(lines.len());
    for text in lines[..end].iter().rev() {
        if limit == 0 {
            break;
        }
        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = indent_of(text);
        if indent >= limit {
            continue;
        }
        if let Some(caps) = scope_regex().captures(text) {
            scope.push(caps["name"].to_string());
        }
        limit = indent;
    }

    scope.reverse();
    scope
}

/// Split the expression before the final dot into top-level segments,
/// e.g. `x = foo(a.b).bar.` gives `["foo(a.b)", "bar"]`
fn attribute_segments(head: &str) -> Option<Vec<String>> {
    let before = head.strip_suffix('.')?;

    let mut depth = 0usize;
    let mut start = before.len();
    for (idx, ch) in before.char_indices().rev() {
        match ch {
            ')' | ']' => depth += 1,
            '(' | '[' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            _ if depth > 0 => {}
            c if is_word_char(c) || c == '.' => {}
            _ => break,
        }
        start = idx;
    }
    if depth != 0 {
        return None;
    }

    let expr = &before[start..];
    let literal = |c: char| c == '.' || c.is_ascii_digit();
    if expr.is_empty() || expr.starts_with(literal) {
        return None;
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in expr.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return None;
    }
    Some(segments)
}

/// Local names bound by `import` statements, mapped to dotted module paths
fn import_bindings(lines: &[String]) -> HashMap<String, String> {
    let mut bindings = HashMap::new();

    for line in lines {
        if let Some(caps) = from_binding_regex().captures(line) {
            let module = &caps["module"];
            for (name, alias) in split_names(&caps["names"]) {
                if name == "*" {
                    continue;
                }
                bindings.insert(alias.to_string(), format!("{}.{}", module, name));
            }
        } else if let Some(caps) = import_binding_regex().captures(line) {
            for (name, alias) in split_names(&caps["names"]) {
                if name != alias {
                    bindings.insert(alias.to_string(), name.to_string());
                } else if let Some(top) = name.split('.').next() {
                    bindings.insert(top.to_string(), top.to_string());
                }
            }
        }
    }
    bindings
}

/// `a.b as c, d` gives `[("a.b", "c"), ("d", "d")]`
fn split_names(names: &str) -> Vec<(&str, &str)> {
    names
        .split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let name = words.next()?;
            match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => Some((name, alias)),
                _ => Some((name, name)),
            }
        })
        .collect()
}

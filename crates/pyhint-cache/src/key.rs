//! Scope-identifying cache keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Trailing category tag of a [`CacheKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTag {
    /// Attribute or expression completion, e.g. `os.path.`
    Attribute,
    /// Names importable from a module, e.g. `from os import `
    Module,
    /// Variables visible in a local scope
    Vars,
    /// A bare `import`/`from` statement
    ImportSentinel,
    /// The global always-on completion set
    Boilerplate,
}

impl KeyTag {
    /// Token appended after the key scope, if the tag contributes one.
    pub const fn token(self) -> Option<&'static str> {
        match self {
            Self::Attribute => None,
            Self::Module => Some("module"),
            Self::Vars => Some("vars"),
            Self::ImportSentinel => Some("import~"),
            Self::Boilerplate => Some("boilerplate~"),
        }
    }

    /// Tags whose cached entries are always recomputed after being served.
    pub const fn always_refresh(self) -> bool {
        matches!(self, Self::Vars | Self::ImportSentinel)
    }

    /// Tags that carry no scope at all.
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Self::ImportSentinel | Self::Boilerplate)
    }
}

/// Ordered tuple of tokens identifying a completion scope
///
/// The token sequence is `[buffer?, scope..., tag?]`. Buffer-scoped keys
/// start with the path of the buffer they were built from; module-scoped
/// keys start with a dotted module path split into segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    buffer: Option<String>,
    scope: Vec<String>,
    tag: KeyTag,
}

impl CacheKey {
    fn new(buffer: Option<String>, scope: Vec<String>, tag: KeyTag) -> Self {
        Self { buffer, scope, tag }
    }

    /// Attribute key rooted at a module path, e.g. `["os", "path"]`.
    pub fn attribute<I, S>(scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(None, collect_scope(scope), KeyTag::Attribute)
    }

    /// Attribute key on an object local to `buffer`.
    pub fn local_attribute<I, S>(buffer: impl Into<String>, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Some(buffer.into()), collect_scope(scope), KeyTag::Attribute)
    }

    /// Key for names importable from a module.
    pub fn module<I, S>(scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(None, collect_scope(scope), KeyTag::Module)
    }

    /// Key for the variables of a scope chain inside `buffer`.
    pub fn vars<I, S>(buffer: impl Into<String>, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Some(buffer.into()), collect_scope(scope), KeyTag::Vars)
    }

    /// The `import~` sentinel.
    pub fn import_sentinel() -> Self {
        Self::new(None, Vec::new(), KeyTag::ImportSentinel)
    }

    /// The `boilerplate~` sentinel.
    pub fn boilerplate() -> Self {
        Self::new(None, Vec::new(), KeyTag::Boilerplate)
    }

    pub fn tag(&self) -> KeyTag {
        self.tag
    }

    pub fn buffer(&self) -> Option<&str> {
        self.buffer.as_deref()
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn is_buffer_scoped(&self) -> bool {
        self.buffer.is_some()
    }

    /// All tokens of the key, in order.
    pub fn tokens(&self) -> Vec<&str> {
        self.buffer
            .as_deref()
            .into_iter()
            .chain(self.scope.iter().map(String::as_str))
            .chain(self.tag.token())
            .collect()
    }

    /// Number of tokens in the key.
    pub fn depth(&self) -> usize {
        usize::from(self.buffer.is_some())
            + self.scope.len()
            + usize::from(self.tag.token().is_some())
    }

    /// A key with no surrounding scope, e.g. `("os",)`.
    pub fn is_minimal(&self) -> bool {
        self.depth() == 1
    }
}

fn collect_scope<I, S>(scope: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scope.into_iter().map(Into::into).collect()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.tokens().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_vars_key_tokens() {
        let key = CacheKey::vars("mod.py", ["foo"]);
        assert_eq!(key.tokens(), vec!["mod.py", "foo", "vars"]);
        assert_eq!(key.depth(), 3);
        assert_eq!(key.tag(), KeyTag::Vars);
        assert!(key.is_buffer_scoped());
    }

    #[test]
    fn test_sentinels_are_minimal() {
        assert_eq!(CacheKey::import_sentinel().tokens(), vec!["import~"]);
        assert_eq!(CacheKey::boilerplate().tokens(), vec!["boilerplate~"]);
        assert!(CacheKey::import_sentinel().is_minimal());
        assert!(CacheKey::boilerplate().tag().is_sentinel());
    }

    #[test]
    fn test_attribute_key_depth() {
        let key = CacheKey::attribute(["os"]);
        assert!(key.is_minimal());
        assert_eq!(key.to_string(), "(os)");

        let nested = CacheKey::attribute(["os", "path"]);
        assert_eq!(nested.depth(), 2);
        assert!(!nested.is_minimal());
    }

    #[test]
    fn test_keys_hash_by_value() {
        let mut keys = HashSet::new();
        keys.insert(CacheKey::vars("a.py", ["f"]));
        keys.insert(CacheKey::vars("a.py", ["f"]));
        keys.insert(CacheKey::local_attribute("a.py", ["f"]));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_only_vars_and_import_always_refresh() {
        assert!(KeyTag::Vars.always_refresh());
        assert!(KeyTag::ImportSentinel.always_refresh());
        assert!(!KeyTag::Attribute.always_refresh());
        assert!(!KeyTag::Module.always_refresh());
        assert!(!KeyTag::Boilerplate.always_refresh());
    }

    #[test]
    fn test_key_json_shape() {
        let key = CacheKey::module(["os"]);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json, serde_json::json!({"scope": ["os"], "tag": "module"}));
        let back: CacheKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}

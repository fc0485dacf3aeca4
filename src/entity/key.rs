//! Entity identity.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use crate::model::Span;

/// Syntactic category of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ConstructKind {
    CallExpression,
    NewExpression,
    FunctionLike,
    Class,
    Interface,
}

impl ConstructKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructKind::CallExpression => "CallExpression",
            ConstructKind::NewExpression => "NewExpression",
            ConstructKind::FunctionLike => "FunctionLike",
            ConstructKind::Class => "Class",
            ConstructKind::Interface => "Interface",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of an entity: module path, source span and construct kind.
///
/// Keys order by path, then span, then kind. The string form leaves the
/// kind out, matching the keys downstream consumers already store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    path: Arc<str>,
    span: Span,
    kind: ConstructKind,
}

impl EntityKey {
    pub fn new(path: impl Into<Arc<str>>, span: Span, kind: ConstructKind) -> Self {
        Self {
            path: path.into(),
            span,
            kind,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn kind(&self) -> ConstructKind {
        self.kind
    }

    /// `<path>+<startLine>+<startChar>+<endLine>+<endChar>`
    pub fn key_string(&self) -> String {
        format!(
            "{}+{}+{}+{}+{}",
            self.path,
            self.span.start.line,
            self.span.start.character,
            self.span.end.line,
            self.span.end.character
        )
    }

    pub(crate) fn with_path(path: &Arc<str>, span: Span, kind: ConstructKind) -> Self {
        Self {
            path: Arc::clone(path),
            span,
            kind,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_string())
    }
}

impl Serialize for EntityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_string_format() {
        let span = Span::new((3, 4), (5, 5));
        let key = EntityKey::new("Adder.ts", span, ConstructKind::FunctionLike);
        assert_eq!(key.key_string(), "Adder.ts+3+4+5+5");
        assert_eq!(key.to_string(), "Adder.ts+3+4+5+5");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"Adder.ts+3+4+5+5\"");
    }

    #[test]
    fn test_key_ordering() {
        let a = EntityKey::new("a.ts", Span::new((1, 0), (2, 0)), ConstructKind::Class);
        let b = EntityKey::new("a.ts", Span::new((1, 0), (3, 0)), ConstructKind::CallExpression);
        let c = EntityKey::new("b.ts", Span::new((0, 0), (1, 0)), ConstructKind::CallExpression);
        let mut keys = vec![c.clone(), b.clone(), a.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }
}

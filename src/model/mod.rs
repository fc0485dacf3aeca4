//! Input model: one parsed source module, as produced by a front-end.
//!
//! This is the only thing the engine consumes. It can be built by the
//! tree-sitter front-end in [`crate::frontend`] or deserialized from JSON
//! produced by any other parser. Every optional field has a serde default,
//! so a minimal JSON module only needs `path` and `constructs`.

mod literal;

pub use literal::{ObjectValue, PathMap};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::ExtractError;

/// A (line, character) position, both 0-indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// Source range of a construct. `end` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: (usize, usize), end: (usize, usize)) -> Self {
        Self {
            start: Position::new(start.0, start.1),
            end: Position::new(end.0, end.1),
        }
    }

    /// True when `other` lies inside this span (bounds inclusive).
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when `other` lies inside this span and is not equal to it.
    pub fn strictly_contains(&self, other: &Span) -> bool {
        self.contains(other) && self != other
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.character, self.end.line, self.end.character
        )
    }
}

/// Syntactic category of a call argument.
///
/// `as_str` yields the TypeScript compiler's kind names, which are what
/// downstream models were trained on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxKind {
    StringLiteral,
    TemplateExpression,
    NumericLiteral,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,
    Identifier,
    PropertyAccessExpression,
    CallExpression,
    NewExpression,
    ObjectLiteralExpression,
    ArrayLiteralExpression,
    ArrowFunction,
    FunctionExpression,
    ClassExpression,
    BinaryExpression,
    #[default]
    Other,
}

impl SyntaxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyntaxKind::StringLiteral => "StringLiteral",
            SyntaxKind::TemplateExpression => "TemplateExpression",
            SyntaxKind::NumericLiteral => "NumericLiteral",
            SyntaxKind::TrueKeyword => "TrueKeyword",
            SyntaxKind::FalseKeyword => "FalseKeyword",
            SyntaxKind::NullKeyword => "NullKeyword",
            SyntaxKind::Identifier => "Identifier",
            SyntaxKind::PropertyAccessExpression => "PropertyAccessExpression",
            SyntaxKind::CallExpression => "CallExpression",
            SyntaxKind::NewExpression => "NewExpression",
            SyntaxKind::ObjectLiteralExpression => "ObjectLiteralExpression",
            SyntaxKind::ArrayLiteralExpression => "ArrayLiteralExpression",
            SyntaxKind::ArrowFunction => "ArrowFunction",
            SyntaxKind::FunctionExpression => "FunctionExpression",
            SyntaxKind::ClassExpression => "ClassExpression",
            SyntaxKind::BinaryExpression => "BinaryExpression",
            SyntaxKind::Other => "Unknown",
        }
    }

    /// String literals and templates, the only kinds whose literal is a route candidate.
    pub fn is_string_like(&self) -> bool {
        matches!(self, SyntaxKind::StringLiteral | SyntaxKind::TemplateExpression)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, SyntaxKind::TrueKeyword | SyntaxKind::FalseKeyword)
    }

    pub fn is_inline_function(&self) -> bool {
        matches!(self, SyntaxKind::ArrowFunction | SyntaxKind::FunctionExpression)
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an argument's static type has call signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callability {
    Callable,
    NonCallable,
    #[default]
    Unknown,
}

impl Callability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Callability::Callable => "callable",
            Callability::NonCallable => "non_callable",
            Callability::Unknown => "unknown",
        }
    }
}

/// How an argument or call site points at another construct of the same module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ReferenceHint {
    /// The construct written in place at this span.
    Construct(Span),
    /// A variable or declaration name, looked up in the module bindings.
    Alias(String),
}

fn any_type() -> String {
    "any".to_string()
}

/// One argument of a call or `new` expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub syntax: SyntaxKind,
    /// Best-effort static type string (`string-literal`, `lambda`, `Schema`, `any`...).
    #[serde(default = "any_type")]
    pub type_name: String,
    /// Source text of the argument.
    #[serde(default)]
    pub text: String,
    /// Static value: unquoted string contents, template body with `${}` kept,
    /// or the text of identifiers and member expressions.
    #[serde(default)]
    pub literal: Option<String>,
    /// Structural shape of object and array literals.
    #[serde(default)]
    pub shape: Option<ObjectValue>,
    #[serde(default)]
    pub callability: Callability,
    /// Parameter counts of the call signatures, when callable.
    #[serde(default)]
    pub arities: Vec<usize>,
    /// Callee text when the argument is itself a call or `new` expression.
    #[serde(default)]
    pub callee: Option<String>,
    #[serde(default)]
    pub reference: Option<ReferenceHint>,
    /// Elements of an array literal, used to flatten handler lists.
    #[serde(default)]
    pub elements: Vec<Argument>,
}

/// A call or `new` expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallConstruct {
    pub span: Span,
    /// Text of the call target (`app.get`, `mongoose.model`, `Schema`).
    pub target: String,
    #[serde(default = "any_type")]
    pub target_type: String,
    #[serde(default)]
    pub is_property_access: bool,
    #[serde(default)]
    pub owner_text: Option<String>,
    #[serde(default)]
    pub owner_type: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub is_parenthesized: bool,
    #[serde(default)]
    pub is_decorator: bool,
    /// Variable the result is assigned to.
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub enclosing_class: Option<Span>,
    #[serde(default)]
    pub enclosing_function: Option<Span>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    Method,
    FunctionDeclaration,
    FunctionExpression,
    ArrowFunction,
    Constructor,
    Getter,
    Setter,
    #[default]
    Other,
}

impl FunctionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionType::Method => "MethodDeclaration",
            FunctionType::FunctionDeclaration => "FunctionDeclaration",
            FunctionType::FunctionExpression => "FunctionExpression",
            FunctionType::ArrowFunction => "ArrowFunction",
            FunctionType::Constructor => "Constructor",
            FunctionType::Getter => "GetAccessor",
            FunctionType::Setter => "SetAccessor",
            FunctionType::Other => "Unknown",
        }
    }
}

/// A declared parameter or property: a name and its written type (or `any`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedName {
    pub name: String,
    #[serde(default = "any_type")]
    pub type_name: String,
}

impl TypedName {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A call made from inside a function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    pub span: Span,
    /// Callee text (`helper`, `this.save`, `new Foo` is recorded as `Foo`).
    pub callee: String,
    #[serde(default)]
    pub reference: Option<ReferenceHint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionConstruct {
    pub span: Span,
    /// Declared name, or the name of the variable it is assigned to.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub function_type: FunctionType,
    #[serde(default)]
    pub parameters: Vec<TypedName>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub has_doc: bool,
    #[serde(default)]
    pub contains_authentication: bool,
    /// Number of lines spanned by the body.
    #[serde(default)]
    pub body_length: usize,
    /// Members assigned as `this.<name> = ...` in the body.
    #[serde(default)]
    pub this_assignments: Vec<String>,
    #[serde(default)]
    pub calls: Vec<CallSite>,
    #[serde(default)]
    pub enclosing_class: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassConstruct {
    pub span: Span,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_exported: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub implements: Option<String>,
    #[serde(default)]
    pub decorators: Vec<Decorator>,
    /// Public properties and getters, in declaration order.
    #[serde(default)]
    pub properties: Vec<TypedName>,
    #[serde(default)]
    pub method_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConstruct {
    pub span: Span,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<TypedName>,
    #[serde(default)]
    pub method_count: usize,
    #[serde(default)]
    pub extends: Vec<String>,
}

/// A construct the entity builder turns into exactly one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Construct {
    Call(CallConstruct),
    New(CallConstruct),
    Function(FunctionConstruct),
    Class(ClassConstruct),
    Interface(InterfaceConstruct),
}

impl Construct {
    pub fn span(&self) -> Span {
        match self {
            Construct::Call(c) | Construct::New(c) => c.span,
            Construct::Function(f) => f.span,
            Construct::Class(c) => c.span,
            Construct::Interface(i) => i.span,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    #[default]
    Import,
    Require,
    Reexport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    /// Module specifier as written, without quotes.
    pub specifier: String,
    #[serde(default)]
    pub kind: ImportKind,
    /// Local names introduced by the import.
    #[serde(default)]
    pub bindings: Vec<String>,
}

impl Import {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            kind: ImportKind::Import,
            bindings: Vec::new(),
        }
    }
}

/// A name bound to a construct (`const app = express()`, `function f() {}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub target: Span,
}

/// One parsed source module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedModule {
    /// Path relative to the scanned root; the prefix of every entity key.
    pub path: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub imports: Vec<Import>,
    /// Module-level string constants, by name.
    #[serde(default)]
    pub constants: BTreeMap<String, String>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub constructs: Vec<Construct>,
}

impl ParsedModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, ExtractError> {
        serde_json::from_str(input).map_err(|e| ExtractError::Input(e.to_string()))
    }

    /// Reads a single module, or a JSON array of modules, from a file.
    pub fn read_json_file(path: &Path) -> Result<Vec<Self>, ExtractError> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ExtractError::Input(e.to_string()))?;
        let modules = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|m| vec![m])
        };
        modules.map_err(|e| ExtractError::Input(format!("{}: {}", path.display(), e)))
    }

    /// File name without directories and extension, used by SFRA routes.
    pub fn file_stem(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

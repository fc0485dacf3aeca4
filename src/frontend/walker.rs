//! Lowers a JavaScript or TypeScript syntax tree to constructs.
//!
//! Two passes over the tree. The index pass records names: bindings,
//! classes with their methods, variables holding `new X` instances and
//! module string constants. The emit pass produces one construct per call,
//! `new`, function-like, class and interface node.

use std::collections::HashMap;
use tracing::trace;
use tree_sitter::Node;

use crate::model::{
    Argument, Binding, CallConstruct, CallSite, Callability, ClassConstruct, Construct, Decorator,
    FunctionConstruct, FunctionType, InterfaceConstruct, ObjectValue, ParsedModule,
    ReferenceHint, Span, SyntaxKind, TypedName,
};

use super::typescript::unquote;
use super::ParsedSource;

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
    "abstract_method_signature",
];

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

/// Body substrings that mark a function as doing authentication.
const AUTH_MARKERS: &[&str] = &["authenticate(", "auth("];

/// Wrappers looked through when finding the variable a value is assigned to.
const TRANSPARENT_KINDS: &[&str] = &[
    "await_expression",
    "parenthesized_expression",
    "as_expression",
    "non_null_expression",
    "satisfies_expression",
];

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn is_function_kind(kind: &str) -> bool {
    FUNCTION_KINDS.contains(&kind)
}

fn is_class_kind(kind: &str) -> bool {
    CLASS_KINDS.contains(&kind)
}

fn parameter_count(function: Node) -> usize {
    if let Some(params) = function.child_by_field_name("parameters") {
        named_children(params).len()
    } else {
        usize::from(function.child_by_field_name("parameter").is_some())
    }
}

/// `Base<T>` and `ns.Base<T>` without type arguments.
fn strip_type_arguments(text: &str) -> &str {
    text.split('<').next().unwrap_or(text).trim()
}

fn last_segment(text: &str) -> &str {
    let text = strip_type_arguments(text);
    text.rsplit('.').next().unwrap_or(text)
}

/// Skips through wrapper expressions to the node a value really is.
fn unwrap_value(mut node: Node) -> Node {
    while TRANSPARENT_KINDS.contains(&node.kind()) {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

#[derive(Debug, Default)]
struct ClassIndex {
    constructor: Option<Span>,
    methods: HashMap<String, (Span, usize)>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    class: Option<Span>,
    function: Option<Span>,
}

pub(crate) struct Walker<'a> {
    parsed: &'a ParsedSource,
    module: ParsedModule,
    classes: HashMap<String, ClassIndex>,
    class_names: HashMap<Span, String>,
    /// Variable name to the class it was constructed from with `new`.
    instances: HashMap<String, String>,
    function_arities: HashMap<String, usize>,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(parsed: &'a ParsedSource) -> Self {
        Self {
            parsed,
            module: ParsedModule::new(parsed.path.clone()),
            classes: HashMap::new(),
            class_names: HashMap::new(),
            instances: HashMap::new(),
            function_arities: HashMap::new(),
        }
    }

    pub(crate) fn lower(mut self) -> ParsedModule {
        let root = self.parsed.tree.root_node();
        self.index(root);
        self.visit(root, Scope::default());
        trace!(
            path = %self.module.path,
            constructs = self.module.constructs.len(),
            bindings = self.module.bindings.len(),
            "lowered module"
        );
        self.module
    }

    fn text(&self, node: Node) -> &'a str {
        self.parsed.node_text(node)
    }

    fn span(&self, node: Node) -> Span {
        self.parsed.span(node)
    }

    fn type_text(&self, annotation: Node) -> String {
        let text = match annotation.named_child(0) {
            Some(inner) if annotation.kind() == "type_annotation" => self.text(inner),
            _ => self.text(annotation).trim_start_matches(':'),
        };
        text.trim().to_string()
    }

    fn bind(&mut self, name: &str, target: Span) {
        if !self.module.bindings.iter().any(|b| b.name == name) {
            self.module.bindings.push(Binding {
                name: name.to_string(),
                target,
            });
        }
    }

    // ---------------------------------------------------------------------
    // Index pass
    // ---------------------------------------------------------------------

    fn index(&mut self, node: Node<'a>) {
        match node.kind() {
            kind if is_class_kind(kind) => self.index_class(node),
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = self.text(name);
                    self.function_arities.insert(name.to_string(), parameter_count(node));
                    self.bind(name, self.span(node));
                }
            }
            "variable_declarator" => self.index_declarator(node),
            _ => {}
        }
        for child in named_children(node) {
            self.index(child);
        }
    }

    fn class_name(&self, class: Node) -> Option<&'a str> {
        class
            .child_by_field_name("name")
            .or_else(|| {
                class
                    .parent()
                    .filter(|p| p.kind() == "variable_declarator")
                    .and_then(|p| p.child_by_field_name("name"))
            })
            .map(|n| self.text(n))
    }

    fn index_class(&mut self, class: Node<'a>) {
        let Some(name) = self.class_name(class) else {
            return;
        };
        let span = self.span(class);
        self.class_names.insert(span, name.to_string());
        self.bind(name, span);

        let mut index = ClassIndex::default();
        if let Some(body) = class.child_by_field_name("body") {
            for member in named_children(body) {
                if member.kind() != "method_definition" {
                    continue;
                }
                let Some(method_name) = member.child_by_field_name("name").map(|n| self.text(n))
                else {
                    continue;
                };
                if method_name == "constructor" {
                    index.constructor = Some(self.span(member));
                } else {
                    let entry = (self.span(member), parameter_count(member));
                    index.methods.insert(method_name.to_string(), entry);
                }
            }
        }
        self.classes.insert(name.to_string(), index);
    }

    fn index_declarator(&mut self, declarator: Node<'a>) {
        let Some(name_node) = declarator.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() != "identifier" {
            return;
        }
        let Some(value) = declarator.child_by_field_name("value").map(unwrap_value) else {
            return;
        };
        let name = self.text(name_node);

        match value.kind() {
            "new_expression" => {
                self.bind(name, self.span(value));
                if let Some(constructor) = value.child_by_field_name("constructor") {
                    let class = last_segment(self.text(constructor)).to_string();
                    self.instances.insert(name.to_string(), class);
                }
            }
            "call_expression" | "class" => self.bind(name, self.span(value)),
            kind if is_function_kind(kind) => {
                self.bind(name, self.span(value));
                self.function_arities.insert(name.to_string(), parameter_count(value));
            }
            "string" | "template_string" if is_module_level(declarator) => {
                let has_substitution = named_children(value)
                    .iter()
                    .any(|c| c.kind() == "template_substitution");
                if !has_substitution {
                    self.module
                        .constants
                        .insert(name.to_string(), unquote(self.text(value)).to_string());
                }
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Emit pass
    // ---------------------------------------------------------------------

    fn visit(&mut self, node: Node<'a>, scope: Scope) {
        let mut inner = scope;
        let kind = node.kind();
        match kind {
            "call_expression" => self.push_call(node, scope, false),
            "new_expression" => self.push_call(node, scope, true),
            "interface_declaration" => self.push_interface(node),
            kind if is_class_kind(kind) => {
                self.push_class(node);
                inner.class = Some(self.span(node));
                inner.function = None;
            }
            kind if is_function_kind(kind) => {
                self.push_function(node, scope);
                inner.function = Some(self.span(node));
            }
            _ => {}
        }

        for child in named_children(node) {
            // Class decorators belong to the scope the class is declared in.
            let child_scope = if is_class_kind(kind) && child.kind() == "decorator" {
                scope
            } else {
                inner
            };
            self.visit(child, child_scope);
        }
    }

    fn push_call(&mut self, node: Node<'a>, scope: Scope, is_new: bool) {
        let field = if is_new { "constructor" } else { "function" };
        let Some(callee) = node.child_by_field_name(field) else {
            return;
        };
        if callee.kind() == "import" {
            return;
        }

        let (is_property_access, owner, method_name) = if callee.kind() == "member_expression" {
            (
                true,
                callee.child_by_field_name("object"),
                callee
                    .child_by_field_name("property")
                    .map(|p| self.text(p).to_string()),
            )
        } else {
            (false, None, None)
        };

        let arguments = node
            .child_by_field_name("arguments")
            .filter(|args| args.kind() == "arguments")
            .map(|args| {
                named_children(args)
                    .into_iter()
                    .map(|arg| self.argument(arg, scope))
                    .collect()
            })
            .unwrap_or_default();

        let parent = node.parent();
        let call = CallConstruct {
            span: self.span(node),
            target: self.text(callee).to_string(),
            target_type: self.callee_type(callee),
            is_property_access,
            owner_text: owner.map(|o| self.text(o).to_string()),
            owner_type: owner.and_then(|o| self.instance_type(o, scope)),
            method_name,
            is_parenthesized: parent.is_some_and(|p| p.kind() == "parenthesized_expression"),
            is_decorator: parent.is_some_and(|p| p.kind() == "decorator"),
            variable: self.assigned_variable(node),
            enclosing_class: scope.class,
            enclosing_function: scope.function,
            arguments,
        };

        self.module.constructs.push(if is_new {
            Construct::New(call)
        } else {
            Construct::Call(call)
        });
    }

    fn callee_type(&self, callee: Node) -> String {
        if callee.kind() == "identifier" && self.function_arities.contains_key(self.text(callee)) {
            "lambda".to_string()
        } else {
            "any".to_string()
        }
    }

    /// Class name of `this` or of a variable holding a `new X` instance.
    fn instance_type(&self, node: Node, scope: Scope) -> Option<String> {
        match node.kind() {
            "this" => scope.class.and_then(|s| self.class_names.get(&s)).cloned(),
            "identifier" => self.instances.get(self.text(node)).cloned(),
            "new_expression" => node
                .child_by_field_name("constructor")
                .map(|c| last_segment(self.text(c)).to_string()),
            _ => None,
        }
    }

    fn assigned_variable(&self, node: Node) -> Option<String> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            if TRANSPARENT_KINDS.contains(&parent.kind()) {
                current = parent;
                continue;
            }
            return (parent.kind() == "variable_declarator")
                .then(|| parent.child_by_field_name("name"))
                .flatten()
                .filter(|n| n.kind() == "identifier")
                .map(|n| self.text(n).to_string());
        }
        None
    }

    /// Span and arity of the method `this.m` or `instance.m` names.
    fn member_target(&self, member: Node, scope: Scope) -> Option<(Span, usize)> {
        let object = member.child_by_field_name("object")?;
        let property = self.text(member.child_by_field_name("property")?);
        let class = self.instance_type(object, scope)?;
        self.classes.get(&class)?.methods.get(property).copied()
    }

    fn argument(&self, node: Node, scope: Scope) -> Argument {
        let text = self.text(node);
        let mut arg = Argument {
            text: text.to_string(),
            type_name: "any".to_string(),
            ..Default::default()
        };

        match node.kind() {
            "string" => {
                arg.syntax = SyntaxKind::StringLiteral;
                arg.type_name = "string-literal".to_string();
                arg.literal = Some(unquote(text).to_string());
                arg.callability = Callability::NonCallable;
            }
            "template_string" => {
                arg.syntax = SyntaxKind::TemplateExpression;
                arg.type_name = "string".to_string();
                // Backticks kept so constant substitution can find `${name}`.
                arg.literal = Some(text.to_string());
                arg.callability = Callability::NonCallable;
            }
            "number" => {
                arg.syntax = SyntaxKind::NumericLiteral;
                arg.type_name = "number-literal".to_string();
                arg.literal = Some(text.to_string());
                arg.callability = Callability::NonCallable;
            }
            "true" | "false" => {
                arg.syntax = if node.kind() == "true" {
                    SyntaxKind::TrueKeyword
                } else {
                    SyntaxKind::FalseKeyword
                };
                arg.type_name = "boolean".to_string();
                arg.literal = Some(text.to_string());
                arg.callability = Callability::NonCallable;
            }
            "null" | "undefined" => {
                arg.syntax = SyntaxKind::NullKeyword;
                arg.callability = Callability::NonCallable;
            }
            "arrow_function" | "function_expression" | "function" | "generator_function" => {
                arg.syntax = if node.kind() == "arrow_function" {
                    SyntaxKind::ArrowFunction
                } else {
                    SyntaxKind::FunctionExpression
                };
                arg.type_name = "lambda".to_string();
                arg.callability = Callability::Callable;
                arg.arities = vec![parameter_count(node)];
                arg.reference = Some(ReferenceHint::Construct(self.span(node)));
            }
            "object" => {
                arg.syntax = SyntaxKind::ObjectLiteralExpression;
                arg.type_name = "object".to_string();
                arg.shape = Some(self.shape(node));
                arg.callability = Callability::NonCallable;
            }
            "array" => {
                arg.syntax = SyntaxKind::ArrayLiteralExpression;
                arg.type_name = "array".to_string();
                arg.shape = Some(self.shape(node));
                arg.elements = named_children(node)
                    .into_iter()
                    .map(|element| self.argument(element, scope))
                    .collect();
                arg.callability = Callability::NonCallable;
            }
            "identifier" => {
                arg.syntax = SyntaxKind::Identifier;
                arg.literal = Some(text.to_string());
                arg.reference = Some(ReferenceHint::Alias(text.to_string()));
                if let Some(class) = self.instances.get(text) {
                    arg.type_name = class.clone();
                }
                if let Some(&arity) = self.function_arities.get(text) {
                    arg.callability = Callability::Callable;
                    arg.arities = vec![arity];
                }
            }
            "member_expression" => {
                arg.syntax = SyntaxKind::PropertyAccessExpression;
                arg.literal = Some(text.to_string());
                match self.member_target(node, scope) {
                    Some((span, arity)) => {
                        arg.reference = Some(ReferenceHint::Construct(span));
                        arg.callability = Callability::Callable;
                        arg.arities = vec![arity];
                    }
                    None => arg.reference = Some(ReferenceHint::Alias(text.to_string())),
                }
            }
            "call_expression" => {
                arg.syntax = SyntaxKind::CallExpression;
                arg.callee = node
                    .child_by_field_name("function")
                    .map(|f| self.text(f).to_string());
                arg.reference = Some(ReferenceHint::Construct(self.span(node)));
            }
            "new_expression" => {
                arg.syntax = SyntaxKind::NewExpression;
                arg.callee = node
                    .child_by_field_name("constructor")
                    .map(|c| self.text(c).to_string());
                arg.reference = Some(ReferenceHint::Construct(self.span(node)));
            }
            "class" => {
                arg.syntax = SyntaxKind::ClassExpression;
                arg.reference = Some(ReferenceHint::Construct(self.span(node)));
            }
            "binary_expression" => arg.syntax = SyntaxKind::BinaryExpression,
            "parenthesized_expression" => {
                if let Some(inner) = named_children(node).into_iter().next() {
                    let mut unwrapped = self.argument(inner, scope);
                    unwrapped.text = arg.text;
                    return unwrapped;
                }
            }
            _ => {}
        }
        arg
    }

    /// Structural shape of an object or array literal.
    fn shape(&self, node: Node) -> ObjectValue {
        match node.kind() {
            "object" => {
                let mut entries = Vec::new();
                for member in named_children(node) {
                    match member.kind() {
                        "pair" => {
                            let (Some(key), Some(value)) = (
                                member.child_by_field_name("key"),
                                member.child_by_field_name("value"),
                            ) else {
                                continue;
                            };
                            entries.push((unquote(self.text(key)).to_string(), self.shape(value)));
                        }
                        "shorthand_property_identifier" => {
                            let name = self.text(member);
                            entries.push((name.to_string(), ObjectValue::leaf(name)));
                        }
                        "method_definition" => {
                            if let Some(name) = member.child_by_field_name("name") {
                                let key = self.text(name).to_string();
                                entries.push((key, ObjectValue::leaf("function")));
                            }
                        }
                        _ => {}
                    }
                }
                ObjectValue::Object(entries)
            }
            "array" => ObjectValue::List(
                named_children(node)
                    .into_iter()
                    .map(|e| self.shape(e))
                    .collect(),
            ),
            "string" | "template_string" => ObjectValue::leaf(unquote(self.text(node))),
            "null" | "undefined" => ObjectValue::Undefined,
            "arrow_function" | "function_expression" | "function" => ObjectValue::leaf("function"),
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .next()
                .map(|inner| self.shape(inner))
                .unwrap_or(ObjectValue::Undefined),
            _ => ObjectValue::leaf(self.text(node)),
        }
    }

    fn function_type(&self, node: Node) -> FunctionType {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                FunctionType::FunctionDeclaration
            }
            "function_expression" | "function" | "generator_function" => {
                FunctionType::FunctionExpression
            }
            "arrow_function" => FunctionType::ArrowFunction,
            "abstract_method_signature" => FunctionType::Method,
            "method_definition" => {
                let name = node.child_by_field_name("name").map(|n| self.text(n));
                if name == Some("constructor") {
                    FunctionType::Constructor
                } else if has_token(node, "get") {
                    FunctionType::Getter
                } else if has_token(node, "set") {
                    FunctionType::Setter
                } else {
                    FunctionType::Method
                }
            }
            _ => FunctionType::Other,
        }
    }

    /// Declared name, or the name the function is assigned to.
    fn function_name(&self, node: Node) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(self.text(name).to_string());
        }
        let parent = node.parent()?;
        let name = match parent.kind() {
            "variable_declarator" => parent.child_by_field_name("name"),
            "pair" => parent.child_by_field_name("key"),
            "public_field_definition" => parent.child_by_field_name("name"),
            "field_definition" => parent.child_by_field_name("property"),
            "assignment_expression" => parent.child_by_field_name("left"),
            _ => None,
        }?;
        Some(unquote(self.text(name)).to_string())
    }

    fn parameters(&self, function: Node) -> Vec<TypedName> {
        if let Some(single) = function.child_by_field_name("parameter") {
            return vec![TypedName::new(self.text(single), "any")];
        }
        let Some(params) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(params)
            .into_iter()
            .map(|param| match param.kind() {
                "required_parameter" | "optional_parameter" => {
                    let name = param
                        .child_by_field_name("pattern")
                        .map(|p| self.text(p))
                        .unwrap_or_else(|| self.text(param));
                    let type_name = param
                        .child_by_field_name("type")
                        .map(|t| self.type_text(t))
                        .unwrap_or_else(|| "any".to_string());
                    TypedName::new(name, type_name)
                }
                "assignment_pattern" => {
                    let name = param
                        .child_by_field_name("left")
                        .map(|l| self.text(l))
                        .unwrap_or_else(|| self.text(param));
                    TypedName::new(name, "any")
                }
                _ => TypedName::new(self.text(param), "any"),
            })
            .collect()
    }

    fn accessibility(&self, node: Node) -> Option<&'a str> {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() == "accessibility_modifier")
            .map(|c| self.text(c))
    }

    /// A `/** */` comment right before the declaration, past decorators
    /// and `export`/`const` wrappers.
    fn has_doc(&self, node: Node) -> bool {
        let mut anchor = node;
        while let Some(parent) = anchor.parent() {
            match parent.kind() {
                "export_statement" | "variable_declarator" | "lexical_declaration"
                | "variable_declaration" => anchor = parent,
                _ => break,
            }
        }
        let mut previous = anchor.prev_sibling();
        while let Some(sibling) = previous.filter(|s| s.kind() == "decorator") {
            previous = sibling.prev_sibling();
        }
        previous.is_some_and(|p| p.kind() == "comment" && self.text(p).starts_with("/**"))
    }

    /// `this.<name> = ...` targets in a body, not counting nested
    /// non-arrow functions and classes, which have their own `this`.
    fn this_assignments(&self, body: Node, out: &mut Vec<String>) {
        for child in named_children(body) {
            match child.kind() {
                "function_declaration"
                | "function_expression"
                | "function"
                | "method_definition" => {
                    continue
                }
                kind if is_class_kind(kind) => continue,
                "assignment_expression" => {
                    let target = child
                        .child_by_field_name("left")
                        .filter(|l| l.kind() == "member_expression")
                        .filter(|l| {
                            l.child_by_field_name("object")
                                .is_some_and(|o| o.kind() == "this")
                        })
                        .and_then(|l| l.child_by_field_name("property"));
                    if let Some(property) = target {
                        let name = self.text(property).to_string();
                        if !out.contains(&name) {
                            out.push(name);
                        }
                    }
                }
                _ => {}
            }
            self.this_assignments(child, out);
        }
    }

    /// Calls made directly from a body. Nested function-likes own their calls.
    fn call_sites(&self, node: Node, scope: Scope, out: &mut Vec<CallSite>) {
        for child in named_children(node) {
            let kind = child.kind();
            if is_function_kind(kind) || is_class_kind(kind) {
                continue;
            }
            if kind == "call_expression" || kind == "new_expression" {
                if let Some(site) = self.call_site(child, scope) {
                    out.push(site);
                }
            }
            self.call_sites(child, scope, out);
        }
    }

    fn call_site(&self, call: Node, scope: Scope) -> Option<CallSite> {
        let is_new = call.kind() == "new_expression";
        let callee = call.child_by_field_name(if is_new { "constructor" } else { "function" })?;
        if callee.kind() == "import" {
            return None;
        }
        let text = self.text(callee);
        let reference = if is_new {
            self.classes
                .get(last_segment(text))
                .and_then(|class| class.constructor)
                .map(ReferenceHint::Construct)
        } else {
            match callee.kind() {
                "identifier" => Some(ReferenceHint::Alias(text.to_string())),
                "member_expression" => self
                    .member_target(callee, scope)
                    .map(|(span, _)| ReferenceHint::Construct(span)),
                _ => None,
            }
        };
        Some(CallSite {
            span: self.span(call),
            callee: text.to_string(),
            reference,
        })
    }

    fn push_function(&mut self, node: Node<'a>, scope: Scope) {
        let body = node.child_by_field_name("body");
        let body_text = body.map(|b| self.text(b)).unwrap_or_default();
        let name_node = node.child_by_field_name("name");

        // Calls in the body resolve `this` against the enclosing class.
        let mut calls = Vec::new();
        let mut this_assignments = Vec::new();
        if let Some(body) = body {
            if matches!(body.kind(), "call_expression" | "new_expression") {
                calls.extend(self.call_site(body, scope));
            }
            self.call_sites(body, scope, &mut calls);
            self.this_assignments(body, &mut this_assignments);
        }

        let function = FunctionConstruct {
            span: self.span(node),
            name: self.function_name(node),
            function_type: self.function_type(node),
            parameters: self.parameters(node),
            return_type: node.child_by_field_name("return_type").map(|t| self.type_text(t)),
            is_private: self.accessibility(node) == Some("private")
                || name_node.is_some_and(|n| n.kind() == "private_property_identifier"),
            is_abstract: node.kind() == "abstract_method_signature" || has_token(node, "abstract"),
            has_doc: self.has_doc(node),
            contains_authentication: AUTH_MARKERS.iter().any(|m| body_text.contains(m)),
            body_length: body
                .map(|b| b.end_position().row - b.start_position().row + 1)
                .unwrap_or(0),
            this_assignments,
            calls,
            enclosing_class: scope.class,
        };
        self.module.constructs.push(Construct::Function(function));
    }

    fn decorator(&self, node: Node) -> Option<Decorator> {
        let inner = named_children(node).into_iter().next()?;
        match inner.kind() {
            "call_expression" => {
                let function = inner.child_by_field_name("function")?;
                let arguments = inner
                    .child_by_field_name("arguments")
                    .map(|args| {
                        named_children(args)
                            .into_iter()
                            .map(|arg| self.argument(arg, Scope::default()))
                            .collect()
                    })
                    .unwrap_or_default();
                Some(Decorator {
                    name: self.text(function).to_string(),
                    arguments,
                })
            }
            _ => Some(Decorator {
                name: self.text(inner).to_string(),
                arguments: Vec::new(),
            }),
        }
    }

    fn push_class(&mut self, node: Node<'a>) {
        let export = node.parent().filter(|p| p.kind() == "export_statement");

        let mut decorators: Vec<Decorator> = export
            .into_iter()
            .chain(std::iter::once(node))
            .flat_map(named_children)
            .filter(|c| c.kind() == "decorator")
            .filter_map(|d| self.decorator(d))
            .collect();
        decorators.dedup_by(|a, b| a.name == b.name && a.arguments == b.arguments);

        let (extends, implements) = self.heritage(node);

        let mut properties = Vec::new();
        let mut method_count = 0;
        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                match member.kind() {
                    "public_field_definition" | "field_definition" => {
                        if let Some(property) = self.public_property(member) {
                            properties.push(property);
                        }
                    }
                    "method_definition" => match self.function_type(member) {
                        FunctionType::Getter => {
                            if self.accessibility(member).is_none()
                                || self.accessibility(member) == Some("public")
                            {
                                let name = member.child_by_field_name("name").map(|n| self.text(n));
                                let type_name = member
                                    .child_by_field_name("return_type")
                                    .map(|t| self.type_text(t))
                                    .unwrap_or_else(|| "any".to_string());
                                if let Some(name) = name {
                                    properties.push(TypedName::new(name, type_name));
                                }
                            }
                        }
                        FunctionType::Constructor => {
                            properties.extend(self.parameter_properties(member));
                        }
                        FunctionType::Setter => {}
                        _ => method_count += 1,
                    },
                    "abstract_method_signature" | "method_signature" => method_count += 1,
                    _ => {}
                }
            }
        }

        let class = ClassConstruct {
            span: self.span(node),
            name: self.class_name(node).map(str::to_string),
            is_default: export.is_some_and(|e| has_token(e, "default")),
            is_exported: export.is_some(),
            is_abstract: node.kind() == "abstract_class_declaration",
            extends,
            implements,
            decorators,
            properties,
            method_count,
        };
        self.module.constructs.push(Construct::Class(class));
    }

    /// `(extends, first implements)` of a class.
    fn heritage(&self, class: Node) -> (Option<String>, Option<String>) {
        let mut cursor = class.walk();
        let Some(heritage) = class
            .named_children(&mut cursor)
            .find(|c| c.kind() == "class_heritage")
        else {
            return (None, None);
        };

        let mut extends = None;
        let mut implements = None;
        for clause in named_children(heritage) {
            match clause.kind() {
                "extends_clause" => {
                    let value = clause
                        .child_by_field_name("value")
                        .or_else(|| named_children(clause).into_iter().next());
                    extends = value.map(|v| strip_type_arguments(self.text(v)).to_string());
                }
                "implements_clause" => {
                    implements = named_children(clause)
                        .into_iter()
                        .next()
                        .map(|t| strip_type_arguments(self.text(t)).to_string());
                }
                // JavaScript: `extends Base` without a clause node.
                _ if extends.is_none() => {
                    extends = Some(strip_type_arguments(self.text(clause)).to_string());
                }
                _ => {}
            }
        }
        (extends, implements)
    }

    fn public_property(&self, field: Node) -> Option<TypedName> {
        if matches!(self.accessibility(field), Some("private" | "protected"))
            || has_token(field, "static")
        {
            return None;
        }
        let name = field
            .child_by_field_name("name")
            .or_else(|| field.child_by_field_name("property"))?;
        if name.kind() == "private_property_identifier" {
            return None;
        }
        let type_name = field
            .child_by_field_name("type")
            .map(|t| self.type_text(t))
            .unwrap_or_else(|| "any".to_string());
        Some(TypedName::new(unquote(self.text(name)), type_name))
    }

    /// `constructor(public name: string, readonly id: number)`.
    fn parameter_properties(&self, constructor: Node) -> Vec<TypedName> {
        let Some(params) = constructor.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(params)
            .into_iter()
            .filter(|p| {
                let modifier = self.accessibility(*p);
                modifier == Some("public") || (modifier.is_none() && has_token(*p, "readonly"))
            })
            .filter_map(|p| {
                let name = self.text(p.child_by_field_name("pattern")?);
                let type_name = p
                    .child_by_field_name("type")
                    .map(|t| self.type_text(t))
                    .unwrap_or_else(|| "any".to_string());
                Some(TypedName::new(name, type_name))
            })
            .collect()
    }

    fn push_interface(&mut self, node: Node<'a>) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };

        let mut properties = Vec::new();
        let mut method_count = 0;
        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                match member.kind() {
                    "property_signature" => {
                        let Some(prop) = member.child_by_field_name("name") else {
                            continue;
                        };
                        let type_name = member
                            .child_by_field_name("type")
                            .map(|t| self.type_text(t))
                            .unwrap_or_else(|| "any".to_string());
                        properties.push(TypedName::new(unquote(self.text(prop)), type_name));
                    }
                    "method_signature" => method_count += 1,
                    _ => {}
                }
            }
        }

        let extends = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "extends_type_clause")
            .flat_map(named_children)
            .map(|t| strip_type_arguments(self.text(t)).to_string())
            .collect();

        self.module.constructs.push(Construct::Interface(InterfaceConstruct {
            span: self.span(node),
            name: name.to_string(),
            properties,
            method_count,
            extends,
        }));
    }
}

/// Declared directly in the program, possibly behind `export`.
fn is_module_level(declarator: Node) -> bool {
    let Some(declaration) = declarator.parent() else {
        return false;
    };
    match declaration.parent().map(|p| p.kind()) {
        Some("program") => true,
        Some("export_statement") => declaration
            .parent()
            .and_then(|e| e.parent())
            .is_some_and(|p| p.kind() == "program"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{Frontend, ScriptFrontend};
    use pretty_assertions::assert_eq;

    fn lower(source: &str) -> ParsedModule {
        let frontend = ScriptFrontend::typescript();
        let parsed = frontend.parse("sample.ts", source.as_bytes()).unwrap();
        Walker::new(&parsed).lower()
    }

    fn calls(module: &ParsedModule) -> Vec<&CallConstruct> {
        module
            .constructs
            .iter()
            .filter_map(|c| match c {
                Construct::Call(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_argument_types() {
        let module = lower(
            "const base = '/api';\nfunction handler(req, res) {}\n\
             app.get(`${base}/users`, 'x', 3, true, handler, (a) => a, { n: 1 }, [1]);\n",
        );
        assert_eq!(module.constants.get("base").map(String::as_str), Some("/api"));
        let call = calls(&module)[0];
        let types: Vec<&str> = call.arguments.iter().map(|a| a.type_name.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "string",
                "string-literal",
                "number-literal",
                "boolean",
                "any",
                "lambda",
                "object",
                "array"
            ]
        );
        assert_eq!(call.arguments[4].callability, Callability::Callable);
        assert_eq!(call.arguments[4].arities, vec![2]);
        assert_eq!(call.arguments[5].arities, vec![1]);
        assert_eq!(call.owner_text.as_deref(), Some("app"));
        assert_eq!(call.method_name.as_deref(), Some("get"));
    }

    #[test]
    fn test_columns_count_characters() {
        let module = lower("const s = \"é\"; app.get('/x', h);\n");
        let call = calls(&module)[0];
        assert_eq!(call.target, "app.get");
        assert_eq!(call.span, Span::new((0, 15), (0, 31)));
    }

    #[test]
    fn test_new_binding_type() {
        let module =
            lower("const schema = new Schema({ name: String });\nmodel('User', schema);\n");
        let model = calls(&module)
            .into_iter()
            .find(|c| c.target == "model")
            .unwrap();
        assert_eq!(model.arguments[1].type_name, "Schema");
        assert!(module.bindings.iter().any(|b| b.name == "schema"));
        let schema = module
            .constructs
            .iter()
            .find_map(|c| match c {
                Construct::New(n) => Some(n),
                _ => None,
            })
            .unwrap();
        assert_eq!(schema.variable.as_deref(), Some("schema"));
        assert_eq!(
            schema.arguments[0].shape,
            Some(ObjectValue::Object(vec![("name".to_string(), ObjectValue::leaf("String"))]))
        );
    }

    #[test]
    fn test_function_details() {
        let module = lower(
            r#"
class Service {
  /** Loads a user. */
  private async load(id: number, opts?: Options): Promise<User> {
    const token = authenticate(id);
    return this.fetch(id);
  }
  fetch(id: number) { return id; }
}
"#,
        );
        let load = module
            .constructs
            .iter()
            .find_map(|c| match c {
                Construct::Function(f) if f.name.as_deref() == Some("load") => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(load.function_type, FunctionType::Method);
        assert_eq!(
            load.parameters,
            vec![TypedName::new("id", "number"), TypedName::new("opts", "Options")]
        );
        assert_eq!(load.return_type.as_deref(), Some("Promise<User>"));
        assert!(load.is_private);
        assert!(load.has_doc);
        assert!(load.contains_authentication);
        assert_eq!(load.body_length, 4);
        assert!(load.enclosing_class.is_some());
        let callees: Vec<&str> = load.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["authenticate", "this.fetch"]);
        assert!(matches!(load.calls[1].reference, Some(ReferenceHint::Construct(_))));
    }

    #[test]
    fn test_class_details() {
        let module = lower(
            r#"
@Entity()
export class User extends Base<number> implements Named {
  @Column() name: string;
  private secret: string;
  age = 3;
  constructor(public email: string, private hash: string) { super(); this.extra = 1; }
  get display(): string { return this.name; }
  greet() {}
}
"#,
        );
        let class = module
            .constructs
            .iter()
            .find_map(|c| match c {
                Construct::Class(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(class.name.as_deref(), Some("User"));
        assert!(class.is_exported);
        assert_eq!(class.extends.as_deref(), Some("Base"));
        assert_eq!(class.implements.as_deref(), Some("Named"));
        assert_eq!(class.decorators.len(), 1);
        assert_eq!(class.decorators[0].name, "Entity");
        let names: Vec<&str> = class.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "email", "display"]);
        assert_eq!(class.method_count, 1);

        let ctor = module
            .constructs
            .iter()
            .find_map(|c| match c {
                Construct::Function(f) if f.function_type == FunctionType::Constructor => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(ctor.this_assignments, vec!["extra".to_string()]);
    }
}

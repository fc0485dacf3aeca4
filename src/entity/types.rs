//! Entity records stored in a module arena.
//!
//! Structural fields are filled by the build pass and never change after
//! it. Fields documented as "set by resolve" start empty and are written
//! exactly once by [`super::resolve`].

use crate::model::{Callability, FunctionType, ObjectValue, ReferenceHint, SyntaxKind, TypedName};

use super::key::{ConstructKind, EntityKey};

/// One argument of a call-like entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentInfo {
    pub syntax: SyntaxKind,
    pub type_name: String,
    pub text: String,
    /// Static value, with module string constants already substituted.
    pub literal: Option<String>,
    pub shape: Option<ObjectValue>,
    pub callability: Callability,
    pub arities: Vec<usize>,
    pub callee: Option<String>,
    pub elements: Vec<ArgumentInfo>,
    pub(crate) hint: Option<ReferenceHint>,
    /// Set by resolve.
    pub reference: Option<EntityKey>,
}

impl ArgumentInfo {
    /// Whether this argument can be called with `min..=max` parameters.
    ///
    /// Unknown callability counts as not callable.
    pub fn is_callable_with(&self, min: usize, max: usize) -> bool {
        self.callability == Callability::Callable
            && self.arities.iter().any(|arity| (min..=max).contains(arity))
    }

    pub fn is_string_literal(&self) -> bool {
        self.syntax == SyntaxKind::StringLiteral
    }
}

/// Method counts of all invocations sharing the same owner text in a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiblingsInfo {
    pub http_methods: usize,
    pub app_framework_methods: usize,
    pub other_methods: usize,
}

/// A call or `new` expression.
#[derive(Debug, Clone)]
pub struct CallLikeEntity {
    pub key: EntityKey,
    pub target: String,
    pub target_type: String,
    pub is_property_access: bool,
    pub owner_text: Option<String>,
    pub owner_type: Option<String>,
    pub method_name: Option<String>,
    pub is_parenthesized: bool,
    pub is_decorator: bool,
    pub variable: Option<String>,
    pub class_key: Option<EntityKey>,
    pub function_key: Option<EntityKey>,
    pub arguments: Vec<ArgumentInfo>,

    /// Set by resolve.
    pub internal_referenced_methods: Vec<String>,
    /// Set by resolve.
    pub external_referenced_methods: Vec<String>,
    /// Set by resolve, for method invocations only.
    pub siblings: Option<SiblingsInfo>,
    /// Set by resolve: path of an enclosing `x.route('/p')` chain.
    pub root_route_path: Option<String>,
    /// Set by resolve: the call sits inside the arguments of a route registration.
    pub nested_in_route: bool,
}

impl CallLikeEntity {
    /// Target text with whitespace removed (`app\n  .get` becomes `app.get`).
    pub fn full_name(&self) -> String {
        self.target.split_whitespace().collect()
    }

    /// Last dotted segment of the target (`get` for `app.get`).
    pub fn func_name(&self) -> String {
        let full = self.full_name();
        match full.rsplit_once('.') {
            Some((_, last)) => last.to_string(),
            None => full,
        }
    }

    /// First argument's literal when it is a string literal or template.
    pub fn first_arg_string(&self) -> Option<&str> {
        self.arguments
            .first()
            .filter(|arg| arg.syntax.is_string_like())
            .and_then(|arg| arg.literal.as_deref())
    }

    pub fn has_minimum_arguments(&self, count: usize) -> bool {
        self.arguments.len() >= count
    }

    /// Checks the arguments against a positional signature.
    ///
    /// Every `required` predicate needs an argument. `optional` predicates
    /// only run when the argument is present, and extra arguments fail.
    pub fn matches_signature(
        &self,
        required: &[&dyn Fn(&ArgumentInfo) -> bool],
        optional: &[&dyn Fn(&ArgumentInfo) -> bool],
    ) -> bool {
        if self.arguments.len() < required.len()
            || self.arguments.len() > required.len() + optional.len()
        {
            return false;
        }
        required
            .iter()
            .chain(optional.iter())
            .zip(&self.arguments)
            .all(|(predicate, arg)| predicate(arg))
    }
}

#[derive(Debug, Clone)]
pub struct FunctionEntity {
    pub key: EntityKey,
    pub name: String,
    pub has_real_name: bool,
    pub function_type: FunctionType,
    pub parameters: Vec<TypedName>,
    pub return_type: Option<String>,
    pub is_private: bool,
    pub is_abstract: bool,
    pub has_doc: bool,
    pub contains_authentication: bool,
    pub body_length: usize,
    pub this_assignments: Vec<String>,
    pub class_key: Option<EntityKey>,
    pub(crate) call_sites: Vec<CallSiteInfo>,

    /// Set by resolve: key strings of same-module callees.
    pub internal_calls: Vec<String>,
    /// Set by resolve: callee texts of everything else.
    pub external_calls: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct CallSiteInfo {
    pub callee: String,
    pub hint: Option<ReferenceHint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoratorInfo {
    pub name: String,
    pub arguments: Vec<ArgumentInfo>,
}

impl DecoratorInfo {
    pub fn first_arg_string(&self) -> Option<&str> {
        self.arguments
            .first()
            .filter(|arg| arg.syntax.is_string_like())
            .and_then(|arg| arg.literal.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct ClassEntity {
    pub key: EntityKey,
    pub name: String,
    pub is_default: bool,
    pub is_exported: bool,
    pub is_abstract: bool,
    pub extends: Option<String>,
    pub implements: Option<String>,
    pub decorators: Vec<DecoratorInfo>,
    pub properties: Vec<TypedName>,
    pub method_count: usize,

    /// Set by resolve: same-module class named by `extends`.
    pub base_key: Option<EntityKey>,
    /// Set by resolve: `this.x` members assigned in the constructor, typed `any`.
    pub constructor_properties: Vec<TypedName>,
    /// Set by resolve: properties of base classes, nearest first.
    pub inherited_properties: Vec<TypedName>,
}

impl ClassEntity {
    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators.iter().any(|d| d.name == name)
    }

    /// Route prefix declared by `@Controller('/p')` or `@JsonController('/p')`.
    ///
    /// A controller decorator without a string argument yields an empty prefix.
    pub fn controller_prefix(&self) -> Option<&str> {
        self.decorators
            .iter()
            .find(|d| d.name == "Controller" || d.name == "JsonController")
            .map(|d| d.first_arg_string().unwrap_or_default())
    }

    /// Own, then constructor-assigned, then inherited properties, first name wins.
    pub fn all_properties(&self) -> Vec<&TypedName> {
        let mut seen = std::collections::HashSet::new();
        self.properties
            .iter()
            .chain(&self.constructor_properties)
            .chain(&self.inherited_properties)
            .filter(|p| seen.insert(p.name.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceEntity {
    pub key: EntityKey,
    pub name: String,
    pub properties: Vec<TypedName>,
    pub method_count: usize,
    pub extends: Vec<String>,
}

/// An entity of any construct kind.
#[derive(Debug, Clone)]
pub enum Entity {
    Call(CallLikeEntity),
    New(CallLikeEntity),
    Function(FunctionEntity),
    Class(ClassEntity),
    Interface(InterfaceEntity),
}

impl Entity {
    pub fn key(&self) -> &EntityKey {
        match self {
            Entity::Call(e) | Entity::New(e) => &e.key,
            Entity::Function(e) => &e.key,
            Entity::Class(e) => &e.key,
            Entity::Interface(e) => &e.key,
        }
    }

    pub fn kind(&self) -> ConstructKind {
        self.key().kind()
    }

    pub fn as_call(&self) -> Option<&CallLikeEntity> {
        match self {
            Entity::Call(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_new(&self) -> Option<&CallLikeEntity> {
        match self {
            Entity::New(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionEntity> {
        match self {
            Entity::Function(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassEntity> {
        match self {
            Entity::Class(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceEntity> {
        match self {
            Entity::Interface(e) => Some(e),
            _ => None,
        }
    }

    /// Key of the class this entity is declared in.
    pub fn class_key(&self) -> Option<&EntityKey> {
        match self {
            Entity::Call(e) | Entity::New(e) => e.class_key.as_ref(),
            Entity::Function(e) => e.class_key.as_ref(),
            Entity::Class(_) | Entity::Interface(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Span;

    fn arg(syntax: SyntaxKind, literal: &str) -> ArgumentInfo {
        ArgumentInfo {
            syntax,
            type_name: "any".to_string(),
            text: literal.to_string(),
            literal: Some(literal.to_string()),
            shape: None,
            callability: Callability::Unknown,
            arities: Vec::new(),
            callee: None,
            elements: Vec::new(),
            hint: None,
            reference: None,
        }
    }

    fn call(target: &str, arguments: Vec<ArgumentInfo>) -> CallLikeEntity {
        CallLikeEntity {
            key: EntityKey::new("a.ts", Span::default(), ConstructKind::CallExpression),
            target: target.to_string(),
            target_type: "any".to_string(),
            is_property_access: target.contains('.'),
            owner_text: None,
            owner_type: None,
            method_name: None,
            is_parenthesized: false,
            is_decorator: false,
            variable: None,
            class_key: None,
            function_key: None,
            arguments,
            internal_referenced_methods: Vec::new(),
            external_referenced_methods: Vec::new(),
            siblings: None,
            root_route_path: None,
            nested_in_route: false,
        }
    }

    #[test]
    fn test_func_names() {
        let entity = call("app\n    .route('/x')\n    .get", vec![]);
        assert_eq!(entity.full_name(), "app.route('/x').get");
        assert_eq!(entity.func_name(), "get");
        assert_eq!(call("express", vec![]).func_name(), "express");
    }

    #[test]
    fn test_first_arg_string_requires_string_syntax() {
        let entity = call("app.get", vec![arg(SyntaxKind::StringLiteral, "/users")]);
        assert_eq!(entity.first_arg_string(), Some("/users"));
        let entity = call("app.get", vec![arg(SyntaxKind::Identifier, "route")]);
        assert_eq!(entity.first_arg_string(), None);
    }

    #[test]
    fn test_matches_signature() {
        let entity = call(
            "mongoose.model",
            vec![arg(SyntaxKind::StringLiteral, "User"), arg(SyntaxKind::Identifier, "schema")],
        );
        let is_string = |a: &ArgumentInfo| a.is_string_literal();
        let anything = |_: &ArgumentInfo| true;
        assert!(entity.matches_signature(&[&is_string, &anything], &[&anything]));
        assert!(!entity.matches_signature(&[&is_string], &[]));
        assert!(!entity.matches_signature(&[&anything, &is_string], &[]));
        assert!(!entity.matches_signature(&[&is_string, &anything, &anything], &[]));
    }
}

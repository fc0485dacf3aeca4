//! The resolve pass: reference slots, call edges and module-level enrichment.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

use crate::model::{ReferenceHint, Span, SyntaxKind, TypedName};
use crate::vocab::Vocabulary;

use super::arena::{ResolvedModule, UnresolvedModule};
use super::key::{ConstructKind, EntityKey};
use super::types::{ArgumentInfo, CallLikeEntity, Entity, SiblingsInfo};

lazy_static! {
    static ref TEMPLATE_SYMBOL: Regex = Regex::new(r"\$\{\s*([A-Za-z_$][\w$]*)\s*\}").unwrap();
}

/// Maps reference hints to keys without borrowing the entities themselves.
struct KeyLookup<'a> {
    bindings: &'a HashMap<String, Span>,
    by_span: &'a HashMap<Span, Vec<usize>>,
    keys: Vec<EntityKey>,
}

impl KeyLookup<'_> {
    fn candidates(&self, hint: &ReferenceHint) -> impl Iterator<Item = &EntityKey> {
        let span = match hint {
            ReferenceHint::Construct(span) => Some(*span),
            ReferenceHint::Alias(name) => self.bindings.get(name).copied(),
        };
        span.and_then(|span| self.by_span.get(&span))
            .into_iter()
            .flatten()
            .map(|&idx| &self.keys[idx])
    }

    fn key_for(&self, hint: &ReferenceHint) -> Option<&EntityKey> {
        self.candidates(hint).next()
    }

    fn function_for(&self, hint: &ReferenceHint) -> Option<&EntityKey> {
        self.candidates(hint)
            .find(|key| key.kind() == ConstructKind::FunctionLike)
    }
}

/// Resolves every reference slot of the module and fills the enrichment
/// fields. Unresolvable references stay `None`.
pub fn resolve(module: UnresolvedModule, vocab: &Vocabulary) -> ResolvedModule {
    let mut arena = module.arena;
    let mut entities = std::mem::take(&mut arena.entities);

    substitute_constants(&mut entities, &arena.constants);

    {
        let lookup = KeyLookup {
            bindings: &arena.bindings,
            by_span: &arena.by_span,
            keys: entities.iter().map(|e| e.key().clone()).collect(),
        };
        for entity in entities.iter_mut() {
            match entity {
                Entity::Call(call) | Entity::New(call) => {
                    resolve_arguments(&mut call.arguments, &lookup);
                    let (internal, external) = referenced_methods(&call.arguments, &lookup);
                    call.internal_referenced_methods = internal;
                    call.external_referenced_methods = external;
                }
                Entity::Function(function) => {
                    let mut internal = Vec::new();
                    let mut external = Vec::new();
                    for site in &function.call_sites {
                        match site.hint.as_ref().and_then(|h| lookup.function_for(h)) {
                            Some(key) => push_unique(&mut internal, key.key_string()),
                            None => push_unique(&mut external, site.callee.clone()),
                        }
                    }
                    function.internal_calls = internal;
                    function.external_calls = external;
                }
                Entity::Class(class) => {
                    for decorator in class.decorators.iter_mut() {
                        resolve_arguments(&mut decorator.arguments, &lookup);
                    }
                }
                Entity::Interface(_) => {}
            }
        }
    }

    assign_siblings(&mut entities, vocab);
    assign_route_roots(&mut entities);
    mark_nested_in_routes(&mut entities, vocab);
    resolve_classes(&mut entities);

    trace!(path = %arena.path, entities = entities.len(), "resolved module");
    arena.entities = entities;
    ResolvedModule::from_arena(arena)
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// `${name}` substitution inside template literals, and whole-value
/// substitution of identifiers bound to module string constants.
fn substitute_literal(
    literal: &str,
    syntax: SyntaxKind,
    constants: &BTreeMap<String, String>,
) -> Option<String> {
    if literal.starts_with('`') {
        let replaced = TEMPLATE_SYMBOL.replace_all(literal, |caps: &Captures| {
            constants
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        return Some(replaced.replace('`', ""));
    }
    if syntax == SyntaxKind::Identifier {
        return constants.get(literal).cloned();
    }
    None
}

fn substitute_arguments(args: &mut [ArgumentInfo], constants: &BTreeMap<String, String>) {
    for arg in args {
        if let Some(literal) = arg.literal.as_deref() {
            if let Some(replaced) = substitute_literal(literal, arg.syntax, constants) {
                arg.literal = Some(replaced);
            }
        }
        substitute_arguments(&mut arg.elements, constants);
    }
}

fn substitute_constants(entities: &mut [Entity], constants: &BTreeMap<String, String>) {
    for entity in entities {
        match entity {
            Entity::Call(call) | Entity::New(call) => {
                substitute_arguments(&mut call.arguments, constants)
            }
            Entity::Class(class) => {
                for decorator in class.decorators.iter_mut() {
                    substitute_arguments(&mut decorator.arguments, constants);
                }
            }
            _ => {}
        }
    }
}

fn resolve_arguments(args: &mut [ArgumentInfo], lookup: &KeyLookup<'_>) {
    for arg in args {
        arg.reference = arg.hint.as_ref().and_then(|h| lookup.key_for(h)).cloned();
        resolve_arguments(&mut arg.elements, lookup);
    }
}

/// Splits handler-like arguments into same-module functions (by key) and
/// everything else (by text). Arrays are flattened; literals never count.
fn referenced_methods(args: &[ArgumentInfo], lookup: &KeyLookup<'_>) -> (Vec<String>, Vec<String>) {
    fn visit(
        args: &[ArgumentInfo],
        lookup: &KeyLookup<'_>,
        internal: &mut Vec<String>,
        external: &mut Vec<String>,
    ) {
        for arg in args {
            match arg.syntax {
                SyntaxKind::ArrayLiteralExpression => {
                    visit(&arg.elements, lookup, internal, external)
                }
                SyntaxKind::ArrowFunction | SyntaxKind::FunctionExpression => {
                    let function = arg
                        .reference
                        .as_ref()
                        .filter(|k| k.kind() == ConstructKind::FunctionLike);
                    if let Some(key) = function {
                        push_unique(internal, key.key_string());
                    }
                }
                SyntaxKind::CallExpression => {
                    let Some(callee) = arg.callee.as_deref() else { continue };
                    match lookup.function_for(&ReferenceHint::Alias(callee.to_string())) {
                        Some(key) => push_unique(internal, key.key_string()),
                        None => push_unique(external, callee.to_string()),
                    }
                }
                SyntaxKind::Identifier | SyntaxKind::PropertyAccessExpression => {
                    match &arg.reference {
                        Some(key) if key.kind() == ConstructKind::FunctionLike => {
                            push_unique(internal, key.key_string())
                        }
                        Some(_) => {}
                        None if arg.callability != crate::model::Callability::NonCallable => {
                            push_unique(external, arg.text.clone())
                        }
                        None => {}
                    }
                }
                _ => {}
            }
        }
    }

    let mut internal = Vec::new();
    let mut external = Vec::new();
    visit(args, lookup, &mut internal, &mut external);
    (internal, external)
}

fn invocation_method(call: &CallLikeEntity) -> String {
    call.method_name.clone().unwrap_or_else(|| call.func_name())
}

/// Counts, per owner text, how many invocations are HTTP verbs,
/// application-framework methods and anything else.
fn assign_siblings(entities: &mut [Entity], vocab: &Vocabulary) {
    let mut by_owner: HashMap<String, SiblingsInfo> = HashMap::new();
    for entity in entities.iter() {
        let Entity::Call(call) = entity else { continue };
        let (true, Some(owner)) = (call.is_property_access, call.owner_text.as_ref()) else {
            continue;
        };
        let method = invocation_method(call);
        let info = by_owner.entry(owner.clone()).or_default();
        if vocab.is_http_method(&method) {
            info.http_methods += 1;
        } else if vocab.is_app_framework_method(&method) {
            info.app_framework_methods += 1;
        } else {
            info.other_methods += 1;
        }
    }
    for entity in entities.iter_mut() {
        let Entity::Call(call) = entity else { continue };
        if !call.is_property_access {
            continue;
        }
        if let Some(owner) = call.owner_text.as_ref() {
            call.siblings = by_owner.get(owner).copied();
        }
    }
}

/// Calls chained onto `x.route('/p')` inherit `/p` as their root route.
fn assign_route_roots(entities: &mut [Entity]) {
    let roots: Vec<(Span, String)> = entities
        .iter()
        .filter_map(Entity::as_call)
        .filter(|call| call.method_name.as_deref() == Some("route"))
        .filter_map(|call| {
            call.first_arg_string()
                .map(|path| (call.key.span(), path.to_string()))
        })
        .collect();
    if roots.is_empty() {
        return;
    }
    for entity in entities.iter_mut() {
        let Entity::Call(call) = entity else { continue };
        let span = call.key.span();
        if let Some((_, path)) = roots
            .iter()
            .find(|(root, _)| root.start == span.start && span.strictly_contains(root))
        {
            debug!(key = %call.key, root = %path, "call chained on route definition");
            call.root_route_path = Some(path.clone());
        }
    }
}

/// Flags calls that sit inside the arguments of an HTTP-verb call. A call
/// that starts where the verb call starts is its chain head, not an argument.
fn mark_nested_in_routes(entities: &mut [Entity], vocab: &Vocabulary) {
    let route_spans: Vec<Span> = entities
        .iter()
        .filter_map(Entity::as_call)
        .filter(|call| {
            !call.arguments.is_empty() && vocab.is_http_method_ignore_case(&call.func_name())
        })
        .map(|call| call.key.span())
        .collect();
    for entity in entities.iter_mut() {
        let Entity::Call(call) = entity else { continue };
        let span = call.key.span();
        call.nested_in_route = route_spans
            .iter()
            .any(|outer| outer.strictly_contains(&span) && outer.start != span.start);
    }
}

fn base_class_name(extends: &str) -> &str {
    let without_args = extends.split('<').next().unwrap_or(extends).trim();
    without_args.rsplit('.').next().unwrap_or(without_args)
}

/// Base keys, constructor-assigned properties and transitive inherited
/// properties. Inheritance cycles are cut at the first repeated class.
fn resolve_classes(entities: &mut [Entity]) {
    let mut constructor_members: HashMap<EntityKey, Vec<String>> = HashMap::new();
    for function in entities.iter().filter_map(Entity::as_function) {
        if function.function_type != crate::model::FunctionType::Constructor {
            continue;
        }
        if let Some(class_key) = &function.class_key {
            let members = constructor_members.entry(class_key.clone()).or_default();
            for member in &function.this_assignments {
                if !members.contains(member) {
                    members.push(member.clone());
                }
            }
        }
    }

    let mut by_name: HashMap<String, EntityKey> = HashMap::new();
    for class in entities.iter().filter_map(Entity::as_class) {
        if !class.name.is_empty() {
            by_name.entry(class.name.clone()).or_insert_with(|| class.key.clone());
        }
    }

    // Own plus constructor properties, and the base of each class.
    let mut declared: HashMap<EntityKey, Vec<TypedName>> = HashMap::new();
    let mut bases: HashMap<EntityKey, EntityKey> = HashMap::new();
    for entity in entities.iter_mut() {
        let Entity::Class(class) = entity else { continue };
        if let Some(members) = constructor_members.get(&class.key) {
            class.constructor_properties = members
                .iter()
                .filter(|m| !class.properties.iter().any(|p| &p.name == *m))
                .map(|m| TypedName::new(m.as_str(), "any"))
                .collect();
        }
        class.base_key = class
            .extends
            .as_deref()
            .and_then(|text| by_name.get(base_class_name(text)))
            .filter(|key| **key != class.key)
            .cloned();
        if let Some(base) = &class.base_key {
            bases.insert(class.key.clone(), base.clone());
        }
        declared.insert(
            class.key.clone(),
            class
                .properties
                .iter()
                .chain(&class.constructor_properties)
                .cloned()
                .collect(),
        );
    }

    for entity in entities.iter_mut() {
        let Entity::Class(class) = entity else { continue };
        let mut visited: HashSet<&EntityKey> = HashSet::from([&class.key]);
        let mut inherited: Vec<TypedName> = Vec::new();
        let mut current = bases.get(&class.key);
        while let Some(base) = current {
            if !visited.insert(base) {
                debug!(class = %class.key, "inheritance cycle");
                break;
            }
            for property in declared.get(base).into_iter().flatten() {
                if !inherited.iter().any(|p| p.name == property.name) {
                    inherited.push(property.clone());
                }
            }
            current = bases.get(base);
        }
        class.inherited_properties = inherited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::build;
    use crate::model::{
        Argument, Binding, CallConstruct, CallSite, Callability, ClassConstruct, Construct,
        FunctionConstruct, FunctionType, ParsedModule,
    };

    fn string_arg(value: &str) -> Argument {
        Argument {
            syntax: SyntaxKind::StringLiteral,
            type_name: "string-literal".to_string(),
            text: format!("'{}'", value),
            literal: Some(value.to_string()),
            callability: Callability::NonCallable,
            ..Default::default()
        }
    }

    fn identifier_arg(name: &str, callability: Callability) -> Argument {
        Argument {
            syntax: SyntaxKind::Identifier,
            type_name: "any".to_string(),
            text: name.to_string(),
            literal: Some(name.to_string()),
            callability,
            reference: Some(ReferenceHint::Alias(name.to_string())),
            ..Default::default()
        }
    }

    fn member_call(span: Span, owner: &str, method: &str, arguments: Vec<Argument>) -> Construct {
        Construct::Call(CallConstruct {
            span,
            target: format!("{}.{}", owner, method),
            target_type: "lambda".to_string(),
            is_property_access: true,
            owner_text: Some(owner.to_string()),
            owner_type: Some("any".to_string()),
            method_name: Some(method.to_string()),
            arguments,
            ..Default::default()
        })
    }

    fn function(span: Span, name: &str, function_type: FunctionType) -> FunctionConstruct {
        FunctionConstruct {
            span,
            name: Some(name.to_string()),
            function_type,
            ..Default::default()
        }
    }

    fn calls(module: &ResolvedModule) -> Vec<&CallLikeEntity> {
        module.entities().iter().filter_map(Entity::as_call).collect()
    }

    #[test]
    fn test_call_edges_are_disjoint() {
        let helper_span = Span::new((0, 0), (2, 1));
        let caller_span = Span::new((3, 0), (8, 1));
        let mut caller = function(caller_span, "handler", FunctionType::FunctionDeclaration);
        let site = |line: usize, end: usize, callee: &str, alias: bool| CallSite {
            span: Span::new((line, 2), (line, end)),
            callee: callee.into(),
            reference: alias.then(|| ReferenceHint::Alias(callee.into())),
        };
        caller.calls = vec![
            site(4, 10, "helper", true),
            site(5, 12, "express", true),
            site(6, 14, "helper", true),
            site(7, 14, "app.get", false),
        ];
        let mut module = ParsedModule::new("calls.ts");
        module.bindings = vec![Binding { name: "helper".into(), target: helper_span }];
        module.constructs = vec![
            Construct::Function(function(helper_span, "helper", FunctionType::FunctionDeclaration)),
            Construct::Function(caller),
        ];

        let resolved = resolve(build(module), &Vocabulary::default());
        let caller = resolved.entities()[1].as_function().unwrap();
        assert_eq!(caller.internal_calls, vec!["calls.ts+0+0+2+1"]);
        assert_eq!(caller.external_calls, vec!["express", "app.get"]);
        assert!(caller.internal_calls.iter().all(|k| !caller.external_calls.contains(k)));
    }

    #[test]
    fn test_referenced_methods_flatten_arrays() {
        let middleware_span = Span::new((0, 0), (2, 1));
        let arrow_span = Span::new((5, 40), (5, 50));
        let mut arrow = Argument {
            syntax: SyntaxKind::ArrowFunction,
            type_name: "lambda".into(),
            callability: Callability::Callable,
            arities: vec![2],
            reference: Some(ReferenceHint::Construct(arrow_span)),
            ..Default::default()
        };
        arrow.text = "(req, res) => {}".into();
        let list = Argument {
            syntax: SyntaxKind::ArrayLiteralExpression,
            type_name: "array".into(),
            callability: Callability::NonCallable,
            elements: vec![identifier_arg("middleware", Callability::Callable), string_arg("x")],
            ..Default::default()
        };
        let mut module = ParsedModule::new("routes.ts");
        module.bindings = vec![Binding { name: "middleware".into(), target: middleware_span }];
        module.constructs = vec![
            Construct::Function(function(
                middleware_span,
                "middleware",
                FunctionType::FunctionDeclaration,
            )),
            member_call(
                Span::new((5, 0), (5, 60)),
                "app",
                "post",
                vec![
                    string_arg("/x"),
                    list,
                    identifier_arg("handlePath", Callability::Unknown),
                    arrow,
                ],
            ),
            Construct::Function(function(arrow_span, "", FunctionType::ArrowFunction)),
        ];

        let resolved = resolve(build(module), &Vocabulary::default());
        let call = calls(&resolved)[0];
        assert_eq!(
            call.internal_referenced_methods,
            vec!["routes.ts+0+0+2+1", "routes.ts+5+40+5+50"]
        );
        assert_eq!(call.external_referenced_methods, vec!["handlePath"]);
        assert_eq!(
            call.arguments[3].reference.as_ref().map(EntityKey::key_string),
            Some("routes.ts+5+40+5+50".to_string())
        );
    }

    #[test]
    fn test_constant_substitution() {
        let template = Argument {
            syntax: SyntaxKind::TemplateExpression,
            type_name: "string".into(),
            literal: Some("`${routePrefix}/stringTemplate`".into()),
            ..Default::default()
        };
        let mut module = ParsedModule::new("express-style.js");
        module.constants.insert("routePrefix".into(), "/api/v1".into());
        module.constructs = vec![
            member_call(Span::new((1, 0), (1, 40)), "app", "route", vec![template]),
            member_call(
                Span::new((2, 0), (2, 40)),
                "app",
                "use",
                vec![identifier_arg("routePrefix", Callability::NonCallable)],
            ),
        ];
        let resolved = resolve(build(module), &Vocabulary::default());
        let calls = calls(&resolved);
        assert_eq!(calls[0].first_arg_string(), Some("/api/v1/stringTemplate"));
        assert_eq!(calls[1].arguments[0].literal.as_deref(), Some("/api/v1"));
    }

    #[test]
    fn test_siblings_and_route_chains() {
        let handler = || identifier_arg("h", Callability::Callable);
        let mut module = ParsedModule::new("app.ts");
        module.constructs = vec![
            member_call(Span::new((0, 0), (0, 20)), "app", "use", vec![handler()]),
            member_call(
                Span::new((1, 0), (1, 30)),
                "app",
                "get",
                vec![string_arg("/a"), handler()],
            ),
            member_call(
                Span::new((2, 0), (2, 30)),
                "app",
                "post",
                vec![string_arg("/b"), handler()],
            ),
            member_call(Span::new((3, 0), (3, 30)), "app", "frobnicate", vec![handler()]),
            member_call(Span::new((5, 0), (6, 20)), "routeApp.route('/p')", "get", vec![handler()]),
            member_call(Span::new((5, 0), (5, 20)), "routeApp", "route", vec![string_arg("/p")]),
            member_call(
                Span::new((8, 0), (10, 2)),
                "app",
                "get",
                vec![string_arg("/c"), handler()],
            ),
            member_call(
                Span::new((9, 2), (9, 30)),
                "innerThing",
                "get",
                vec![string_arg("/d"), handler()],
            ),
        ];
        let resolved = resolve(build(module), &Vocabulary::default());
        let calls = calls(&resolved);

        let siblings = calls[1].siblings.unwrap();
        assert_eq!(siblings.http_methods, 3);
        assert_eq!(siblings.app_framework_methods, 1);
        assert_eq!(siblings.other_methods, 1);

        assert_eq!(calls[4].root_route_path.as_deref(), Some("/p"));
        assert_eq!(calls[5].root_route_path, None);
        assert!(!calls[4].nested_in_route);
        assert!(calls[7].nested_in_route);
        assert!(!calls[6].nested_in_route);
    }

    #[test]
    fn test_class_inheritance_and_constructor_properties() {
        let base_span = Span::new((0, 0), (4, 1));
        let child_span = Span::new((5, 0), (12, 1));
        let cyclic_span = Span::new((13, 0), (14, 1));
        let ctor_span = Span::new((7, 2), (10, 3));
        let mut ctor = function(ctor_span, "constructor", FunctionType::Constructor);
        ctor.enclosing_class = Some(child_span);
        ctor.this_assignments = vec!["age".into(), "name".into()];
        let mut module = ParsedModule::new("models.ts");
        module.constructs = vec![
            Construct::Class(ClassConstruct {
                span: base_span,
                name: Some("Base".into()),
                properties: vec![TypedName::new("id", "number"), TypedName::new("name", "string")],
                ..Default::default()
            }),
            Construct::Class(ClassConstruct {
                span: child_span,
                name: Some("Child".into()),
                extends: Some("Base".into()),
                properties: vec![TypedName::new("name", "String")],
                ..Default::default()
            }),
            Construct::Function(ctor),
            Construct::Class(ClassConstruct {
                span: cyclic_span,
                name: Some("Loop".into()),
                extends: Some("Loop".into()),
                ..Default::default()
            }),
        ];
        let resolved = resolve(build(module), &Vocabulary::default());
        let child = resolved.entities()[1].as_class().unwrap();
        assert_eq!(child.base_key.as_ref().map(|k| k.span()), Some(base_span));
        assert_eq!(child.constructor_properties, vec![TypedName::new("age", "any")]);
        let names: Vec<_> = child
            .all_properties()
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str()))
            .collect();
        assert_eq!(names, vec![("name", "String"), ("age", "any"), ("id", "number")]);

        let looped = resolved.entities()[3].as_class().unwrap();
        assert!(looped.base_key.is_none());
        assert!(looped.inherited_properties.is_empty());
    }
}

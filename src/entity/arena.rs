//! Per-module entity arena and the build pass.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::model::{
    Argument, CallConstruct, ClassConstruct, Construct, FunctionConstruct, Import,
    InterfaceConstruct, ParsedModule, ReferenceHint, Span,
};

use super::key::{ConstructKind, EntityKey};
use super::types::{
    ArgumentInfo, CallLikeEntity, CallSiteInfo, ClassEntity, DecoratorInfo, Entity,
    FunctionEntity, InterfaceEntity,
};

/// Owned storage for every entity of one module, indexed by key and span.
#[derive(Debug)]
pub(crate) struct ModuleArena {
    pub path: Arc<str>,
    pub language: String,
    pub imports: Vec<Import>,
    pub constants: std::collections::BTreeMap<String, String>,
    pub bindings: HashMap<String, Span>,
    pub entities: Vec<Entity>,
    pub index: HashMap<EntityKey, usize>,
    pub by_span: HashMap<Span, Vec<usize>>,
}

impl ModuleArena {
    fn push(&mut self, entity: Entity) {
        let key = entity.key().clone();
        if self.index.contains_key(&key) {
            debug!(key = %key, "skipping duplicate construct");
            return;
        }
        let idx = self.entities.len();
        self.by_span.entry(key.span()).or_default().push(idx);
        self.index.insert(key, idx);
        self.entities.push(entity);
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.index.get(key).map(|&idx| &self.entities[idx])
    }

    /// Entity written at `span`, or bound to `name` in the module.
    pub fn lookup(&self, hint: &ReferenceHint) -> Option<&Entity> {
        let span = match hint {
            ReferenceHint::Construct(span) => *span,
            ReferenceHint::Alias(name) => *self.bindings.get(name)?,
        };
        self.by_span
            .get(&span)
            .and_then(|indices| indices.first())
            .map(|&idx| &self.entities[idx])
    }

    pub fn lookup_alias(&self, name: &str) -> Option<&Entity> {
        self.lookup(&ReferenceHint::Alias(name.to_string()))
    }
}

/// A module whose entities are built but whose references are not resolved.
///
/// The only thing to do with it is pass it to [`super::resolve`].
#[derive(Debug)]
pub struct UnresolvedModule {
    pub(crate) arena: ModuleArena,
}

impl UnresolvedModule {
    pub fn path(&self) -> &str {
        &self.arena.path
    }

    pub fn len(&self) -> usize {
        self.arena.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.entities.is_empty()
    }
}

/// A fully resolved module. Read-only from here on.
#[derive(Debug)]
pub struct ResolvedModule {
    pub(crate) arena: ModuleArena,
}

impl ResolvedModule {
    pub fn path(&self) -> &str {
        &self.arena.path
    }

    pub fn language(&self) -> &str {
        &self.arena.language
    }

    pub fn imports(&self) -> &[Import] {
        &self.arena.imports
    }

    /// Exact match on a module specifier.
    pub fn has_import(&self, specifier: &str) -> bool {
        self.arena.imports.iter().any(|i| i.specifier == specifier)
    }

    pub fn has_import_with_prefix(&self, prefix: &str) -> bool {
        self.arena.imports.iter().any(|i| i.specifier.starts_with(prefix))
    }

    /// Entities in construct order.
    pub fn entities(&self) -> &[Entity] {
        &self.arena.entities
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.arena.get(key)
    }

    pub fn class(&self, key: &EntityKey) -> Option<&ClassEntity> {
        self.get(key).and_then(Entity::as_class)
    }

    pub fn lookup(&self, hint: &ReferenceHint) -> Option<&Entity> {
        self.arena.lookup(hint)
    }

    /// File stem of the module path (`sfra` for `cartridge/sfra.js`).
    pub fn file_stem(&self) -> &str {
        std::path::Path::new(self.path())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    pub(crate) fn from_arena(arena: ModuleArena) -> Self {
        Self { arena }
    }
}

/// Builds one entity per well-formed construct. Malformed constructs are
/// skipped and logged; no entity is ever partially built.
pub fn build(module: ParsedModule) -> UnresolvedModule {
    let path: Arc<str> = Arc::from(module.path.as_str());
    let mut arena = ModuleArena {
        path: Arc::clone(&path),
        language: module.language,
        imports: module.imports,
        constants: module.constants,
        bindings: module
            .bindings
            .into_iter()
            .map(|b| (b.name, b.target))
            .collect(),
        entities: Vec::with_capacity(module.constructs.len()),
        index: HashMap::new(),
        by_span: HashMap::new(),
    };

    for construct in module.constructs {
        let span = construct.span();
        if span.end < span.start {
            debug!(path = %path, span = %span, "skipping construct with inverted span");
            continue;
        }
        let entity = match construct {
            Construct::Call(call) => {
                build_call(&path, call, ConstructKind::CallExpression).map(Entity::Call)
            }
            Construct::New(call) => {
                build_call(&path, call, ConstructKind::NewExpression).map(Entity::New)
            }
            Construct::Function(function) => {
                Some(Entity::Function(build_function(&path, function)))
            }
            Construct::Class(class) => Some(Entity::Class(build_class(&path, class))),
            Construct::Interface(interface) => {
                build_interface(&path, interface).map(Entity::Interface)
            }
        };
        match entity {
            Some(entity) => arena.push(entity),
            None => debug!(path = %path, span = %span, "skipping malformed construct"),
        }
    }

    UnresolvedModule { arena }
}

fn build_argument(arg: Argument) -> ArgumentInfo {
    ArgumentInfo {
        syntax: arg.syntax,
        type_name: arg.type_name,
        text: arg.text,
        literal: arg.literal,
        shape: arg.shape,
        callability: arg.callability,
        arities: arg.arities,
        callee: arg.callee,
        elements: arg.elements.into_iter().map(build_argument).collect(),
        hint: arg.reference,
        reference: None,
    }
}

fn build_call(path: &Arc<str>, call: CallConstruct, kind: ConstructKind) -> Option<CallLikeEntity> {
    if call.target.trim().is_empty() {
        return None;
    }
    Some(CallLikeEntity {
        key: EntityKey::with_path(path, call.span, kind),
        target: call.target,
        target_type: call.target_type,
        is_property_access: call.is_property_access,
        owner_text: call.owner_text,
        owner_type: call.owner_type,
        method_name: call.method_name,
        is_parenthesized: call.is_parenthesized,
        is_decorator: call.is_decorator,
        variable: call.variable,
        class_key: call
            .enclosing_class
            .map(|span| EntityKey::with_path(path, span, ConstructKind::Class)),
        function_key: call
            .enclosing_function
            .map(|span| EntityKey::with_path(path, span, ConstructKind::FunctionLike)),
        arguments: call.arguments.into_iter().map(build_argument).collect(),
        internal_referenced_methods: Vec::new(),
        external_referenced_methods: Vec::new(),
        siblings: None,
        root_route_path: None,
        nested_in_route: false,
    })
}

fn build_function(path: &Arc<str>, function: FunctionConstruct) -> FunctionEntity {
    let (name, has_real_name) = match function.name {
        Some(name) if !name.is_empty() => (name, true),
        _ => (function.function_type.as_str().to_string(), false),
    };
    FunctionEntity {
        key: EntityKey::with_path(path, function.span, ConstructKind::FunctionLike),
        name,
        has_real_name,
        function_type: function.function_type,
        parameters: function.parameters,
        return_type: function.return_type,
        is_private: function.is_private,
        is_abstract: function.is_abstract,
        has_doc: function.has_doc,
        contains_authentication: function.contains_authentication,
        body_length: function.body_length,
        this_assignments: function.this_assignments,
        class_key: function
            .enclosing_class
            .map(|span| EntityKey::with_path(path, span, ConstructKind::Class)),
        call_sites: function
            .calls
            .into_iter()
            .map(|site| CallSiteInfo {
                callee: site.callee,
                hint: site.reference,
            })
            .collect(),
        internal_calls: Vec::new(),
        external_calls: Vec::new(),
    }
}

fn build_class(path: &Arc<str>, class: ClassConstruct) -> ClassEntity {
    ClassEntity {
        key: EntityKey::with_path(path, class.span, ConstructKind::Class),
        name: class.name.unwrap_or_default(),
        is_default: class.is_default,
        is_exported: class.is_exported,
        is_abstract: class.is_abstract,
        extends: class.extends,
        implements: class.implements,
        decorators: class
            .decorators
            .into_iter()
            .map(|d| DecoratorInfo {
                name: d.name,
                arguments: d.arguments.into_iter().map(build_argument).collect(),
            })
            .collect(),
        properties: class.properties,
        method_count: class.method_count,
        base_key: None,
        constructor_properties: Vec::new(),
        inherited_properties: Vec::new(),
    }
}

fn build_interface(path: &Arc<str>, interface: InterfaceConstruct) -> Option<InterfaceEntity> {
    if interface.name.is_empty() {
        return None;
    }
    Some(InterfaceEntity {
        key: EntityKey::with_path(path, interface.span, ConstructKind::Interface),
        name: interface.name,
        properties: interface.properties,
        method_count: interface.method_count,
        extends: interface.extends,
    })
}

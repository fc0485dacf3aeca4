//! Data-model views: ORM registrations, entity classes, constructor
//! functions and interfaces.

use lazy_static::lazy_static;
use once_cell::unsync::OnceCell;
use regex::Regex;

use crate::entity::{
    ArgumentInfo, CallLikeEntity, ClassEntity, Entity, FunctionEntity, InterfaceEntity,
};
use crate::model::{FunctionType, ObjectValue, PathMap, SyntaxKind};

use super::expand::{canonicalize, empty_list_as_mixed, expand, unwrap_type};
use super::ViewContext;

lazy_static! {
    static ref SCHEMA_TYPE: Regex = Regex::new(r"^Schema(<.*>)?$").unwrap();
}

const TYPEORM_DECORATORS: &[&str] = &["Entity", "ViewEntity", "ChildEntity"];

/// Normalized accessors shared by every data-model view.
pub trait DataModel {
    fn name(&self) -> &str;
    /// Dotted field path to type name, in declaration order.
    fn fields(&self) -> &PathMap;
    fn method_count(&self) -> usize;
    /// True when the framework is confirmed by an import or decorator.
    fn is_confirmed(&self) -> bool;
}

fn is_string_literal(arg: &ArgumentInfo) -> bool {
    arg.syntax == SyntaxKind::StringLiteral
}

fn is_string_like(arg: &ArgumentInfo) -> bool {
    arg.syntax.is_string_like() || matches!(arg.type_name.as_str(), "string" | "string-literal")
}

fn is_boolean_like(arg: &ArgumentInfo) -> bool {
    arg.syntax.is_boolean() || arg.type_name == "boolean"
}

fn is_object_literal(arg: &ArgumentInfo) -> bool {
    arg.syntax == SyntaxKind::ObjectLiteralExpression
        && arg.shape.as_ref().is_some_and(ObjectValue::is_object)
}

fn is_object_like(arg: &ArgumentInfo) -> bool {
    arg.syntax == SyntaxKind::ObjectLiteralExpression
        || matches!(arg.type_name.as_str(), "object" | "any" | "unknown")
}

/// The `new Schema({...}, options?)` entity an argument refers to.
fn schema_of<'a>(arg: &ArgumentInfo, cx: ViewContext<'a>) -> Option<&'a CallLikeEntity> {
    let schema = cx.module.get(arg.reference.as_ref()?)?.as_new()?;
    let is_schema_type = SCHEMA_TYPE.is_match(&schema.target_type)
        || SCHEMA_TYPE.is_match(schema.full_name().rsplit('.').next().unwrap_or_default());
    let has_definition = schema.matches_signature(&[&is_object_literal], &[&is_object_like]);
    (is_schema_type && has_definition).then_some(schema)
}

/// `mongoose.model('User', schema, collection?, skipInit?)`.
#[derive(Debug)]
pub struct MongooseView<'a> {
    call: &'a CallLikeEntity,
    schema: &'a CallLikeEntity,
    cx: ViewContext<'a>,
    fields: OnceCell<PathMap>,
}

impl<'a> MongooseView<'a> {
    pub fn accepts(entity: &Entity, cx: ViewContext<'_>) -> bool {
        let Some(call) = entity.as_call() else {
            return false;
        };
        let schema_ref = |arg: &ArgumentInfo| schema_of(arg, cx).is_some();
        call.func_name() == "model"
            && call.matches_signature(
                &[&is_string_literal, &schema_ref],
                &[&is_string_like, &is_boolean_like],
            )
    }

    pub fn new(call: &'a CallLikeEntity, cx: ViewContext<'a>) -> Option<Self> {
        let schema = schema_of(call.arguments.get(1)?, cx)?;
        Some(Self {
            call,
            schema,
            cx,
            fields: OnceCell::new(),
        })
    }

    pub fn call(&self) -> &'a CallLikeEntity {
        self.call
    }

}

impl DataModel for MongooseView<'_> {
    fn name(&self) -> &str {
        self.call.first_arg_string().unwrap_or_default()
    }

    fn fields(&self) -> &PathMap {
        self.fields.get_or_init(|| {
            self.schema
                .arguments
                .first()
                .and_then(|arg| arg.shape.as_ref())
                .map(|shape| expand(shape, &[unwrap_type, empty_list_as_mixed, canonicalize]))
                .unwrap_or_default()
        })
    }

    /// Calls to `schema.method(...)` and `schema.static(...)` on the schema variable.
    fn method_count(&self) -> usize {
        let Some(variable) = self.schema.variable.as_deref() else {
            return 0;
        };
        self.cx
            .module
            .entities()
            .iter()
            .filter_map(Entity::as_call)
            .filter(|c| c.owner_text.as_deref() == Some(variable))
            .filter(|c| matches!(c.method_name.as_deref(), Some("method" | "static")))
            .count()
    }

    fn is_confirmed(&self) -> bool {
        self.cx.module.has_import("mongoose")
    }
}

/// `sequelize.define('Model', {attributes}, options?)`.
#[derive(Debug)]
pub struct SequelizeDefineView<'a> {
    call: &'a CallLikeEntity,
    cx: ViewContext<'a>,
    fields: OnceCell<PathMap>,
}

impl<'a> SequelizeDefineView<'a> {
    pub fn accepts(entity: &Entity, _cx: ViewContext<'_>) -> bool {
        entity.as_call().is_some_and(|call| {
            call.func_name() == "define"
                && call.matches_signature(
                    &[&is_string_literal, &is_object_literal],
                    &[&is_object_like],
                )
        })
    }

    pub fn new(call: &'a CallLikeEntity, cx: ViewContext<'a>) -> Self {
        Self {
            call,
            cx,
            fields: OnceCell::new(),
        }
    }

    pub fn call(&self) -> &'a CallLikeEntity {
        self.call
    }
}

impl DataModel for SequelizeDefineView<'_> {
    fn name(&self) -> &str {
        self.call.first_arg_string().unwrap_or_default()
    }

    fn fields(&self) -> &PathMap {
        self.fields.get_or_init(|| {
            self.call
                .arguments
                .get(1)
                .and_then(|arg| arg.shape.as_ref())
                .map(|shape| expand(shape, &[unwrap_type, canonicalize]))
                .unwrap_or_default()
        })
    }

    fn method_count(&self) -> usize {
        0
    }

    fn is_confirmed(&self) -> bool {
        self.cx.module.has_import_with_prefix("sequelize")
    }
}

/// A class read as a data model: TypeORM entities, and any class with
/// properties as the fallback.
#[derive(Debug)]
pub struct ClassModelView<'a> {
    class: &'a ClassEntity,
    typeorm: bool,
    fields: OnceCell<PathMap>,
}

impl<'a> ClassModelView<'a> {
    pub fn accepts_typeorm(entity: &Entity, cx: ViewContext<'_>) -> bool {
        entity.as_class().is_some_and(|class| {
            cx.module.has_import("typeorm")
                && TYPEORM_DECORATORS.iter().any(|d| class.has_decorator(d))
        })
    }

    pub fn accepts_class(entity: &Entity, _cx: ViewContext<'_>) -> bool {
        entity
            .as_class()
            .is_some_and(|class| !class.all_properties().is_empty())
    }

    pub fn new(class: &'a ClassEntity, typeorm: bool) -> Self {
        Self {
            class,
            typeorm,
            fields: OnceCell::new(),
        }
    }

    pub fn class(&self) -> &'a ClassEntity {
        self.class
    }
}

impl DataModel for ClassModelView<'_> {
    fn name(&self) -> &str {
        &self.class.name
    }

    fn fields(&self) -> &PathMap {
        self.fields.get_or_init(|| {
            self.class
                .all_properties()
                .into_iter()
                .map(|p| (p.name.as_str(), p.type_name.as_str()))
                .collect()
        })
    }

    fn method_count(&self) -> usize {
        self.class.method_count
    }

    fn is_confirmed(&self) -> bool {
        self.typeorm
    }
}

/// `function User(name) { this.name = name; }`
#[derive(Debug)]
pub struct ConstructorFunctionView<'a> {
    function: &'a FunctionEntity,
    fields: OnceCell<PathMap>,
}

impl<'a> ConstructorFunctionView<'a> {
    pub fn accepts(entity: &Entity, _cx: ViewContext<'_>) -> bool {
        entity.as_function().is_some_and(|f| {
            matches!(
                f.function_type,
                FunctionType::FunctionDeclaration | FunctionType::FunctionExpression
            ) && f.class_key.is_none()
                && f.has_real_name
                && f.name.chars().next().is_some_and(char::is_uppercase)
                && !f.this_assignments.is_empty()
        })
    }

    pub fn new(function: &'a FunctionEntity) -> Self {
        Self {
            function,
            fields: OnceCell::new(),
        }
    }

    pub fn function(&self) -> &'a FunctionEntity {
        self.function
    }
}

impl DataModel for ConstructorFunctionView<'_> {
    fn name(&self) -> &str {
        &self.function.name
    }

    fn fields(&self) -> &PathMap {
        self.fields.get_or_init(|| {
            self.function
                .this_assignments
                .iter()
                .map(|member| (member.as_str(), "any"))
                .collect()
        })
    }

    fn method_count(&self) -> usize {
        0
    }

    fn is_confirmed(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct InterfaceView<'a> {
    interface: &'a InterfaceEntity,
    fields: OnceCell<PathMap>,
}

impl<'a> InterfaceView<'a> {
    pub fn accepts(entity: &Entity, _cx: ViewContext<'_>) -> bool {
        entity
            .as_interface()
            .is_some_and(|i| !i.properties.is_empty())
    }

    pub fn new(interface: &'a InterfaceEntity) -> Self {
        Self {
            interface,
            fields: OnceCell::new(),
        }
    }

    pub fn interface(&self) -> &'a InterfaceEntity {
        self.interface
    }
}

impl DataModel for InterfaceView<'_> {
    fn name(&self) -> &str {
        &self.interface.name
    }

    fn fields(&self) -> &PathMap {
        self.fields.get_or_init(|| {
            self.interface
                .properties
                .iter()
                .map(|p| (p.name.as_str(), p.type_name.as_str()))
                .collect()
        })
    }

    fn method_count(&self) -> usize {
        self.interface.method_count
    }

    fn is_confirmed(&self) -> bool {
        false
    }
}

//! Entity views: predicate-gated interpretations of a resolved entity.
//!
//! A view borrows one entity and its [`ResolvedModule`] and is dropped
//! after feature dispatch. Views never mutate anything; derived values
//! are memoized on the view itself.
//!
//! # Selection
//!
//! For each enabled group, the candidates of [`CANDIDATES`] are tried in
//! order. Fallback candidates (`Class`, `Interface`, `CallExpression`)
//! are only tried when no specific candidate of the same group accepted.
//! When several specific candidates accept, all of them are returned and
//! the conflict is reported in [`Selection::ambiguous`].

pub mod api;
pub mod data_model;
pub mod expand;
pub mod method;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::entity::{ClassEntity, ConstructKind, Entity, EntityKey, ResolvedModule};
use crate::vocab::Vocabulary;

pub use api::{Api, CallExpressionView, HapiView};
pub use data_model::{
    ClassModelView, ConstructorFunctionView, DataModel, InterfaceView, MongooseView,
    SequelizeDefineView,
};
pub use method::FunctionLikeView;

/// Output group of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewGroup {
    Api,
    DataModel,
    Method,
}

impl ViewGroup {
    pub const ALL: [ViewGroup; 3] = [ViewGroup::Api, ViewGroup::DataModel, ViewGroup::Method];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewGroup::Api => "api",
            ViewGroup::DataModel => "data_model",
            ViewGroup::Method => "method",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api" => Some(ViewGroup::Api),
            "data_model" | "datamodel" => Some(ViewGroup::DataModel),
            "method" => Some(ViewGroup::Method),
            _ => None,
        }
    }
}

impl fmt::Display for ViewGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Concrete view type. Declaration order is the output sort order within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    Mongoose,
    SequelizeDefine,
    Typeorm,
    ConstructorFunction,
    Class,
    Interface,
    Hapi,
    CallExpression,
    FunctionLike,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Mongoose => "Mongoose",
            ViewKind::SequelizeDefine => "SequelizeDefine",
            ViewKind::Typeorm => "Typeorm",
            ViewKind::ConstructorFunction => "ConstructorFunction",
            ViewKind::Class => "Class",
            ViewKind::Interface => "Interface",
            ViewKind::Hapi => "Hapi",
            ViewKind::CallExpression => "CallExpression",
            ViewKind::FunctionLike => "FunctionLike",
        }
    }

    pub fn group(&self) -> ViewGroup {
        match self {
            ViewKind::Mongoose
            | ViewKind::SequelizeDefine
            | ViewKind::Typeorm
            | ViewKind::ConstructorFunction
            | ViewKind::Class
            | ViewKind::Interface => ViewGroup::DataModel,
            ViewKind::Hapi | ViewKind::CallExpression => ViewGroup::Api,
            ViewKind::FunctionLike => ViewGroup::Method,
        }
    }

    pub fn construct(&self) -> ConstructKind {
        match self {
            ViewKind::Mongoose
            | ViewKind::SequelizeDefine
            | ViewKind::Hapi
            | ViewKind::CallExpression => ConstructKind::CallExpression,
            ViewKind::Typeorm | ViewKind::Class => ConstructKind::Class,
            ViewKind::ConstructorFunction | ViewKind::FunctionLike => ConstructKind::FunctionLike,
            ViewKind::Interface => ConstructKind::Interface,
        }
    }

    /// Generic interpretations tried only when nothing specific matched.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ViewKind::Class | ViewKind::Interface | ViewKind::CallExpression)
    }

    /// Label category for data-model views (`!DataModelLabel!Mongoose`).
    pub fn label_variant(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What every view needs besides its entity.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub module: &'a ResolvedModule,
    pub vocab: &'a Vocabulary,
}

impl<'a> ViewContext<'a> {
    pub fn new(module: &'a ResolvedModule, vocab: &'a Vocabulary) -> Self {
        Self { module, vocab }
    }

    pub fn class_of(&self, key: Option<&EntityKey>) -> Option<&'a ClassEntity> {
        key.and_then(|k| self.module.class(k))
    }
}

type Accepts = fn(&Entity, ViewContext<'_>) -> bool;

/// An ordered `(ViewKind, accepts)` entry.
pub struct Candidate {
    pub kind: ViewKind,
    pub accepts: Accepts,
}

/// Every view, in evaluation order.
pub static CANDIDATES: &[Candidate] = &[
    Candidate { kind: ViewKind::Mongoose, accepts: MongooseView::accepts },
    Candidate { kind: ViewKind::SequelizeDefine, accepts: SequelizeDefineView::accepts },
    Candidate { kind: ViewKind::Typeorm, accepts: ClassModelView::accepts_typeorm },
    Candidate { kind: ViewKind::ConstructorFunction, accepts: ConstructorFunctionView::accepts },
    Candidate { kind: ViewKind::Class, accepts: ClassModelView::accepts_class },
    Candidate { kind: ViewKind::Interface, accepts: InterfaceView::accepts },
    Candidate { kind: ViewKind::Hapi, accepts: HapiView::accepts },
    Candidate { kind: ViewKind::CallExpression, accepts: CallExpressionView::accepts },
    Candidate { kind: ViewKind::FunctionLike, accepts: FunctionLikeView::accepts },
];

/// A view over one entity.
#[derive(Debug)]
pub enum EntityView<'a> {
    Mongoose(MongooseView<'a>),
    SequelizeDefine(SequelizeDefineView<'a>),
    Typeorm(ClassModelView<'a>),
    ConstructorFunction(ConstructorFunctionView<'a>),
    Class(ClassModelView<'a>),
    Interface(InterfaceView<'a>),
    Hapi(HapiView<'a>),
    CallExpression(CallExpressionView<'a>),
    FunctionLike(FunctionLikeView<'a>),
}

impl<'a> EntityView<'a> {
    /// Builds the view of `kind` without checking its predicate.
    ///
    /// Returns `None` when the entity has the wrong construct kind.
    pub fn new(kind: ViewKind, entity: &'a Entity, cx: ViewContext<'a>) -> Option<Self> {
        Some(match kind {
            ViewKind::Mongoose => EntityView::Mongoose(MongooseView::new(entity.as_call()?, cx)?),
            ViewKind::SequelizeDefine => {
                EntityView::SequelizeDefine(SequelizeDefineView::new(entity.as_call()?, cx))
            }
            ViewKind::Typeorm => EntityView::Typeorm(ClassModelView::new(entity.as_class()?, true)),
            ViewKind::ConstructorFunction => {
                EntityView::ConstructorFunction(ConstructorFunctionView::new(entity.as_function()?))
            }
            ViewKind::Class => EntityView::Class(ClassModelView::new(entity.as_class()?, false)),
            ViewKind::Interface => {
                EntityView::Interface(InterfaceView::new(entity.as_interface()?))
            }
            ViewKind::Hapi => EntityView::Hapi(HapiView::new(entity.as_call()?, cx)?),
            ViewKind::CallExpression => {
                EntityView::CallExpression(CallExpressionView::new(entity.as_call()?, cx))
            }
            ViewKind::FunctionLike => {
                EntityView::FunctionLike(FunctionLikeView::new(entity.as_function()?, cx))
            }
        })
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            EntityView::Mongoose(_) => ViewKind::Mongoose,
            EntityView::SequelizeDefine(_) => ViewKind::SequelizeDefine,
            EntityView::Typeorm(_) => ViewKind::Typeorm,
            EntityView::ConstructorFunction(_) => ViewKind::ConstructorFunction,
            EntityView::Class(_) => ViewKind::Class,
            EntityView::Interface(_) => ViewKind::Interface,
            EntityView::Hapi(_) => ViewKind::Hapi,
            EntityView::CallExpression(_) => ViewKind::CallExpression,
            EntityView::FunctionLike(_) => ViewKind::FunctionLike,
        }
    }

    pub fn group(&self) -> ViewGroup {
        self.kind().group()
    }

    pub fn key(&self) -> &'a EntityKey {
        match self {
            EntityView::Mongoose(v) => &v.call().key,
            EntityView::SequelizeDefine(v) => &v.call().key,
            EntityView::Typeorm(v) | EntityView::Class(v) => &v.class().key,
            EntityView::ConstructorFunction(v) => &v.function().key,
            EntityView::Interface(v) => &v.interface().key,
            EntityView::Hapi(v) => &v.call().key,
            EntityView::CallExpression(v) => &v.call().key,
            EntityView::FunctionLike(v) => &v.function().key,
        }
    }

    /// Key of the class the viewed entity is written in.
    pub fn class_key(&self) -> Option<&'a EntityKey> {
        match self {
            EntityView::Mongoose(v) => v.call().class_key.as_ref(),
            EntityView::SequelizeDefine(v) => v.call().class_key.as_ref(),
            EntityView::Hapi(v) => v.call().class_key.as_ref(),
            EntityView::CallExpression(v) => v.call().class_key.as_ref(),
            EntityView::ConstructorFunction(v) => v.function().class_key.as_ref(),
            EntityView::FunctionLike(v) => v.function().class_key.as_ref(),
            EntityView::Typeorm(_) | EntityView::Class(_) | EntityView::Interface(_) => None,
        }
    }

    pub fn as_data_model(&self) -> Option<&dyn DataModel> {
        match self {
            EntityView::Mongoose(v) => Some(v),
            EntityView::SequelizeDefine(v) => Some(v),
            EntityView::Typeorm(v) | EntityView::Class(v) => Some(v),
            EntityView::ConstructorFunction(v) => Some(v),
            EntityView::Interface(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_api(&self) -> Option<&dyn Api> {
        match self {
            EntityView::Hapi(v) => Some(v),
            EntityView::CallExpression(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_call_expression(&self) -> Option<&CallExpressionView<'a>> {
        match self {
            EntityView::CallExpression(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&FunctionLikeView<'a>> {
        match self {
            EntityView::FunctionLike(v) => Some(v),
            _ => None,
        }
    }
}

/// The views selected for one entity.
#[derive(Debug)]
pub struct Selection<'a> {
    pub views: Vec<EntityView<'a>>,
    /// Groups where more than one specific view accepted.
    pub ambiguous: Vec<(ViewGroup, Vec<ViewKind>)>,
}

/// Runs the candidate predicates for `entity` over the enabled groups.
pub fn select<'a>(entity: &'a Entity, cx: ViewContext<'a>, groups: &[ViewGroup]) -> Selection<'a> {
    select_from(CANDIDATES, entity, cx, groups)
}

/// [`select`] over an explicit candidate list.
pub fn select_from<'a>(
    candidates: &[Candidate],
    entity: &'a Entity,
    cx: ViewContext<'a>,
    groups: &[ViewGroup],
) -> Selection<'a> {
    let mut selection = Selection {
        views: Vec::new(),
        ambiguous: Vec::new(),
    };

    for group in ViewGroup::ALL.iter().filter(|g| groups.contains(g)) {
        let applicable = || {
            candidates
                .iter()
                .filter(move |c| c.kind.group() == *group && c.kind.construct() == entity.kind())
        };

        let specific: Vec<ViewKind> = applicable()
            .filter(|c| !c.kind.is_fallback() && (c.accepts)(entity, cx))
            .map(|c| c.kind)
            .collect();

        let accepted = if specific.is_empty() {
            applicable()
                .filter(|c| c.kind.is_fallback() && (c.accepts)(entity, cx))
                .map(|c| c.kind)
                .collect()
        } else {
            if specific.len() > 1 {
                warn!(
                    key = %entity.key(),
                    group = %group,
                    views = ?specific,
                    "entity accepted by more than one view"
                );
                selection.ambiguous.push((*group, specific.clone()));
            }
            specific
        };

        selection
            .views
            .extend(accepted.into_iter().filter_map(|kind| EntityView::new(kind, entity, cx)));
    }

    selection
}

//! Entity model and the two-phase module pipeline.
//!
//! [`build`] turns a [`ParsedModule`](crate::model::ParsedModule) into an
//! [`UnresolvedModule`]; [`resolve`] consumes that and returns a
//! [`ResolvedModule`]. Views can only be built over a `ResolvedModule`, so
//! nothing observes an entity before its references are settled.

mod arena;
mod key;
mod resolve;
mod types;

pub use arena::{build, ResolvedModule, UnresolvedModule};
pub use key::{ConstructKind, EntityKey};
pub use resolve::resolve;
pub use types::{
    ArgumentInfo, CallLikeEntity, ClassEntity, DecoratorInfo, Entity, FunctionEntity,
    InterfaceEntity, SiblingsInfo,
};

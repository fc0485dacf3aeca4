//! The method view.

use crate::entity::{ClassEntity, Entity, FunctionEntity};

use super::ViewContext;

/// A function-like that takes at least one parameter.
#[derive(Debug)]
pub struct FunctionLikeView<'a> {
    function: &'a FunctionEntity,
    cx: ViewContext<'a>,
}

impl<'a> FunctionLikeView<'a> {
    pub fn accepts(entity: &Entity, _cx: ViewContext<'_>) -> bool {
        entity
            .as_function()
            .is_some_and(|function| !function.parameters.is_empty())
    }

    pub fn new(function: &'a FunctionEntity, cx: ViewContext<'a>) -> Self {
        Self { function, cx }
    }

    pub fn function(&self) -> &'a FunctionEntity {
        self.function
    }

    pub fn class_entity(&self) -> Option<&'a ClassEntity> {
        self.cx.class_of(self.function.class_key.as_ref())
    }

    /// Parameter name to declared type, in declaration order.
    pub fn parameter_types(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.function
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str()))
    }
}

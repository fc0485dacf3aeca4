//! Built-in feature and label providers, grouped by what they describe.

pub mod call_expression;
pub mod class;
pub mod common;
pub mod data_model;
pub mod labels;
pub mod method;

use crate::entity::{CallLikeEntity, FunctionEntity};
use crate::error::ProviderError;
use crate::views::{Api, DataModel};

use super::ProviderInput;

fn api_of<'a>(input: &ProviderInput<'a>) -> Result<&'a dyn Api, ProviderError> {
    input.api().ok_or(ProviderError::NotApplicable)
}

fn call_of<'a>(input: &ProviderInput<'a>) -> Result<&'a CallLikeEntity, ProviderError> {
    input.call().ok_or(ProviderError::NotApplicable)
}

fn data_model_of<'a>(input: &ProviderInput<'a>) -> Result<&'a dyn DataModel, ProviderError> {
    input.data_model().ok_or(ProviderError::NotApplicable)
}

fn function_of<'a>(input: &ProviderInput<'a>) -> Result<&'a FunctionEntity, ProviderError> {
    input.function().ok_or(ProviderError::NotApplicable)
}

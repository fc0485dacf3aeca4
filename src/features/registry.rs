//! Provider registry and per-view dispatch.
//!
//! Providers are registered against a [`Target`]. Every provider of a
//! group runs for every view of that group, so a group always yields the
//! same feature names. A provider whose target does not match the view
//! emits [`IRRELEVANT_VALUE`](super::IRRELEVANT_VALUE) for each of its
//! names, and a label whose target does not match is `false`.

use tracing::{debug, trace};

use crate::entity::{CallLikeEntity, ClassEntity, ConstructKind, EntityKey, FunctionEntity};
use crate::error::ProviderError;
use crate::views::{Api, DataModel, EntityView, FunctionLikeView, ViewContext, ViewGroup, ViewKind};

use super::{format_label, providers, Diagnostic, DiagnosticKind, FeatureMap, FeatureValue};

pub const DEFAULT_MAX_STRING_LENGTH: usize = 256;

/// Knobs that change feature values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSettings {
    pub max_string_length: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
        }
    }
}

/// What a provider applies to. `None` matches any construct or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub group: ViewGroup,
    pub construct: Option<ConstructKind>,
    pub view: Option<ViewKind>,
}

impl Target {
    pub fn group(group: ViewGroup) -> Self {
        Self {
            group,
            construct: None,
            view: None,
        }
    }

    pub fn construct(mut self, construct: ConstructKind) -> Self {
        self.construct = Some(construct);
        self
    }

    pub fn view(mut self, view: ViewKind) -> Self {
        self.construct = Some(view.construct());
        self.view = Some(view);
        self
    }

    pub fn matches(&self, view: &EntityView<'_>) -> bool {
        let kind = view.kind();
        kind.group() == self.group
            && self.construct.map_or(true, |c| c == kind.construct())
            && self.view.map_or(true, |v| v == kind)
    }
}

/// Everything a provider may read.
pub struct ProviderInput<'a> {
    pub view: &'a EntityView<'a>,
    pub cx: ViewContext<'a>,
    /// Labels already computed for this view, in dispatch order.
    pub labels: &'a [(String, bool)],
    pub settings: &'a ProviderSettings,
}

impl<'a> ProviderInput<'a> {
    pub fn key(&self) -> &'a EntityKey {
        self.view.key()
    }

    pub fn api(&self) -> Option<&'a dyn Api> {
        self.view.as_api()
    }

    pub fn call(&self) -> Option<&'a CallLikeEntity> {
        self.api().map(|api| api.call())
    }

    pub fn data_model(&self) -> Option<&'a dyn DataModel> {
        self.view.as_data_model()
    }

    pub fn method(&self) -> Option<&'a FunctionLikeView<'a>> {
        self.view.as_method()
    }

    pub fn function(&self) -> Option<&'a FunctionEntity> {
        self.method().map(FunctionLikeView::function)
    }

    pub fn class_entity(&self) -> Option<&'a ClassEntity> {
        self.cx.class_of(self.view.class_key())
    }

    pub fn label(&self, name: &str) -> Option<bool> {
        self.labels.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Truncates `value` to the configured maximum length.
    pub fn cap(&self, value: &str, field: &str) -> String {
        let max = self.settings.max_string_length;
        if value.chars().count() <= max {
            return value.to_string();
        }
        debug!(key = %self.key(), field, max, "capping long string feature");
        value.chars().take(max).collect()
    }
}

pub trait FeatureProvider: Send + Sync {
    fn names(&self) -> &[&'static str];

    fn id(&self) -> &str {
        self.names().first().copied().unwrap_or("anonymous")
    }

    fn is_relevant(&self, _input: &ProviderInput<'_>) -> bool {
        true
    }

    /// One value per name.
    fn values(&self, input: &ProviderInput<'_>) -> Result<Vec<FeatureValue>, ProviderError>;
}

pub trait LabelProvider: Send + Sync {
    fn category(&self) -> &str;
    fn variant(&self) -> &str;

    fn name(&self) -> String {
        format_label(self.category(), self.variant())
    }

    /// `Ok` when the label applies, `Err(NotApplicable)` when it does not.
    fn evaluate(&self, input: &ProviderInput<'_>) -> Result<(), ProviderError>;
}

type ComputeFn = fn(&ProviderInput<'_>) -> Result<Vec<FeatureValue>, ProviderError>;
type RelevantFn = fn(&ProviderInput<'_>) -> bool;

/// A feature provider made of plain functions.
pub struct FnFeature {
    pub names: &'static [&'static str],
    pub relevant: Option<RelevantFn>,
    pub compute: ComputeFn,
}

impl FnFeature {
    pub const fn new(names: &'static [&'static str], compute: ComputeFn) -> Self {
        Self {
            names,
            relevant: None,
            compute,
        }
    }

    pub const fn relevant_when(mut self, relevant: RelevantFn) -> Self {
        self.relevant = Some(relevant);
        self
    }
}

impl FeatureProvider for FnFeature {
    fn names(&self) -> &[&'static str] {
        self.names
    }

    fn is_relevant(&self, input: &ProviderInput<'_>) -> bool {
        self.relevant.map_or(true, |relevant| relevant(input))
    }

    fn values(&self, input: &ProviderInput<'_>) -> Result<Vec<FeatureValue>, ProviderError> {
        (self.compute)(input)
    }
}

/// A label that applies when `check` returns true.
pub struct FnLabel {
    pub category: &'static str,
    pub variant: &'static str,
    pub check: RelevantFn,
}

impl FnLabel {
    pub const fn new(category: &'static str, variant: &'static str, check: RelevantFn) -> Self {
        Self {
            category,
            variant,
            check,
        }
    }
}

impl LabelProvider for FnLabel {
    fn category(&self) -> &str {
        self.category
    }

    fn variant(&self) -> &str {
        self.variant
    }

    fn evaluate(&self, input: &ProviderInput<'_>) -> Result<(), ProviderError> {
        if (self.check)(input) {
            Ok(())
        } else {
            Err(ProviderError::NotApplicable)
        }
    }
}

/// Ordered feature and label providers.
#[derive(Default)]
pub struct Registry {
    features: Vec<(Target, Box<dyn FeatureProvider>)>,
    labels: Vec<(Target, Box<dyn LabelProvider>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in provider, in output order.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        providers::labels::register(&mut registry);
        providers::data_model::register(&mut registry);
        providers::common::register(&mut registry);
        providers::call_expression::register(&mut registry);
        providers::class::register(&mut registry);
        providers::method::register(&mut registry);
        registry
    }

    pub fn register_feature(
        &mut self,
        target: Target,
        provider: impl FeatureProvider + 'static,
    ) -> &mut Self {
        self.features.push((target, Box::new(provider)));
        self
    }

    pub fn register_label(
        &mut self,
        target: Target,
        provider: impl LabelProvider + 'static,
    ) -> &mut Self {
        self.labels.push((target, Box::new(provider)));
        self
    }

    /// Output names for `group`, in the order dispatch emits them.
    pub fn names_for(&self, group: ViewGroup) -> Vec<String> {
        let labels = self
            .labels
            .iter()
            .filter(|(t, _)| t.group == group)
            .map(|(_, p)| p.name());
        let features = self
            .features
            .iter()
            .filter(|(t, _)| t.group == group)
            .flat_map(|(_, p)| p.names().iter().map(|n| n.to_string()));
        labels.chain(features).collect()
    }

    /// Runs labels, then features, for one view.
    pub fn dispatch(
        &self,
        view: &EntityView<'_>,
        cx: ViewContext<'_>,
        settings: &ProviderSettings,
    ) -> (FeatureMap, Vec<Diagnostic>) {
        let group = view.group();
        let key = view.key();
        let mut features = FeatureMap::new();
        let mut diagnostics = Vec::new();
        let mut labels: Vec<(String, bool)> = Vec::new();

        for (target, provider) in self.labels.iter().filter(|(t, _)| t.group == group) {
            let name = provider.name();
            let value = if target.matches(view) {
                let input = ProviderInput {
                    view,
                    cx,
                    labels: &labels,
                    settings,
                };
                match provider.evaluate(&input) {
                    Ok(()) => Some(true),
                    Err(ProviderError::NotApplicable) => Some(false),
                    Err(ProviderError::Failed(message)) => {
                        diagnostics.push(Diagnostic::new(
                            key,
                            name.as_str(),
                            DiagnosticKind::ProviderFailed,
                            message,
                        ));
                        None
                    }
                }
            } else {
                Some(false)
            };
            trace!(key = %key, label = %name, ?value, "label evaluated");
            if let Some(value) = value {
                labels.push((name, value));
            }
        }
        for (name, value) in &labels {
            features.insert(name.clone(), FeatureValue::Bool(*value));
        }

        let input = ProviderInput {
            view,
            cx,
            labels: &labels,
            settings,
        };
        for (target, provider) in self.features.iter().filter(|(t, _)| t.group == group) {
            let names = provider.names();
            trace!(key = %key, provider = provider.id(), "running feature provider");
            if !target.matches(view) || !provider.is_relevant(&input) {
                for name in names {
                    features.insert(*name, FeatureValue::irrelevant());
                }
                continue;
            }
            match provider.values(&input) {
                Ok(values) if values.len() == names.len() => {
                    for (name, value) in names.iter().zip(values) {
                        features.insert(*name, value);
                    }
                }
                Ok(values) => diagnostics.push(Diagnostic::new(
                    key,
                    provider.id(),
                    DiagnosticKind::ValueCountMismatch,
                    format!("{} names but {} values", names.len(), values.len()),
                )),
                Err(ProviderError::NotApplicable) => {
                    for name in names {
                        features.insert(*name, FeatureValue::irrelevant());
                    }
                }
                Err(ProviderError::Failed(message)) => diagnostics.push(Diagnostic::new(
                    key,
                    provider.id(),
                    DiagnosticKind::ProviderFailed,
                    message,
                )),
            }
        }

        (features, diagnostics)
    }
}

//! Runs the pipeline over a batch of modules.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::ExtractorConfig;
use crate::entity::{build, resolve};
use crate::features::{Diagnostic, DiagnosticKind, FeatureRecord, ProviderSettings, Registry};
use crate::model::ParsedModule;
use crate::views::{select_from, Candidate, ViewContext, ViewGroup, CANDIDATES};
use crate::vocab::Vocabulary;

use super::types::{Extraction, ModuleRecord};

/// Drives build, resolve, view selection and dispatch for each module.
///
/// Modules are independent; with `parallel` set they are processed on the
/// rayon pool and the merged output is sorted, so the result does not
/// depend on scheduling.
pub struct Extractor {
    registry: Registry,
    candidates: &'static [Candidate],
    vocab: Vocabulary,
    settings: ProviderSettings,
    groups: Vec<ViewGroup>,
    include_all_snippets: bool,
    parallel: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Registry::with_defaults())
    }
}

impl Extractor {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            candidates: CANDIDATES,
            vocab: Vocabulary::default(),
            settings: ProviderSettings::default(),
            groups: ViewGroup::ALL.to_vec(),
            include_all_snippets: false,
            parallel: true,
        }
    }

    /// The default registry configured from `config`. Honors the
    /// `INCLUDE_ALL_SNIPPETS` environment override.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            registry: Registry::with_defaults(),
            candidates: CANDIDATES,
            vocab: config.vocabulary(),
            settings: config.provider_settings(),
            groups: config.enabled_groups(),
            include_all_snippets: config.include_all_snippets(),
            parallel: config.parallel,
        }
    }

    pub fn with_groups(mut self, groups: Vec<ViewGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Replaces the view candidate table. Defaults to [`CANDIDATES`].
    pub fn with_candidates(mut self, candidates: &'static [Candidate]) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn include_all_snippets(mut self, include: bool) -> Self {
        self.include_all_snippets = include;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn groups(&self) -> &[ViewGroup] {
        &self.groups
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Extracts every module and returns the merged, sorted output.
    pub fn extract(&self, modules: Vec<ParsedModule>) -> Extraction {
        let module_count = modules.len();
        let parts: Vec<Extraction> = if self.parallel {
            modules
                .into_par_iter()
                .map(|m| self.extract_module(m))
                .collect()
        } else {
            modules.into_iter().map(|m| self.extract_module(m)).collect()
        };

        let mut extraction = Extraction::default();
        for part in parts {
            extraction.merge(part);
        }

        extraction.records.sort_by(|a, b| {
            let ka = (a.group, a.entity_key.path(), a.entity_key.span(), a.view);
            let kb = (b.group, b.entity_key.path(), b.entity_key.span(), b.view);
            ka.cmp(&kb)
        });
        extraction.modules.sort_by(|a, b| a.path.cmp(&b.path));
        extraction.diagnostics.sort_by(|a, b| {
            (&a.entity_key, &a.provider, &a.message).cmp(&(&b.entity_key, &b.provider, &b.message))
        });

        info!(
            modules = module_count,
            api = extraction.count(ViewGroup::Api),
            data_model = extraction.count(ViewGroup::DataModel),
            method = extraction.count(ViewGroup::Method),
            diagnostics = extraction.diagnostics.len(),
            "extraction finished"
        );
        extraction
    }

    /// Extracts a single module. Records come out in entity order.
    pub fn extract_module(&self, module: ParsedModule) -> Extraction {
        let module = resolve(build(module), &self.vocab);
        let cx = ViewContext::new(&module, &self.vocab);
        let mut out = Extraction {
            modules: vec![ModuleRecord::of(&module)],
            ..Default::default()
        };

        for entity in module.entities() {
            let selection = select_from(self.candidates, entity, cx, &self.groups);

            for (group, kinds) in &selection.ambiguous {
                let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                out.diagnostics.push(Diagnostic::new(
                    entity.key(),
                    group.as_str(),
                    DiagnosticKind::AmbiguousView,
                    format!("accepted by {}", names.join(", ")),
                ));
            }

            for view in &selection.views {
                let (features, diagnostics) = self.registry.dispatch(view, cx, &self.settings);
                out.diagnostics.extend(diagnostics);

                if view.group() == ViewGroup::Api
                    && !self.include_all_snippets
                    && !features.has_true_label()
                {
                    debug!(key = %view.key(), "dropping api record without a label");
                    continue;
                }

                out.records.push(FeatureRecord {
                    entity_key: view.key().clone(),
                    group: view.group(),
                    view: view.kind(),
                    features,
                });
            }
        }

        out
    }
}

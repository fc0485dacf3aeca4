//! Output types of an extraction run.

use serde::Serialize;

use crate::entity::ResolvedModule;
use crate::features::{Diagnostic, FeatureRecord};
use crate::views::ViewGroup;

/// One entry per analysed module, with its import specifiers as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    pub path: String,
    pub raw_imports: Vec<String>,
}

impl ModuleRecord {
    pub(crate) fn of(module: &ResolvedModule) -> Self {
        Self {
            path: module.path().to_string(),
            raw_imports: module.imports().iter().map(|i| i.specifier.clone()).collect(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub records: Vec<FeatureRecord>,
    pub modules: Vec<ModuleRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn records_in(&self, group: ViewGroup) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter().filter(move |r| r.group == group)
    }

    pub fn count(&self, group: ViewGroup) -> usize {
        self.records_in(group).count()
    }

    /// Concatenates another extraction. Ordering is restored by the driver.
    pub(crate) fn merge(&mut self, other: Extraction) {
        self.records.extend(other.records);
        self.modules.extend(other.modules);
        self.diagnostics.extend(other.diagnostics);
    }
}

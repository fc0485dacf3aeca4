//! featurelens - code feature extraction for JavaScript and TypeScript.
//!
//! featurelens turns source modules into labelled feature records that
//! downstream classifiers train on. Three kinds of code are recognized:
//! ORM data models (mongoose, sequelize, typeorm), HTTP API route
//! registrations (express, koa, nestjs, hapi and friends) and methods.
//!
//! # Architecture
//!
//! Each module flows through a fixed pipeline:
//!
//! - `frontend`: tree-sitter parsing and lowering to the [`ParsedModule`] model
//! - `entity`: entity arena per module, then reference and call-edge resolution
//! - `views`: the typed views (group + kind) each entity qualifies for
//! - `features`: label and feature providers, dispatched through a [`Registry`]
//! - `extract`: runs the pipeline over many modules and merges the output
//! - `report`: output formatting (pretty, JSON)
//!
//! Modules are independent; nothing in the pipeline looks across files.
//!
//! # Adding a Provider
//!
//! See `src/features/providers/` for examples. Implement `LabelProvider` or
//! `FeatureProvider` and register it in `Registry::with_defaults`.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod extract;
pub mod features;
#[cfg(feature = "tree-sitter")]
pub mod frontend;
pub mod model;
pub mod report;
pub mod views;
pub mod vocab;

pub use config::ExtractorConfig;
pub use entity::{build, resolve, EntityKey, ResolvedModule};
pub use error::{ExtractError, ProviderError};
pub use extract::{Extraction, Extractor, ModuleRecord};
pub use features::{
    Diagnostic, DiagnosticKind, FeatureMap, FeatureRecord, FeatureValue, Registry,
};
pub use model::ParsedModule;
pub use views::{select, ViewGroup, ViewKind};
pub use vocab::Vocabulary;

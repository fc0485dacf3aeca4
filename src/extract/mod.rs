//! Batch extraction: modules in, feature records out.

mod driver;
mod types;

pub use driver::Extractor;
pub use types::{Extraction, ModuleRecord};

//! Tree-sitter front-end: JavaScript and TypeScript sources to [`ParsedModule`].
//!
//! One [`Frontend`] per grammar. Front-ends are created lazily and shared;
//! `tree_sitter::Parser` is not `Sync`, so each parse creates its own.

mod typescript;
mod walker;

pub use typescript::ScriptFrontend;

use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

use crate::model::{ParsedModule, Span};

/// A parsed tree and the bytes it was parsed from.
pub struct ParsedSource {
    pub tree: tree_sitter::Tree,
    pub source: Vec<u8>,
    /// Module path recorded in the output.
    pub path: String,
}

impl ParsedSource {
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Location of `node` as (line, character). Tree-sitter columns are
    /// byte offsets, so they are re-counted in characters.
    pub fn span(&self, node: tree_sitter::Node) -> Span {
        let start = node.start_position();
        let end = node.end_position();
        Span::new(
            (start.row, self.char_column(node.start_byte(), start.column)),
            (end.row, self.char_column(node.end_byte(), end.column)),
        )
    }

    fn char_column(&self, byte: usize, column: usize) -> usize {
        let line_start = byte.saturating_sub(column);
        self.source
            .get(line_start..byte)
            .and_then(|prefix| std::str::from_utf8(prefix).ok())
            .map_or(column, |prefix| prefix.chars().count())
    }
}

/// Language-specific front-end.
pub trait Frontend: Send + Sync {
    /// Language identifier recorded on the module (`typescript`, `javascript`).
    fn language_id(&self) -> &'static str;

    /// File extensions handled, without the dot.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parses source bytes. Syntax errors still yield a tree with ERROR nodes.
    fn parse(&self, path: &str, source: &[u8]) -> anyhow::Result<ParsedSource>;

    /// Lowers a parsed tree to the engine's input model.
    fn lower(&self, parsed: &ParsedSource) -> anyhow::Result<ParsedModule>;

    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}

static TYPESCRIPT: OnceCell<ScriptFrontend> = OnceCell::new();
static TSX: OnceCell<ScriptFrontend> = OnceCell::new();
static JAVASCRIPT: OnceCell<ScriptFrontend> = OnceCell::new();

/// Front-end for a file extension, if any.
pub fn get_frontend(ext: &str) -> Option<&'static dyn Frontend> {
    match ext {
        "ts" | "mts" | "cts" => Some(TYPESCRIPT.get_or_init(ScriptFrontend::typescript)),
        "tsx" => Some(TSX.get_or_init(ScriptFrontend::tsx)),
        "js" | "jsx" | "mjs" | "cjs" => Some(JAVASCRIPT.get_or_init(ScriptFrontend::javascript)),
        _ => None,
    }
}

/// Every extension some front-end handles.
pub fn registered_extensions() -> &'static [&'static str] {
    &["ts", "mts", "cts", "tsx", "js", "jsx", "mjs", "cjs"]
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| get_frontend(ext).is_some())
}

/// Parses and lowers in-memory source. `path` picks the front-end by
/// extension and becomes the module path.
pub fn parse_source(path: &str, source: &str) -> anyhow::Result<ParsedModule> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let frontend = get_frontend(ext)
        .ok_or_else(|| crate::ExtractError::UnsupportedLanguage(ext.to_string()))?;
    let parsed = frontend.parse(path, source.as_bytes())?;
    if parsed.has_errors() {
        debug!(path = %path, "source has syntax errors, lowering what parsed");
    }
    frontend.lower(&parsed)
}

/// Path of `file` relative to `root`, with `/` separators. A root that is
/// the file itself yields the file name.
pub fn module_path(root: &Path, file: &Path) -> String {
    let relative = if root == file {
        file.file_name().map(Path::new).unwrap_or(file)
    } else {
        file.strip_prefix(root).unwrap_or(file)
    };
    relative.to_string_lossy().replace('\\', "/")
}

/// Reads and lowers one file.
pub fn parse_file(root: &Path, file: &Path) -> anyhow::Result<ParsedModule> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", file.display(), e))?;
    parse_source(&module_path(root, file), &source).map_err(|e| {
        crate::ExtractError::Frontend {
            path: file.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Lowers files in parallel. Failures are logged and the file is skipped.
/// Output is sorted by module path.
pub fn parse_files(root: &Path, files: &[std::path::PathBuf]) -> Vec<ParsedModule> {
    parse_files_with(root, files, || {})
}

/// [`parse_files`], calling `on_file` once per file as it finishes.
pub fn parse_files_with<F>(
    root: &Path,
    files: &[std::path::PathBuf],
    on_file: F,
) -> Vec<ParsedModule>
where
    F: Fn() + Sync,
{
    let mut modules: Vec<ParsedModule> = files
        .par_iter()
        .filter_map(|file| {
            let result = parse_file(root, file);
            on_file();
            match result {
                Ok(module) => Some(module),
                Err(e) => {
                    warn!(error = %e, "skipping file");
                    None
                }
            }
        })
        .collect();
    modules.sort_by(|a, b| a.path.cmp(&b.path));
    modules
}

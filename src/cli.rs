//! Command-line interface for featurelens.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{self, ExtractorConfig, DEFAULT_TEMPLATE};
use crate::extract::Extractor;
use crate::model::ParsedModule;
use crate::report::{self, ReportMeta};
use crate::views::ViewGroup;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_DIAGNOSTICS: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "vendor", "bower_components"];

/// Test directories, skipped unless `include_test_files` is set.
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "__mocks__", "testdata", "test_data"];

/// Code feature extraction for JavaScript and TypeScript.
///
/// Finds ORM data models, HTTP API route registrations and methods, and
/// computes a named feature set for each one.
#[derive(Parser)]
#[command(name = "featurelens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract feature records from a file or directory
    #[command(visible_alias = "scan")]
    Extract(ExtractArgs),
    /// Write a default configuration file
    Init(InitArgs),
    /// Print the lowered module model of a single source file as JSON
    Inspect(InspectArgs),
}

/// Arguments for the extract command.
#[derive(Parser)]
pub struct ExtractArgs {
    /// Path to scan (file or directory). A `.json` file is read as
    /// pre-lowered modules.
    pub path: PathBuf,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Only emit these groups (api, data_model, method). Repeatable.
    #[arg(short, long = "group")]
    pub groups: Vec<String>,

    /// Keep api records that have no positive label
    #[arg(long)]
    pub include_all_snippets: bool,

    /// Include per-module import lists in JSON output
    #[arg(long)]
    pub modules_json: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit non-zero when any diagnostic was produced
    #[arg(long)]
    pub strict: bool,

    /// Verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "featurelens.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the inspect command.
#[derive(Parser)]
pub struct InspectArgs {
    /// Source file to lower
    pub file: PathBuf,
}

impl Commands {
    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Extract(args) if args.verbose)
    }
}

fn is_skipped_dir(name: &str, include_test_files: bool) -> bool {
    name.starts_with('.')
        || SKIPPED_DIRS.contains(&name)
        || (!include_test_files && TEST_DIRS.contains(&name))
}

fn is_test_file(name: &str) -> bool {
    [".test.", ".spec."].iter().any(|marker| name.contains(marker))
}

/// Source files under `root` a front-end can handle, sorted.
pub fn collect_files(root: &Path, config: &ExtractorConfig) -> anyhow::Result<Vec<PathBuf>> {
    let exclusions = config.exclusions()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            !is_skipped_dir(&e.file_name().to_string_lossy(), config.include_test_files)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclusions.is_match(relative) {
            debug!(path = %relative.display(), "excluded by configuration");
            continue;
        }
        if !config.include_test_files && is_test_file(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if is_source_file(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(feature = "tree-sitter")]
fn is_source_file(path: &Path) -> bool {
    crate::frontend::is_supported(path)
}

#[cfg(not(feature = "tree-sitter"))]
fn is_source_file(_path: &Path) -> bool {
    false
}

fn is_json_input(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("  {spinner} parsing [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}

/// Lowers the files. Unparseable files are logged and skipped.
#[cfg(feature = "tree-sitter")]
fn lower_files(root: &Path, files: &[PathBuf], show_progress: bool) -> Vec<ParsedModule> {
    let bar = if show_progress {
        progress_bar(files.len())
    } else {
        ProgressBar::hidden()
    };
    let modules = crate::frontend::parse_files_with(root, files, || bar.inc(1));
    bar.finish_and_clear();
    modules
}

#[cfg(not(feature = "tree-sitter"))]
fn lower_files(_root: &Path, files: &[PathBuf], _show_progress: bool) -> Vec<ParsedModule> {
    if !files.is_empty() {
        tracing::warn!("built without the tree-sitter feature, source files are ignored");
    }
    Vec::new()
}

/// Modules for `path`: a JSON model file, a single source file, or a tree.
fn load_modules(
    path: &Path,
    config: &ExtractorConfig,
    show_progress: bool,
) -> anyhow::Result<Vec<ParsedModule>> {
    if is_json_input(path) {
        return Ok(ParsedModule::read_json_file(path)?);
    }
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        let files = collect_files(path, config)?;
        Ok(lower_files(path, &files, show_progress))
    } else {
        let root = path.parent().unwrap_or(path);
        Ok(lower_files(root, &[path.to_path_buf()], false))
    }
}

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config_path = args.config.clone().or_else(config::discover);
    let mut config = match ExtractorConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if !args.groups.is_empty() {
        config.groups = args.groups.clone();
    }
    if args.include_all_snippets {
        config.include_all_snippets = true;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let show_progress = args.format == "pretty" && args.output.is_none();
    let modules = load_modules(&abs_path, &config, show_progress)?;
    if modules.is_empty() {
        eprintln!("Warning: no modules to extract");
    }

    let extractor = Extractor::from_config(&config);
    let groups: Vec<ViewGroup> = extractor.groups().to_vec();
    let extraction = extractor.extract(modules);

    let meta = ReportMeta {
        path: args.path.to_string_lossy().to_string(),
        config: config_path
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default(),
        include_modules: args.modules_json,
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    match args.format.as_str() {
        "json" => report::write_json(&mut out, &meta, &groups, &extraction)?,
        _ => report::write_pretty(&mut out, &meta, &groups, &extraction)?,
    }
    out.flush()?;

    if args.strict && !extraction.diagnostics.is_empty() {
        Ok(EXIT_DIAGNOSTICS)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or pass --force to overwrite");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize for your project", args.output.display());
    println!("  2. Run: featurelens extract . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// Run the inspect command.
#[cfg(feature = "tree-sitter")]
pub fn run_inspect(args: &InspectArgs) -> anyhow::Result<i32> {
    let root = args.file.parent().unwrap_or(&args.file);
    let module = crate::frontend::parse_file(root, &args.file)?;
    println!("{}", serde_json::to_string_pretty(&module)?);
    Ok(EXIT_SUCCESS)
}

#[cfg(not(feature = "tree-sitter"))]
pub fn run_inspect(_args: &InspectArgs) -> anyhow::Result<i32> {
    eprintln!("Error: inspect requires the tree-sitter feature");
    Ok(EXIT_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_skipped_dirs() {
        assert!(is_skipped_dir("node_modules", true));
        assert!(is_skipped_dir(".git", true));
        assert!(is_skipped_dir("__tests__", false));
        assert!(!is_skipped_dir("__tests__", true));
        assert!(!is_skipped_dir("src", false));
    }

    #[test]
    fn test_test_file_names() {
        assert!(is_test_file("user.test.ts"));
        assert!(is_test_file("user.spec.js"));
        assert!(!is_test_file("user.ts"));
    }

    #[cfg(feature = "tree-sitter")]
    #[test]
    fn test_collect_files_filters() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/app.ts", "");
        write(dir.path(), "src/app.test.ts", "");
        write(dir.path(), "src/readme.md", "");
        write(dir.path(), "node_modules/x/index.js", "");
        write(dir.path(), "dist/app.js", "");
        write(dir.path(), "lib/util.js", "");

        let config = ExtractorConfig {
            excluded_paths: vec!["dist/**".to_string()],
            ..Default::default()
        };
        let files = collect_files(dir.path(), &config).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| crate::frontend::module_path(dir.path(), f))
            .collect();
        assert_eq!(names, vec!["lib/util.js", "src/app.ts"]);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("featurelens.yaml");
        let args = InitArgs {
            output: output.clone(),
            force: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(fs::read_to_string(&output).unwrap(), DEFAULT_TEMPLATE);
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }
}

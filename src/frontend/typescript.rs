//! TypeScript, TSX and JavaScript front-ends.
//!
//! The three grammars share node names for everything the walker reads,
//! so one implementation serves all of them.

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::model::{Import, ImportKind, ParsedModule};

use super::walker::Walker;
use super::{Frontend, ParsedSource};

/// Tree-sitter query for module dependencies.
const IMPORT_QUERY: &str = r#"
; import x from 'module', import 'module'
(import_statement
  source: (string) @import_source
) @import

; export { x } from 'module', export * from 'module'
(export_statement
  source: (string) @reexport_source
) @reexport

; require('module')
(call_expression
  function: (identifier) @require_func (#eq? @require_func "require")
  arguments: (arguments . (string) @require_source)
) @require
"#;

pub struct ScriptFrontend {
    language: Language,
    id: &'static str,
    extensions: &'static [&'static str],
}

impl ScriptFrontend {
    pub fn typescript() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            id: "typescript",
            extensions: &["ts", "mts", "cts"],
        }
    }

    pub fn tsx() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            id: "tsx",
            extensions: &["tsx"],
        }
    }

    pub fn javascript() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
            id: "javascript",
            extensions: &["js", "jsx", "mjs", "cjs"],
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Imports in source order, one per specifier.
    fn extract_imports(&self, parsed: &ParsedSource) -> anyhow::Result<Vec<Import>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports: Vec<(usize, Import)> = Vec::new();

        while let Some(m) = matches.next() {
            let mut specifier = None;
            let mut statement = None;
            let mut kind = ImportKind::Import;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "import_source" | "reexport_source" | "require_source" => {
                        specifier = Some(unquote(parsed.node_text(capture.node)).to_string());
                    }
                    "import" => statement = Some(capture.node),
                    "reexport" => {
                        statement = Some(capture.node);
                        kind = ImportKind::Reexport;
                    }
                    "require" => {
                        statement = Some(capture.node);
                        kind = ImportKind::Require;
                    }
                    _ => {}
                }
            }

            let (Some(specifier), Some(node)) = (specifier, statement) else {
                continue;
            };
            let bindings = import_bindings(parsed, node, kind);
            match imports.iter_mut().find(|(_, i)| i.specifier == specifier) {
                Some((_, existing)) => {
                    for name in bindings {
                        if !existing.bindings.contains(&name) {
                            existing.bindings.push(name);
                        }
                    }
                }
                None => imports.push((
                    node.start_byte(),
                    Import {
                        specifier,
                        kind,
                        bindings,
                    },
                )),
            }
        }

        imports.sort_by_key(|(start, _)| *start);
        Ok(imports.into_iter().map(|(_, i)| i).collect())
    }
}

/// Strips one layer of matching quotes or backticks.
pub(crate) fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['\'', '"', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Local names an import introduces.
fn import_bindings(parsed: &ParsedSource, node: Node, kind: ImportKind) -> Vec<String> {
    let mut names = Vec::new();
    match kind {
        ImportKind::Import => {
            let mut cursor = node.walk();
            for clause in node.named_children(&mut cursor).filter(|n| n.kind() == "import_clause") {
                collect_clause_names(parsed, clause, &mut names);
            }
        }
        ImportKind::Require => {
            // const x = require('m'), const { a, b } = require('m')
            let declarator = node
                .parent()
                .filter(|p| p.kind() == "variable_declarator")
                .and_then(|p| p.child_by_field_name("name"));
            if let Some(name) = declarator {
                match name.kind() {
                    "identifier" => names.push(parsed.node_text(name).to_string()),
                    _ => collect_pattern_names(parsed, name, &mut names),
                }
            }
        }
        ImportKind::Reexport => {}
    }
    names
}

fn collect_clause_names(parsed: &ParsedSource, clause: Node, names: &mut Vec<String>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(parsed.node_text(child).to_string()),
            "namespace_import" => {
                let mut inner = child.walk();
                let id = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "identifier");
                if let Some(id) = id {
                    names.push(parsed.node_text(id).to_string());
                }
            }
            "named_imports" => {
                let mut inner = child.walk();
                let specifiers = child
                    .named_children(&mut inner)
                    .filter(|n| n.kind() == "import_specifier");
                for spec in specifiers {
                    let local = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(local) = local {
                        names.push(parsed.node_text(local).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_pattern_names(parsed: &ParsedSource, pattern: Node, names: &mut Vec<String>) {
    let mut cursor = pattern.walk();
    for child in pattern.named_children(&mut cursor) {
        match child.kind() {
            "shorthand_property_identifier_pattern" | "identifier" => {
                names.push(parsed.node_text(child).to_string())
            }
            "pair_pattern" => {
                if let Some(value) = child.child_by_field_name("value") {
                    names.push(parsed.node_text(value).to_string());
                }
            }
            _ => {}
        }
    }
}

impl Frontend for ScriptFrontend {
    fn language_id(&self) -> &'static str {
        self.id
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn parse(&self, path: &str, source: &[u8]) -> anyhow::Result<ParsedSource> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse {} source: {}", self.id, path))?;

        Ok(ParsedSource {
            tree,
            source: source.to_vec(),
            path: path.to_string(),
        })
    }

    fn lower(&self, parsed: &ParsedSource) -> anyhow::Result<ParsedModule> {
        let mut module = Walker::new(parsed).lower();
        module.language = self.id.to_string();
        module.imports = self.extract_imports(parsed)?;
        Ok(module)
    }
}

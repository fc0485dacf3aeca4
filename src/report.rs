//! Output formatting for extraction results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal summary for humans
//! - JSON: records grouped by view group, for downstream training pipelines

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::extract::{Extraction, ModuleRecord};
use crate::features::{Diagnostic, FeatureRecord};
use crate::views::ViewGroup;

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON document.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub path: String,
    pub config: String,
    pub files_scanned: usize,
    /// Records keyed by group name, in group order.
    pub groups: BTreeMap<&'static str, Vec<&'a FeatureRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<&'a [ModuleRecord]>,
    pub diagnostics: &'a [Diagnostic],
}

/// Options that shape a report but are not part of the extraction.
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    pub path: String,
    pub config: String,
    pub include_modules: bool,
}

impl<'a> JsonReport<'a> {
    pub fn new(meta: &ReportMeta, groups: &[ViewGroup], extraction: &'a Extraction) -> Self {
        let groups = groups
            .iter()
            .map(|g| (g.as_str(), extraction.records_in(*g).collect()))
            .collect();
        JsonReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: meta.path.clone(),
            config: meta.config.clone(),
            files_scanned: extraction.modules.len(),
            groups,
            modules: meta.include_modules.then_some(extraction.modules.as_slice()),
            diagnostics: &extraction.diagnostics,
        }
    }
}

/// Render results as pretty-printed JSON.
pub fn render_json(
    meta: &ReportMeta,
    groups: &[ViewGroup],
    extraction: &Extraction,
) -> anyhow::Result<String> {
    let report = JsonReport::new(meta, groups, extraction);
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn write_json<W: Write>(
    out: &mut W,
    meta: &ReportMeta,
    groups: &[ViewGroup],
    extraction: &Extraction,
) -> anyhow::Result<()> {
    writeln!(out, "{}", render_json(meta, groups, extraction)?)?;
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a human-readable summary: counts per group, labelled api records
/// and any diagnostics.
pub fn write_pretty<W: Write>(
    out: &mut W,
    meta: &ReportMeta,
    groups: &[ViewGroup],
    extraction: &Extraction,
) -> anyhow::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        "featurelens".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Scanning: ".dimmed(), meta.path)?;
    if !meta.config.is_empty() {
        writeln!(out, "  {}{}", "Config:   ".dimmed(), meta.config)?;
    }
    writeln!(out, "  {}{}", "Files:    ".dimmed(), extraction.modules.len())?;
    writeln!(out)?;

    for group in groups {
        write_group(out, *group, extraction)?;
    }

    if !extraction.diagnostics.is_empty() {
        write_diagnostics(out, &extraction.diagnostics)?;
    }

    if extraction.diagnostics.is_empty() {
        writeln!(out, "  {}", "✓ no diagnostics".green())?;
    } else {
        writeln!(
            out,
            "  {}",
            format!("✗ {} diagnostics", extraction.diagnostics.len()).yellow()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_group<W: Write>(
    out: &mut W,
    group: ViewGroup,
    extraction: &Extraction,
) -> anyhow::Result<()> {
    let records: Vec<&FeatureRecord> = extraction.records_in(group).collect();
    writeln!(out, "  {} ({}):", group.as_str().bold(), records.len())?;

    let mut per_view: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *per_view.entry(record.view.as_str()).or_default() += 1;
    }
    for (view, count) in &per_view {
        writeln!(out, "    {:<22}{:>5}", view.dimmed(), count)?;
    }

    if group == ViewGroup::Api {
        for record in &records {
            let labels: Vec<&str> = record
                .features
                .labels()
                .filter(|(_, v)| *v)
                .map(|(name, _)| name.rsplit('!').next().unwrap_or(name))
                .collect();
            let route = record
                .features
                .get("SuspectedApiRoute")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let method = record
                .features
                .get("SuspectedApiMethod")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            writeln!(
                out,
                "    {:<7} {:<28} {} {}",
                method.green(),
                route,
                record.entity_key.key_string().blue(),
                format!("[{}]", labels.join(", ")).dimmed()
            )?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn write_diagnostics<W: Write>(out: &mut W, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    writeln!(out, "  {} ({}):", "Diagnostics".bold(), diagnostics.len())?;
    writeln!(out)?;
    for d in diagnostics {
        writeln!(
            out,
            "    {} {:<22}{}",
            "WARN ".yellow(),
            d.kind.to_string().dimmed(),
            d.entity_key.blue()
        )?;
        writeln!(out, "            {}: {}", d.provider, d.message)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use crate::model::{Construct, FunctionConstruct, ParsedModule, Span, TypedName};

    fn sample() -> Extraction {
        let mut module = ParsedModule::new("lib/math.ts");
        module.constructs = vec![Construct::Function(FunctionConstruct {
            span: Span::new((0, 0), (2, 1)),
            name: Some("square".into()),
            parameters: vec![TypedName::new("x", "number")],
            ..Default::default()
        })];
        Extractor::default().extract(vec![module])
    }

    #[test]
    fn test_json_groups_and_modules() {
        let extraction = sample();
        let meta = ReportMeta {
            path: "lib".into(),
            include_modules: false,
            ..Default::default()
        };
        let json = render_json(&meta, &ViewGroup::ALL, &extraction).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files_scanned"], 1);
        assert_eq!(value["groups"]["api"].as_array().unwrap().len(), 0);
        assert_eq!(value["groups"]["method"][0]["features"]["MethodName"], "square");
        assert!(value.get("modules").is_none());

        let meta = ReportMeta {
            include_modules: true,
            ..meta
        };
        let json = render_json(&meta, &[ViewGroup::Method], &extraction).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["modules"][0]["path"], "lib/math.ts");
        assert!(value["groups"].get("api").is_none());
    }

    #[test]
    fn test_pretty_output_mentions_views() {
        colored::control::set_override(false);
        let extraction = sample();
        let mut out = Vec::new();
        write_pretty(&mut out, &ReportMeta::default(), &ViewGroup::ALL, &extraction).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("method (1):"));
        assert!(text.contains("FunctionLike"));
        assert!(text.contains("no diagnostics"));
    }
}

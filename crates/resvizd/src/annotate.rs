use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use resviz_analysis::Workspace;
use resviz_config::ResvizConfig;
use resviz_core::Annotation;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationOutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for AnnotationOutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported output format '{other}', expected table or json")),
        }
    }
}

/// One resolved reference as printed by `--annotate`. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRecord {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub reference: String,
    pub display_text: String,
}

impl AnnotationRecord {
    fn from_annotation(annotation: &Annotation, line_text: &str) -> Self {
        let reference = line_text
            .get(annotation.start_column..annotation.end_column)
            .unwrap_or_default()
            .to_owned();

        Self {
            line: annotation.line + 1,
            start_column: annotation.start_column,
            end_column: annotation.end_column,
            reference,
            display_text: annotation.display_text.clone(),
        }
    }
}

pub fn run_annotate_once(
    workspace_root: &Path,
    config: ResvizConfig,
    file: &Path,
    format: AnnotationOutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let file = if file.is_absolute() {
        file.to_path_buf()
    } else {
        workspace_root.join(file)
    };
    let text = fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let workspace = Workspace::new(workspace_root, config);
    let summary = workspace.reload_resources();
    workspace.build_constants();
    tracing::debug!(
        tables = summary.loaded,
        skipped = summary.skipped,
        constants = workspace.constants().len(),
        "workspace loaded for annotation"
    );

    let records = annotation_records(&workspace, &file.to_string_lossy(), &text);
    write_annotations(&records, format, out).context("failed to write annotations")?;
    Ok(())
}

pub fn annotation_records(workspace: &Workspace, file_path: &str, text: &str) -> Vec<AnnotationRecord> {
    let lines = text.lines().collect::<Vec<_>>();
    workspace
        .annotate_document(file_path, text)
        .iter()
        .map(|annotation| {
            let line_text = lines.get(annotation.line).copied().unwrap_or_default();
            AnnotationRecord::from_annotation(annotation, line_text)
        })
        .collect()
}

pub fn write_annotations(
    records: &[AnnotationRecord],
    format: AnnotationOutputFormat,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    match format {
        AnnotationOutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)
        }
        AnnotationOutputFormat::Table => {
            writeln!(out, "line\tstart\tend\treference\tvalue")?;
            for record in records {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    record.line,
                    record.start_column,
                    record.end_column,
                    normalize_table_field(&record.reference),
                    normalize_table_field(&record.display_text)
                )?;
            }
            Ok(())
        }
    }
}

fn normalize_table_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

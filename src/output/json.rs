//! JSON output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, FixSafety, Severity};
use crate::engine::LintResult;
use crate::fix::Edit;
use serde::Serialize;
use std::collections::BTreeSet;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| {
            log::error!("Failed to serialize JSON output: {}", e);
            String::new()
        })
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    diagnostics: Vec<JsonDiagnostic<'a>>,
    defects: Vec<JsonDefect>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    rule_id: &'a str,
    severity: Severity,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
    length: usize,
    start: usize,
    end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_line: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<JsonFix<'a>>,
    requires_review: bool,
    #[serde(skip_serializing_if = "is_empty_slice")]
    notes: &'a [String],
}

#[derive(Serialize)]
struct JsonFix<'a> {
    description: &'a str,
    safety: FixSafety,
    edits: &'a [Edit],
    #[serde(skip_serializing_if = "is_empty_set")]
    imports: &'a BTreeSet<String>,
}

fn is_empty_slice(notes: &&[String]) -> bool {
    notes.is_empty()
}

fn is_empty_set(imports: &&BTreeSet<String>) -> bool {
    imports.is_empty()
}

#[derive(Serialize)]
struct JsonDefect {
    file: String,
    error: String,
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    files_with_errors: usize,
    files_with_warnings: usize,
    call_sites: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    defect_count: usize,
    duration_ms: u128,
}

impl<'a> From<&'a Diagnostic> for JsonDiagnostic<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        JsonDiagnostic {
            rule_id: &d.rule_id,
            severity: d.severity,
            message: &d.message,
            file: d.location.file.display().to_string(),
            line: d.location.line,
            column: d.location.column,
            length: d.location.length,
            start: d.span.start,
            end: d.span.end,
            source_line: d.source_line.as_deref(),
            help: d.help.as_deref(),
            fix: d.fix.as_ref().map(|f| JsonFix {
                description: &f.description,
                safety: f.safety,
                edits: &f.edits,
                imports: &f.imports,
            }),
            requires_review: d.requires_review,
            notes: &d.notes,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &LintResult) -> String {
        let output = JsonOutput {
            diagnostics: result.diagnostics.iter().map(JsonDiagnostic::from).collect(),
            defects: result
                .defects
                .iter()
                .map(|d| JsonDefect {
                    file: d.file.display().to_string(),
                    error: d.error.to_string(),
                })
                .collect(),
            summary: JsonSummary {
                files_processed: result.files_processed,
                files_with_errors: result.files_with_errors,
                files_with_warnings: result.files_with_warnings,
                call_sites: result.call_sites,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                defect_count: result.defects.len(),
                duration_ms: result.duration.as_millis(),
            },
        };

        self.render(&output)
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        self.render(&JsonDiagnostic::from(diagnostic))
    }
}

//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, FixSafety, Severity};
use crate::engine::LintResult;
use crate::fix::FixPlan;
use colored::*;
use std::collections::BTreeMap;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show source context
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show fix suggestions
    pub show_fixes: bool,

    /// Show statistics
    pub show_stats: bool,

    /// Show per-rule timings after the statistics
    pub show_timings: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_fixes: true,
            show_stats: true,
            show_timings: false,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, s: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(s).to_string()
        } else {
            s.to_string()
        }
    }

    fn severity_str(&self, severity: Severity) -> String {
        let s = severity.to_string();
        match severity {
            Severity::Error => self.paint(&s, |s| s.red().bold()),
            Severity::Warning => self.paint(&s, |s| s.yellow().bold()),
            Severity::Info => self.paint(&s, |s| s.blue()),
        }
    }

    fn gutter(&self, mark: &str) -> String {
        self.paint(mark, |s| s.blue())
    }

    fn format_location(&self, diag: &Diagnostic) -> String {
        format!(
            "{}:{}:{}",
            diag.location.file.display(),
            diag.location.line,
            diag.location.column
        )
    }

    fn format_fix(&self, fix: &FixPlan) -> String {
        let marker = match fix.safety {
            FixSafety::Safe => self.paint("fix", |s| s.green()),
            FixSafety::Unsafe => self.paint("unsafe fix", |s| s.yellow()),
            FixSafety::Display => self.paint("suggestion", |s| s.normal()),
        };
        let mut output = format!(
            "   {} {}: {} -> {}\n",
            self.paint("=", |s| s.green()),
            marker,
            fix.description,
            self.paint(&fix_preview(fix), |s| s.green())
        );
        for import in &fix.imports {
            output.push_str(&format!(
                "   {} adds: import {};\n",
                self.paint("=", |s| s.green()),
                import
            ));
        }
        output
    }

    fn plural(count: usize, singular: &str, plural: &str) -> String {
        format!("{} {}", count, if count == 1 { singular } else { plural })
    }
}

/// Text the call site turns into: the edits' texts in the order they were added
fn fix_preview(fix: &FixPlan) -> String {
    fix.edits.iter().map(|e| e.text()).collect()
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        // Group diagnostics by file
        let mut by_file: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for diag in &result.diagnostics {
            by_file.entry(&diag.location.file).or_default().push(diag);
        }

        for (file, diagnostics) in &by_file {
            output.push_str(&format!(
                "{}\n",
                self.paint(&file.display().to_string(), |s| s.underline())
            ));
            for diag in diagnostics {
                output.push_str(&self.format_diagnostic(diag));
                output.push('\n');
            }
            output.push('\n');
        }

        for defect in &result.defects {
            output.push_str(&format!(
                "{}: {}: {}\n",
                defect.file.display(),
                self.paint("engine defect", |s| s.magenta().bold()),
                defect.error
            ));
        }

        if self.show_stats {
            output.push_str(&format!(
                "\n{} processed, {} evaluated",
                Self::plural(result.files_processed, "unit", "units"),
                Self::plural(result.call_sites, "call site", "call sites")
            ));

            let mut counts = Vec::new();
            if result.error_count > 0 {
                let s = Self::plural(result.error_count, "error", "errors");
                counts.push(self.paint(&s, |s| s.red()));
            }
            if result.warning_count > 0 {
                let s = Self::plural(result.warning_count, "warning", "warnings");
                counts.push(self.paint(&s, |s| s.yellow()));
            }
            if result.info_count > 0 {
                let s = Self::plural(result.info_count, "info", "infos");
                counts.push(self.paint(&s, |s| s.blue()));
            }
            if !result.defects.is_empty() {
                let s = Self::plural(result.defects.len(), "defect", "defects");
                counts.push(self.paint(&s, |s| s.magenta()));
            }

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            let fixable = result.diagnostics.iter().filter(|d| d.has_fix()).count();
            let review = result.diagnostics.iter().filter(|d| d.requires_review).count();
            if fixable > 0 || review > 0 {
                output.push_str(&format!(
                    "{} fixable, {} need review\n",
                    fixable, review
                ));
            }

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        if self.show_timings && !result.rule_timings.is_empty() {
            output.push('\n');
            output.push_str(&result.format_timings());
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}: {}[{}]: {}\n",
            self.format_location(diag),
            self.severity_str(diag.severity),
            self.paint(&diag.rule_id, |s| s.cyan()),
            diag.message
        ));

        if self.show_source {
            if let Some(source) = &diag.source_line {
                output.push_str(&format!("     {}\n", self.gutter("|")));
                let line_num = format!("{:>4}", diag.location.line);
                output.push_str(&format!(
                    "{} {} {}\n",
                    self.paint(&line_num, |s| s.blue()),
                    self.gutter("|"),
                    source
                ));

                // Underline the call
                if diag.location.column > 0 {
                    let padding = " ".repeat(diag.location.column - 1);
                    let underline = "^".repeat(diag.location.length.max(1));
                    output.push_str(&format!(
                        "     {} {}{}\n",
                        self.gutter("|"),
                        padding,
                        self.paint(&underline, |s| s.red())
                    ));
                }
            }
        }

        if self.show_help {
            if let Some(help) = &diag.help {
                output.push_str(&format!("   {} help: {}\n", self.gutter("="), help));
            }
        }

        if self.show_fixes {
            if let Some(fix) = &diag.fix {
                output.push_str(&self.format_fix(fix));
            }
        }

        if diag.requires_review {
            output.push_str(&format!(
                "   {} {}\n",
                self.gutter("="),
                self.paint("requires review: no automatic fix", |s| s.yellow())
            ));
        }

        for note in &diag.notes {
            output.push_str(&format!("   {} note: {}\n", self.gutter("="), note));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineDefect, EngineError};
    use crate::syntax::Span;
    use std::path::{Path, PathBuf};

    const SOURCE: &str = "long y = Math.round(a + b);\n";

    fn diag() -> Diagnostic {
        let span = Span::new(9, 26);
        let fix = FixPlan::builder()
            .description("Remove redundant Math.round")
            .prefix_with(span, "(")
            .replace(span, "a + b")
            .postfix_with(span, ")")
            .build();
        Diagnostic::new(
            "math-round-int-long",
            Severity::Error,
            "Math.round(Integer) results in truncation",
            span,
        )
        .with_fix(fix)
        .at(Path::new("A.java"), SOURCE)
    }

    #[test]
    fn test_format_diagnostic() {
        let formatter = TextFormatter::new().without_color();
        let output = formatter.format_diagnostic(&diag());

        assert!(output.contains("A.java:1:10"));
        assert!(output.contains("error[math-round-int-long]"));
        assert!(output.contains("Math.round(Integer) results in truncation"));
        assert!(output.contains("long y = Math.round(a + b);"));
        assert!(output.contains(&format!("{}{}", " ".repeat(9), "^".repeat(17))));
        assert!(output.contains("fix: Remove redundant Math.round -> (a + b)"));
    }

    #[test]
    fn test_format_review_and_imports() {
        let formatter = TextFormatter::new().without_color();
        let review = Diagnostic::new("r", Severity::Error, "long message", Span::new(0, 4))
            .with_help("summary")
            .requiring_review();
        let output = formatter.format_diagnostic(&review);
        assert!(output.contains("help: summary"));
        assert!(output.contains("requires review"));

        let span = Span::new(9, 26);
        let fix = FixPlan::builder()
            .description("Replace with Ints.saturatedCast")
            .add_import("com.google.common.primitives.Ints")
            .prefix_with(span, "Ints.saturatedCast(")
            .replace(span, "a + b")
            .postfix_with(span, ")")
            .safety(FixSafety::Unsafe)
            .build();
        let output = formatter.format_diagnostic(&Diagnostic::new("r", Severity::Error, "m", span).with_fix(fix));
        assert!(output.contains("unsafe fix: Replace with Ints.saturatedCast -> Ints.saturatedCast(a + b)"));
        assert!(output.contains("adds: import com.google.common.primitives.Ints;"));
    }

    #[test]
    fn test_format_result() {
        let formatter = TextFormatter::new().without_color();
        let result = LintResult {
            diagnostics: vec![diag()],
            defects: vec![EngineDefect {
                file: PathBuf::from("B.java"),
                error: EngineError::MissingSource {
                    rule_id: "r".to_string(),
                    span: Span::new(1, 2),
                },
            }],
            files_processed: 2,
            call_sites: 3,
            error_count: 1,
            ..Default::default()
        };

        let output = formatter.format(&result);
        assert!(output.contains("2 units processed, 3 call sites evaluated"));
        assert!(output.contains("1 error"));
        assert!(output.contains("1 defect"));
        assert!(output.contains("B.java: engine defect:"));
        assert!(output.contains("1 fixable, 0 need review"));
    }
}

//! Diagnostic types for rule results

use crate::engine::EngineError;
use crate::fix::FixPlan;
use crate::syntax::Span;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

/// Fix safety classification (like Ruff's safe/unsafe fixes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSafety {
    /// Safe fix - preserves program meaning, can be applied automatically
    #[default]
    Safe,
    /// Unsafe fix - may change runtime behavior
    Unsafe,
    /// Display only - shown to user but not auto-applied
    Display,
}

impl std::fmt::Display for FixSafety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixSafety::Safe => write!(f, "safe"),
            FixSafety::Unsafe => write!(f, "unsafe"),
            FixSafety::Display => write!(f, "display"),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Source code location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
    /// Length of the highlighted region
    pub length: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            length: 0,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Resolve a byte span against the source it points into
    pub fn from_span(file: &Path, source: &str, span: Span) -> Self {
        let start = span.start.min(source.len());
        let before = source.get(..start).unwrap_or("");
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self::new(file.to_path_buf(), line, column).with_length(span.len())
    }
}

/// A rule finding at one call site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule ID that triggered this diagnostic
    pub rule_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Span of the matched node
    pub span: Span,
    /// Source location (filled in by the engine)
    #[serde(default)]
    pub location: Location,
    /// The source line (for display)
    #[serde(default)]
    pub source_line: Option<String>,
    /// Help text (usually the rule summary)
    #[serde(default)]
    pub help: Option<String>,
    /// Suggested fix
    #[serde(default)]
    pub fix: Option<FixPlan>,
    /// A person has to look at this before anything changes
    #[serde(default)]
    pub requires_review: bool,
    /// Additional notes
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(rule_id: &str, severity: Severity, message: &str, span: Span) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.to_string(),
            span,
            location: Location::default(),
            source_line: None,
            help: None,
            fix: None,
            requires_review: false,
            notes: Vec::new(),
        }
    }

    /// Fill in location and source line from the unit source
    pub fn at(mut self, file: &Path, source: &str) -> Self {
        self.location = Location::from_span(file, source, self.span);
        self.source_line = source
            .lines()
            .nth(self.location.line - 1)
            .map(str::to_string);
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Attach a fix plan
    pub fn with_fix(mut self, fix: FixPlan) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Flag for manual review
    pub fn requiring_review(mut self) -> Self {
        self.requires_review = true;
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: &str) -> Self {
        self.notes.push(note.to_string());
        self
    }

    /// Check if this diagnostic has a fix
    pub fn has_fix(&self) -> bool {
        self.fix.is_some()
    }

    /// Check if this diagnostic has a safe fix
    pub fn has_safe_fix(&self) -> bool {
        self.fix.as_ref().is_some_and(|f| f.is_safe())
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// An error with nothing to apply has to at least say what is wrong
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.is_error() && self.fix.is_none() && self.message.trim().is_empty() {
            return Err(EngineError::SilentDiagnostic {
                rule_id: self.rule_id.clone(),
                span: self.span,
            });
        }
        Ok(())
    }
}

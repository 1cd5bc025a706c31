//! Applies fix plans from diagnostics to unit sources
//!
//! Fixes are classified as safe or unsafe:
//! - Safe fixes preserve program meaning and can be applied automatically
//! - Unsafe fixes may change runtime behavior and require explicit opt-in
//!
//! Diagnostics that require review never contribute a fix. The fixer works on
//! source text only; writing files back is left to the caller.

use crate::diagnostic::{Diagnostic, FixSafety, Location};
use crate::environment::CompilationUnit;
use crate::fix::FixPlan;
use similar::TextDiff;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Unchanged lines shown around each hunk
const DIFF_CONTEXT_LINES: usize = 3;

/// A fix to be applied to a unit
#[derive(Debug, Clone)]
pub struct Fix {
    /// File path of the unit
    pub file: PathBuf,
    /// Location of the call site
    pub location: Location,
    /// The edits
    pub plan: FixPlan,
    /// Rule ID that generated this fix
    pub rule_id: String,
}

impl Fix {
    pub fn safety(&self) -> FixSafety {
        self.plan.safety
    }
}

/// Result of applying fixes
#[derive(Debug, Default)]
pub struct FixResult {
    /// Number of files modified
    pub files_modified: usize,
    /// Number of fixes applied
    pub fixes_applied: usize,
    /// Number of safe fixes applied
    pub safe_fixes_applied: usize,
    /// Number of unsafe fixes applied
    pub unsafe_fixes_applied: usize,
    /// Number of fixes that failed (conflicting or out of bounds)
    pub fixes_failed: usize,
    /// Number of fixes skipped (unsafe when not allowed)
    pub fixes_skipped: usize,
    /// Diagnostics that need a person instead of a fix
    pub needs_review: usize,
    /// Errors encountered
    pub errors: Vec<String>,
    /// Rewritten sources, by file
    pub outputs: BTreeMap<PathBuf, String>,
    /// Diff output (if diff mode enabled)
    pub diffs: BTreeMap<PathBuf, String>,
}

/// Fix mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixMode {
    /// Apply only safe fixes (default)
    #[default]
    SafeOnly,
    /// Apply all fixes including unsafe
    All,
    /// Diff mode - show changes without applying
    Diff,
    /// Show fixes without applying
    ShowOnly,
}

/// Collects fix plans and applies them to unit sources
#[derive(Debug, Default)]
pub struct Fixer {
    /// Fixes grouped by file
    fixes_by_file: BTreeMap<PathBuf, Vec<Fix>>,
    /// Review-only diagnostics seen while collecting
    needs_review: usize,
    mode: FixMode,
    include_unsafe: bool,
}

impl Fixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fix mode
    pub fn with_mode(mut self, mode: FixMode) -> Self {
        self.mode = mode;
        self
    }

    /// Include unsafe fixes
    pub fn with_unsafe_fixes(mut self, include: bool) -> Self {
        self.include_unsafe = include;
        if include && self.mode == FixMode::SafeOnly {
            self.mode = FixMode::All;
        }
        self
    }

    /// Set diff mode
    pub fn with_diff_mode(mut self) -> Self {
        self.mode = FixMode::Diff;
        self
    }

    /// Set show-only mode
    pub fn with_show_only(mut self) -> Self {
        self.mode = FixMode::ShowOnly;
        self
    }

    /// Collect fixes from diagnostics
    pub fn collect_from_diagnostics(&mut self, diagnostics: &[Diagnostic]) {
        for diag in diagnostics {
            if diag.requires_review {
                self.needs_review += 1;
                continue;
            }
            let Some(plan) = &diag.fix else {
                continue;
            };
            if plan.is_empty() {
                continue;
            }
            self.add_fix(Fix {
                file: diag.location.file.clone(),
                location: diag.location.clone(),
                plan: plan.clone(),
                rule_id: diag.rule_id.clone(),
            });
        }
    }

    /// Add a fix manually
    pub fn add_fix(&mut self, fix: Fix) {
        self.fixes_by_file
            .entry(fix.file.clone())
            .or_default()
            .push(fix);
    }

    /// Check if a fix should be applied based on mode and safety
    fn should_apply_fix(&self, fix: &Fix) -> bool {
        match (self.mode, fix.safety()) {
            (_, FixSafety::Display) => false,
            (_, FixSafety::Safe) => true,
            (FixMode::All, FixSafety::Unsafe) => true,
            (FixMode::SafeOnly, FixSafety::Unsafe) => false,
            (FixMode::Diff | FixMode::ShowOnly, FixSafety::Unsafe) => self.include_unsafe,
        }
    }

    /// Apply the collected fixes to every unit that has some
    pub fn apply_all(&self, units: &[CompilationUnit]) -> FixResult {
        let mut result = FixResult {
            needs_review: self.needs_review,
            ..FixResult::default()
        };

        for (file, fixes) in &self.fixes_by_file {
            let Some(unit) = units.iter().find(|u| &u.path == file) else {
                result.fixes_failed += fixes.len();
                result
                    .errors
                    .push(format!("{}: no compilation unit for fixes", file.display()));
                continue;
            };
            self.apply_to_source(file, &unit.source, fixes, &mut result);
        }

        result
    }

    /// Apply fixes for one file to its source, recording the outcome in `result`
    pub fn apply_to_source(&self, file: &Path, source: &str, fixes: &[Fix], result: &mut FixResult) {
        let (applicable, skipped): (Vec<&Fix>, Vec<&Fix>) =
            fixes.iter().partition(|f| self.should_apply_fix(f));
        result.fixes_skipped += skipped.len();

        let mut applicable = applicable;
        applicable.sort_by_key(|f| f.plan.edits.iter().map(|e| e.span().start).min());

        if self.mode == FixMode::ShowOnly {
            for fix in &applicable {
                count_applied(fix, result);
            }
            return;
        }

        // Greedy: a fix joins only if the plan stays valid with it
        let mut accepted: Vec<&Fix> = Vec::new();
        for fix in applicable {
            let candidate = FixPlan::merge(accepted.iter().map(|f| &f.plan).chain([&fix.plan]));
            match candidate.validate(source) {
                Ok(()) => accepted.push(fix),
                Err(e) => {
                    log::warn!("{}: dropping {} fix at line {}: {}", file.display(), fix.rule_id, fix.location.line, e);
                    result.fixes_failed += 1;
                    result.errors.push(format!(
                        "{}:{}: {}: {}",
                        file.display(),
                        fix.location.line,
                        fix.rule_id,
                        e
                    ));
                }
            }
        }
        if accepted.is_empty() {
            return;
        }

        let plan = FixPlan::merge(accepted.iter().map(|f| &f.plan));
        let fixed = match plan.apply(source) {
            Ok(fixed) => fixed,
            Err(e) => {
                result.fixes_failed += accepted.len();
                result.errors.push(format!("{}: {}", file.display(), e));
                return;
            }
        };
        if fixed == source {
            return;
        }

        for fix in &accepted {
            count_applied(fix, result);
        }
        result.files_modified += 1;
        if self.mode == FixMode::Diff {
            result
                .diffs
                .insert(file.to_path_buf(), generate_unified_diff(file, source, &fixed));
        }
        result.outputs.insert(file.to_path_buf(), fixed);
    }

    /// Get all fixes that would be applied (for --fix --show)
    pub fn get_pending_fixes(&self) -> Vec<&Fix> {
        let mut all_fixes: Vec<&Fix> = self
            .fixes_by_file
            .values()
            .flatten()
            .filter(|fix| self.should_apply_fix(fix))
            .collect();
        all_fixes.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.location.line.cmp(&b.location.line))
                .then(a.location.column.cmp(&b.location.column))
        });
        all_fixes
    }

    /// Format fixes for display
    pub fn format_fixes(&self) -> String {
        let fixes = self.get_pending_fixes();
        if fixes.is_empty() {
            return "No fixes available.\n".to_string();
        }

        let mut output = format!("Found {} fix(es):\n\n", fixes.len());
        let mut current_file: Option<&PathBuf> = None;
        for fix in fixes {
            if current_file != Some(&fix.file) {
                current_file = Some(&fix.file);
                output.push_str(&format!("{}:\n", fix.file.display()));
            }

            let description = if fix.plan.description.is_empty() {
                "No description"
            } else {
                fix.plan.description.as_str()
            };
            output.push_str(&format!(
                "  Line {}: [{}] {} - {}\n",
                fix.location.line,
                fix.safety(),
                fix.rule_id,
                description
            ));
        }

        output
    }

    /// Get count of fixes pending
    pub fn pending_count(&self) -> usize {
        self.fixes_by_file.values().map(|v| v.len()).sum()
    }

    /// Get fixes grouped by file
    pub fn fixes_by_file(&self) -> &BTreeMap<PathBuf, Vec<Fix>> {
        &self.fixes_by_file
    }

    /// Get the current fix mode
    pub fn mode(&self) -> FixMode {
        self.mode
    }

    /// Format diff output for display
    pub fn format_diffs(&self, result: &FixResult) -> String {
        let mut output = String::new();

        for (file, diff) in &result.diffs {
            output.push_str(&format!(
                "diff --sitefix a/{} b/{}\n",
                file.display(),
                file.display()
            ));
            output.push_str(diff);
            output.push('\n');
        }

        output
    }
}

fn count_applied(fix: &Fix, result: &mut FixResult) {
    if fix.safety() == FixSafety::Safe {
        result.safe_fixes_applied += 1;
    } else {
        result.unsafe_fixes_applied += 1;
    }
    result.fixes_applied += 1;
}

/// Generate a unified diff between two strings
fn generate_unified_diff(file: &Path, original: &str, modified: &str) -> String {
    let old_name = format!("a/{}", file.display());
    let new_name = format!("b/{}", file.display());

    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(DIFF_CONTEXT_LINES)
        .header(&old_name, &new_name)
        .to_string()
}

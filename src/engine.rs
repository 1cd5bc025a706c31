//! Core rule engine

use crate::config::Config;
use crate::diagnostic::{Diagnostic, Severity};
use crate::environment::{CompilationUnit, Environment};
use crate::fix::EditError;
use crate::rule::Rule;
use crate::rules;
use crate::syntax::{descendants, NodeKind, Span, SyntaxNode};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// A defect in the engine or in a rule, as opposed to a finding about user code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Rule '{rule_id}' violated an internal invariant at {span}: {message}")]
    Invariant {
        rule_id: String,
        span: Span,
        message: String,
    },

    #[error("Rule '{rule_id}' produced an unusable fix: {source}")]
    Edit {
        rule_id: String,
        #[source]
        source: EditError,
    },

    #[error("Rule '{rule_id}' reported an error at {span} with neither a fix nor a message")]
    SilentDiagnostic { rule_id: String, span: Span },

    #[error("Rule '{rule_id}' needs source text for {span}, which is not in the unit")]
    MissingSource { rule_id: String, span: Span },
}

/// An engine defect tied to the unit it happened in
#[derive(Debug, Clone)]
pub struct EngineDefect {
    pub file: PathBuf,
    pub error: EngineError,
}

/// Per-rule timing statistics
#[derive(Debug, Clone, Default)]
pub struct RuleTiming {
    /// Rule ID
    pub rule_id: String,
    /// Total time spent on this rule
    pub total_time: Duration,
    /// Number of times the rule was evaluated
    pub evaluation_count: usize,
    /// Number of matches found
    pub match_count: usize,
}

impl RuleTiming {
    /// Create a new timing entry
    pub fn new(rule_id: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            ..Default::default()
        }
    }

    /// Average time per evaluation
    pub fn avg_time(&self) -> Duration {
        if self.evaluation_count > 0 {
            self.total_time / self.evaluation_count as u32
        } else {
            Duration::ZERO
        }
    }
}

/// Diagnostics for one compilation unit
#[derive(Debug, Default)]
pub struct UnitReport {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    /// Call sites whose evaluation failed; the others still report
    pub defects: Vec<EngineError>,
    /// Number of call sites evaluated
    pub call_sites: usize,
    pub rule_timings: HashMap<String, RuleTiming>,
}

/// Result of checking a batch of compilation units
#[derive(Debug, Default)]
pub struct LintResult {
    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,

    /// Call site evaluations that aborted on an engine defect
    pub defects: Vec<EngineDefect>,

    /// Units processed
    pub files_processed: usize,

    /// Units with errors
    pub files_with_errors: usize,

    /// Units with warnings
    pub files_with_warnings: usize,

    /// Call sites evaluated
    pub call_sites: usize,

    /// Total errors
    pub error_count: usize,

    /// Total warnings
    pub warning_count: usize,

    /// Total info messages
    pub info_count: usize,

    /// Processing duration
    pub duration: Duration,

    /// Per-rule timing statistics (rule_id -> timing)
    pub rule_timings: HashMap<String, RuleTiming>,
}

impl LintResult {
    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    pub fn has_defects(&self) -> bool {
        !self.defects.is_empty()
    }

    /// Check if result is clean (no errors, warnings or defects)
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0 && self.defects.is_empty()
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors, 3 = engine defects)
    pub fn exit_code(&self) -> i32 {
        if !self.defects.is_empty() {
            3
        } else if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Fold one unit's report into the totals
    pub fn add_report(&mut self, report: UnitReport) {
        let errors = report.diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = report.diagnostics.iter().filter(|d| d.is_warning()).count();
        let infos = report.diagnostics.len() - errors - warnings;

        self.files_processed += 1;
        if errors > 0 {
            self.files_with_errors += 1;
        }
        if warnings > 0 {
            self.files_with_warnings += 1;
        }
        self.error_count += errors;
        self.warning_count += warnings;
        self.info_count += infos;
        self.call_sites += report.call_sites;
        self.diagnostics.extend(report.diagnostics);
        let file = report.file;
        self.defects
            .extend(report.defects.into_iter().map(|error| EngineDefect {
                file: file.clone(),
                error,
            }));
        merge_timings(&mut self.rule_timings, report.rule_timings);
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.diagnostics.extend(other.diagnostics);
        self.defects.extend(other.defects);
        self.files_processed += other.files_processed;
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;
        self.call_sites += other.call_sites;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.info_count += other.info_count;
        merge_timings(&mut self.rule_timings, other.rule_timings);
    }

    /// Get rule timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time));
        timings
    }

    /// Format timing statistics as a string
    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let mut output = String::new();
        output.push_str("Rule Timing Statistics:\n");
        output.push_str(&format!(
            "{:<40} {:>12} {:>12} {:>10} {:>12}\n",
            "Rule ID", "Total", "Avg", "Evals", "Matches"
        ));
        output.push_str(&"-".repeat(90));
        output.push('\n');

        for timing in timings {
            let total_ms = timing.total_time.as_secs_f64() * 1000.0;
            let avg_us = timing.avg_time().as_secs_f64() * 1_000_000.0;

            output.push_str(&format!(
                "{:<40} {:>10.2}ms {:>10.2}µs {:>10} {:>12}\n",
                timing.rule_id, total_ms, avg_us, timing.evaluation_count, timing.match_count
            ));
        }

        output
    }
}

fn merge_timings(into: &mut HashMap<String, RuleTiming>, from: HashMap<String, RuleTiming>) {
    for (rule_id, timing) in from {
        let entry = into
            .entry(rule_id)
            .or_insert_with(|| RuleTiming::new(&timing.rule_id));
        entry.total_time += timing.total_time;
        entry.evaluation_count += timing.evaluation_count;
        entry.match_count += timing.match_count;
    }
}

/// The rule engine.
///
/// Holds configuration and rules only; no state is carried from one call
/// site or compilation unit to the next.
pub struct Engine {
    /// Configuration
    config: Config,

    /// Registered rules
    rules: Vec<Arc<dyn Rule>>,
}

impl Engine {
    /// Create an engine with the built-in rules enabled by `config`
    pub fn new(config: Config) -> Self {
        let rules = rules::builtin_rules(&config);
        Self::with_rules(config, rules)
    }

    /// Create an engine with an explicit rule set
    pub fn with_rules(config: Config, rules: Vec<Arc<dyn Rule>>) -> Self {
        let rules: Vec<_> = rules
            .into_iter()
            .filter(|rule| {
                let enabled = config.is_rule_enabled(rule.id());
                if !enabled {
                    log::debug!("Rule '{}' disabled by configuration", rule.id());
                }
                enabled
            })
            .collect();
        Self { config, rules }
    }

    /// Register an additional rule
    pub fn register_rule(&mut self, rule: Arc<dyn Rule>) {
        if self.config.is_rule_enabled(rule.id()) {
            self.rules.push(rule);
        }
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluate every rule against one call site
    pub fn check_call_site(
        &self,
        node: &dyn SyntaxNode,
        env: &dyn Environment,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            if let Some(diag) = self.evaluate(&**rule, node, env)? {
                diagnostics.push(diag);
            }
        }
        Ok(diagnostics)
    }

    fn evaluate(
        &self,
        rule: &dyn Rule,
        node: &dyn SyntaxNode,
        env: &dyn Environment,
    ) -> Result<Option<Diagnostic>, EngineError> {
        let outcome = rule.check(node, env).inspect_err(|e| log::error!("{}", e))?;
        let Some(mut diag) = outcome else {
            return Ok(None);
        };

        if let Some(severity) = self.config.get_severity_override(rule.id()) {
            diag.severity = severity;
        }
        diag.validate()?;
        if let Some(fix) = &diag.fix {
            fix.validate(env.source())
                .map_err(|source| EngineError::Edit {
                    rule_id: rule.id().to_string(),
                    source,
                })
                .inspect_err(|e| log::error!("{}", e))?;
        }

        log::debug!(
            "{} matched at {} ({}, fix: {})",
            rule.id(),
            node.span(),
            diag.severity,
            diag.has_fix()
        );
        Ok(Some(diag))
    }

    /// Evaluate every call site in a compilation unit.
    ///
    /// A failed evaluation is recorded in [`UnitReport::defects`] and the
    /// remaining rules and call sites still run.
    pub fn check_unit(&self, unit: &CompilationUnit) -> UnitReport {
        let mut report = UnitReport {
            file: unit.path.clone(),
            ..Default::default()
        };

        let rules: Vec<&dyn Rule> = self
            .rules
            .iter()
            .map(|rule| &**rule)
            .filter(|rule| !self.config.should_ignore_rule_for_file(rule.id(), &unit.path))
            .collect();

        for tree in &unit.trees {
            for node in descendants(tree) {
                if node.kind() != NodeKind::MethodCall {
                    continue;
                }
                report.call_sites += 1;

                for &rule in &rules {
                    let start = Instant::now();
                    let outcome = self.evaluate(rule, node, unit);
                    let timing = report
                        .rule_timings
                        .entry(rule.id().to_string())
                        .or_insert_with(|| RuleTiming::new(rule.id()));
                    timing.total_time += start.elapsed();
                    timing.evaluation_count += 1;

                    match outcome {
                        Ok(Some(diag)) => {
                            timing.match_count += 1;
                            report
                                .diagnostics
                                .push(diag.at(&unit.path, &unit.source));
                        }
                        Ok(None) => {}
                        Err(e) => report.defects.push(e),
                    }
                }
            }
        }

        report
            .diagnostics
            .sort_by_key(|d| (d.span.start, d.span.end, d.rule_id.clone()));
        report
    }

    /// Check a batch of compilation units, in parallel when configured.
    ///
    /// A defect aborts only the call site it happened at; it is recorded in
    /// [`LintResult::defects`] with its unit.
    pub fn check_units(&self, units: &[CompilationUnit]) -> LintResult {
        let start = Instant::now();

        let check = |unit: &CompilationUnit| {
            let mut result = LintResult::default();
            result.add_report(self.check_unit(unit));
            result
        };

        let results: Vec<LintResult> = if self.config.engine.parallel && units.len() > 1 {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| units.par_iter().map(check).collect()),
                Err(e) => {
                    log::warn!("Falling back to serial evaluation: {}", e);
                    units.iter().map(check).collect()
                }
            }
        } else {
            units.iter().map(check).collect()
        };

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }

        combined.duration = start.elapsed();
        combined
    }

    /// Severity a rule reports with after configuration overrides
    pub fn effective_severity(&self, rule: &dyn Rule) -> Severity {
        self.config
            .get_severity_override(rule.id())
            .unwrap_or(rule.info().severity)
    }
}

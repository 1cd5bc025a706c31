//! Sitefix CLI
//!
//! Lints pre-parsed compilation units (JSON) and optionally rewrites the
//! sources they point at.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use serde::Deserialize;
use sitefix::config::{ColorMode, Config, OutputFormat};
use sitefix::engine::Engine;
use sitefix::environment::CompilationUnit;
use sitefix::fixer::{FixMode, Fixer};
use sitefix::output::formatter_for;
use sitefix::rules;
use sitefix::rule::{FixAvailability, RuleInfo};
use sitefix::Severity;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Exit code when the run itself fails (bad config, unreadable input)
const EXIT_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "sitefix",
    version,
    about = "Call-site linter and rewriter",
    long_about = "Lints parsed, type-checked compilation units and applies rule fixes to their sources."
)]
struct Cli {
    /// Compilation unit files (JSON) or glob patterns
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Show detailed information about a specific rule
    #[arg(long)]
    explain: Option<String>,

    /// Auto-fix issues where possible (dry-run by default, use with --write to apply)
    #[arg(long)]
    fix: bool,

    /// Write fixes to the source files (requires --fix)
    #[arg(long, requires = "fix")]
    write: bool,

    /// Show diff of changes instead of applying fixes
    #[arg(long)]
    diff: bool,

    /// Show all fixes that would be applied
    #[arg(long)]
    show_fixes: bool,

    /// Include unsafe fixes (may change code behavior)
    #[arg(long)]
    unsafe_fixes: bool,

    /// Exit with 0 even if errors are found
    #[arg(long)]
    exit_zero: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// A unit file holds one compilation unit or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum UnitFile {
    Many(Vec<CompilationUnit>),
    One(CompilationUnit),
}

fn severity_str(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
    }
}

/// Print a rule in a consistent format
fn print_rule(info: &RuleInfo, severity: Severity) {
    println!(
        "    {} [{}] ({})",
        info.id.cyan(),
        severity_str(severity),
        info.category
    );
    println!("      {}", info.summary);
    if !info.tags.is_empty() {
        println!("      Tags: {}", info.tags.join(", "));
    }
}

/// Print detailed rule explanation
fn explain_rule(info: &RuleInfo) {
    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "ID".bold(), info.id.cyan());
    if let Some(name) = &info.name {
        println!("  {}: {}", "Name".bold(), name);
    }
    println!("  {}: {}", "Severity".bold(), severity_str(info.severity));
    println!("  {}: {}", "Category".bold(), info.category);
    println!("  {}: {}", "Fix".bold(), info.fix);

    println!();
    println!("  {}", "Summary".bold());
    println!("  {}", info.summary);

    if let Some(explanation) = &info.explanation {
        println!();
        println!("  {}", "Explanation".bold());
        println!("  {}", explanation);
    }

    if let Some(bad) = &info.example_bad {
        println!();
        println!("  {} {}", "Example".bold(), "(incorrect)".red());
        for line in bad.lines() {
            println!("    {}", line);
        }
    }

    if let Some(good) = &info.example_good {
        println!();
        println!("  {} {}", "Example".bold(), "(correct)".green());
        for line in good.lines() {
            println!("    {}", line);
        }
    }

    if info.fix == FixAvailability::RequiresHumanAttention {
        println!();
        println!(
            "  {}",
            "Some findings carry no fix and need a person to decide.".yellow()
        );
    }

    if let Some(docs) = &info.docs {
        println!();
        println!("  {}: {}", "Documentation".bold(), docs.blue());
    }
}

/// Expand glob patterns into unit file paths
fn expand_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let entries = glob(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
        let before = paths.len();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable path: {}", e),
            }
        }
        if paths.len() == before {
            log::warn!("No files matched '{}'", pattern);
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Read the units in one JSON file, loading missing sources from disk
fn load_unit_file(path: &Path) -> anyhow::Result<Vec<CompilationUnit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let units = match serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse compilation unit {}", path.display()))?
    {
        UnitFile::One(unit) => vec![unit],
        UnitFile::Many(units) => units,
    };

    let base_dir = path.parent().unwrap_or(Path::new("."));
    units
        .into_iter()
        .map(|mut unit| -> anyhow::Result<CompilationUnit> {
            if unit.path.as_os_str().is_empty() {
                unit.path = path.to_path_buf();
            } else if unit.path.is_relative() && !unit.path.exists() {
                unit.path = base_dir.join(&unit.path);
            }
            if unit.source.is_empty() {
                unit.source = std::fs::read_to_string(&unit.path).with_context(|| {
                    format!("Failed to read source {}", unit.path.display())
                })?;
            }
            Ok(unit)
        })
        .collect()
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    let format = cli.format.map(|f| match f {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
    });
    config.merge_cli(
        format,
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
    );
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = load_config(cli)?;

    let colored = match config.output.color {
        _ if cli.no_color => false,
        ColorMode::Never => false,
        ColorMode::Always => true,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    };
    colored::control::set_override(colored);

    let engine = Engine::new(config);

    if let Some(rule_id) = &cli.explain {
        let Some(rule) = rules::find_rule(engine.config(), rule_id) else {
            bail!("Rule '{}' not found (use --list-rules to see all rules)", rule_id);
        };
        explain_rule(rule.info());
        return Ok(0);
    }

    if cli.list_rules {
        if engine.config().output.format == OutputFormat::Json {
            let infos: Vec<&RuleInfo> = engine.rules().iter().map(|r| r.info()).collect();
            println!("{}", serde_json::to_string_pretty(&infos)?);
        } else {
            println!("{}", "Available rules:".bold());
            for rule in engine.rules() {
                print_rule(rule.info(), engine.effective_severity(&**rule));
            }
        }
        return Ok(0);
    }

    if cli.files.is_empty() {
        bail!("No input files given");
    }
    let mut units = Vec::new();
    for path in expand_patterns(&cli.files)? {
        units.extend(load_unit_file(&path)?);
    }
    if units.is_empty() {
        bail!("No compilation units found");
    }
    log::debug!("Loaded {} compilation unit(s)", units.len());

    let result = engine.check_units(&units);
    let formatter = formatter_for(&engine.config().output, colored);
    print!("{}", formatter.format(&result));

    if cli.fix || cli.diff || cli.show_fixes {
        let mode = if cli.show_fixes {
            FixMode::ShowOnly
        } else if cli.diff {
            FixMode::Diff
        } else {
            FixMode::SafeOnly
        };
        let mut fixer = Fixer::new()
            .with_mode(mode)
            .with_unsafe_fixes(cli.unsafe_fixes);
        fixer.collect_from_diagnostics(&result.diagnostics);

        let fixed = fixer.apply_all(&units);
        for error in &fixed.errors {
            eprintln!("{}: {}", "warning".yellow().bold(), error);
        }

        match mode {
            FixMode::ShowOnly => print!("{}", fixer.format_fixes()),
            FixMode::Diff => print!("{}", fixer.format_diffs(&fixed)),
            FixMode::SafeOnly | FixMode::All if cli.write => {
                for (path, source) in &fixed.outputs {
                    std::fs::write(path, source)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                eprintln!(
                    "Fixed {} issue(s) in {} file(s)",
                    fixed.fixes_applied, fixed.files_modified
                );
            }
            FixMode::SafeOnly | FixMode::All => eprintln!(
                "Would fix {} issue(s) in {} file(s) (use --write to apply)",
                fixed.fixes_applied, fixed.files_modified
            ),
        }
        if fixed.fixes_skipped > 0 {
            eprintln!(
                "{} unsafe fix(es) skipped (use --unsafe-fixes to include)",
                fixed.fixes_skipped
            );
        }
        if fixed.needs_review > 0 {
            eprintln!("{} finding(s) need manual review", fixed.needs_review);
        }
    }

    if cli.exit_zero && !result.has_defects() {
        return Ok(0);
    }
    Ok(result.exit_code())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

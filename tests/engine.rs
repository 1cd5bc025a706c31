//! End-to-end checks: JSON compilation units through the engine and fixer

use pretty_assertions::assert_eq;
use serde_json::json;
use sitefix::config::Config;
use sitefix::fixer::{FixMode, Fixer};
use sitefix::output::{JsonFormatter, OutputFormatter};
use sitefix::{CompilationUnit, Engine, FixSafety, Severity};
use std::io::Write;
use std::path::Path;

const INTS: &str = "com.google.common.primitives.Ints";

/// One `Math.round(<arg>)` call in `source`, described the way a driver would
fn round_call(source: &str, arg: &str, kind: &str, ty: &str) -> serde_json::Value {
    let start = source.find("Math.round(").unwrap();
    let arg_start = start + "Math.round(".len();
    let arg_end = arg_start + arg.len();
    json!({
        "kind": "method-call",
        "span": { "start": start, "end": arg_end + 1 },
        "type": "long",
        "target": { "owner": "java.lang.Math", "name": "round", "is_static": true },
        "children": [
            { "kind": kind, "span": { "start": arg_start, "end": arg_end }, "type": ty }
        ]
    })
}

fn unit(path: &str, source: &str, symbols: &[&str], trees: Vec<serde_json::Value>) -> CompilationUnit {
    serde_json::from_value(json!({
        "path": path,
        "source": source,
        "symbols": symbols,
        "trees": trees,
    }))
    .unwrap()
}

fn fix_all(engine: &Engine, units: &[CompilationUnit], mode: FixMode, unsafe_fixes: bool) -> sitefix::FixResult {
    let result = engine.check_units(units);
    assert!(!result.has_defects(), "{:?}", result.defects);
    let mut fixer = Fixer::new().with_mode(mode).with_unsafe_fixes(unsafe_fixes);
    fixer.collect_from_diagnostics(&result.diagnostics);
    fixer.apply_all(units)
}

#[test]
fn int_argument_is_unwrapped() {
    let source = "class A {\n  long f(int someInt) { return Math.round(someInt); }\n}\n";
    let units = [unit(
        "A.java",
        source,
        &[],
        vec![round_call(source, "someInt", "identifier", "int")],
    )];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.call_sites, 1);
    assert_eq!(result.exit_code(), 2);

    let diag = &result.diagnostics[0];
    assert_eq!(diag.rule_id, "math-round-int-long");
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.location.line, 2);
    assert_eq!(diag.message, "Math.round(Integer) results in truncation");

    let fixed = fix_all(&engine, &units, FixMode::SafeOnly, false);
    assert_eq!(
        fixed.outputs[Path::new("A.java")],
        "class A {\n  long f(int someInt) { return someInt; }\n}\n"
    );
}

#[test]
fn binary_int_argument_keeps_precedence() {
    let source = "long y = 2 * Math.round(a+b);";
    let units = [unit("A.java", source, &[], vec![round_call(source, "a+b", "binary", "int")])];
    let engine = Engine::new(Config::default());

    let fixed = fix_all(&engine, &units, FixMode::SafeOnly, false);
    assert_eq!(fixed.outputs[Path::new("A.java")], "long y = 2 * (a+b);");
}

#[test]
fn long_argument_uses_helper_when_available() {
    let source = "package p;\n\nimport java.util.List;\n\nclass A { int f(long someLong) { return Math.round(someLong); } }\n";
    let units = [unit(
        "A.java",
        source,
        &[INTS],
        vec![round_call(source, "someLong", "identifier", "long")],
    )];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    let fix = result.diagnostics[0].fix.as_ref().unwrap();
    assert_eq!(fix.safety, FixSafety::Unsafe);

    // Unsafe fixes wait for an explicit opt-in
    let skipped = fix_all(&engine, &units, FixMode::SafeOnly, false);
    assert_eq!(skipped.fixes_skipped, 1);
    assert!(skipped.outputs.is_empty());

    let fixed = fix_all(&engine, &units, FixMode::SafeOnly, true);
    assert_eq!(
        fixed.outputs[Path::new("A.java")],
        "package p;\n\nimport java.util.List;\nimport com.google.common.primitives.Ints;\n\nclass A { int f(long someLong) { return Ints.saturatedCast(someLong); } }\n"
    );
}

#[test]
fn long_argument_without_helper_needs_review() {
    let source = "int y = Math.round(someLong);";
    let units = [unit(
        "A.java",
        source,
        &[],
        vec![round_call(source, "someLong", "identifier", "java.lang.Long")],
    )];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    let diag = &result.diagnostics[0];
    assert!(diag.fix.is_none());
    assert!(diag.requires_review);
    assert!(diag.message.contains("truncation"));

    let fixed = fix_all(&engine, &units, FixMode::All, true);
    assert_eq!(fixed.needs_review, 1);
    assert!(fixed.outputs.is_empty());
}

#[test]
fn unrelated_calls_are_not_reported() {
    let source = "double d = Math.round(x); long z = Math.round(y);";
    let units = [unit(
        "A.java",
        source,
        &[],
        vec![
            round_call(source, "x", "identifier", "double"),
            json!({
                "kind": "method-call",
                "span": { "start": 35, "end": 48 },
                "target": { "owner": "com.example.Math", "name": "round", "is_static": true },
                "children": [{ "kind": "identifier", "span": { "start": 46, "end": 47 }, "type": "int" }]
            }),
        ],
    )];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    assert!(result.is_clean());
    assert_eq!(result.call_sites, 2);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn fixing_twice_changes_nothing() {
    let source = "long y = Math.round(a + b);";
    let units = [unit("A.java", source, &[], vec![round_call(source, "a + b", "binary", "int")])];
    let engine = Engine::new(Config::default());
    let fixed = fix_all(&engine, &units, FixMode::SafeOnly, false);
    let once = fixed.outputs[Path::new("A.java")].clone();
    assert_eq!(once, "long y = (a + b);");

    // Re-parsed, the call site is gone: only the parenthesized int remains
    let rerun = [unit(
        "A.java",
        &once,
        &[],
        vec![json!({
            "kind": "parenthesized",
            "span": { "start": 9, "end": 16 },
            "type": "int",
            "children": [{ "kind": "binary", "span": { "start": 10, "end": 15 }, "type": "int" }]
        })],
    )];
    let result = engine.check_units(&rerun);
    assert!(result.is_clean());
    assert_eq!(result.call_sites, 0);
}

#[test]
fn units_are_independent() {
    let a = "long y = Math.round(n);";
    let b = "int y = Math.round(n);";
    let units = [
        unit("A.java", a, &[], vec![round_call(a, "n", "identifier", "int")]),
        unit("B.java", b, &[INTS], vec![round_call(b, "n", "identifier", "long")]),
        unit("C.java", b, &[], vec![round_call(b, "n", "identifier", "long")]),
    ];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    assert_eq!(result.files_processed, 3);
    assert_eq!(result.error_count, 3);

    let review: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.requires_review)
        .map(|d| d.location.file.display().to_string())
        .collect();
    assert_eq!(review, vec!["C.java".to_string()]);
}

#[test]
fn bad_argument_span_is_a_defect() {
    let units = [unit(
        "A.java",
        "tiny",
        &[],
        vec![json!({
            "kind": "method-call",
            "span": { "start": 0, "end": 4 },
            "target": { "owner": "java.lang.Math", "name": "round", "is_static": true },
            "children": [{ "kind": "identifier", "span": { "start": 40, "end": 44 }, "type": "int" }]
        })],
    )];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.defects.len(), 1);
    assert_eq!(result.exit_code(), 3);
}

#[test]
fn defect_does_not_hide_other_call_sites() {
    let source = "tiny; int y = Math.round(n);";
    let units = [unit(
        "A.java",
        source,
        &[],
        vec![
            json!({
                "kind": "method-call",
                "span": { "start": 0, "end": 4 },
                "target": { "owner": "java.lang.Math", "name": "round", "is_static": true },
                "children": [{ "kind": "identifier", "span": { "start": 40, "end": 44 }, "type": "int" }]
            }),
            round_call(source, "n", "identifier", "long"),
        ],
    )];
    let engine = Engine::new(Config::default());

    let result = engine.check_units(&units);
    assert_eq!(result.defects.len(), 1);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].requires_review);
    assert!(result.diagnostics[0].fix.is_none());
    assert_eq!(result.exit_code(), 3);
}

#[test]
fn config_file_drives_rules_and_fixes() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "rules:\n  severity:\n    math-round-int-long: warning\n  per_file:\n    \"generated/**\": [all]\nfix:\n  saturating_helper: com.example.Narrow\n  saturating_method: clamp\n  parenthesize: [binary]\n"
    )
    .unwrap();
    let config = Config::load(file.path()).unwrap();
    let engine = Engine::new(config);

    let source = "int y = Math.round(c ? a : b); int z = Math.round(n);";
    let trees = vec![
        round_call(source, "c ? a : b", "conditional", "int"),
        json!({
            "kind": "method-call",
            "span": { "start": 39, "end": 52 },
            "target": { "owner": "java.lang.Math", "name": "round", "is_static": true },
            "children": [{ "kind": "identifier", "span": { "start": 50, "end": 51 }, "type": "long" }]
        }),
    ];
    let units = [
        unit("A.java", source, &["com.example.Narrow"], trees.clone()),
        unit("generated/B.java", source, &["com.example.Narrow"], trees),
    ];

    let result = engine.check_units(&units);
    assert_eq!(result.warning_count, 2);
    assert_eq!(result.error_count, 0);
    assert!(result.diagnostics.iter().all(|d| d.location.file == Path::new("A.java")));

    let fixed = fix_all(&engine, &units, FixMode::All, true);
    assert_eq!(
        fixed.outputs[Path::new("A.java")],
        "import com.example.Narrow;\n\nint y = c ? a : b; int z = Narrow.clamp(n);"
    );
}

#[test]
fn json_report_lists_fix_edits() {
    let source = "long y = Math.round(n);";
    let units = [unit("A.java", source, &[], vec![round_call(source, "n", "identifier", "int")])];
    let result = Engine::new(Config::default()).check_units(&units);

    let report: serde_json::Value =
        serde_json::from_str(&JsonFormatter::new().format(&result)).unwrap();
    let diag = &report["diagnostics"][0];
    assert_eq!(diag["rule_id"], "math-round-int-long");
    assert_eq!(diag["fix"]["edits"][0]["kind"], "replace");
    assert_eq!(diag["fix"]["edits"][0]["text"], "n");
    assert_eq!(report["summary"]["error_count"], 1);
}

//! Fix plans: ordered textual edits anchored to syntax spans
//!
//! A [`FixPlan`] is a value. Building one has no side effects, so a rule can
//! build a plan and drop it. [`FixPlan::apply`] is a pure function from
//! `(source, plan)` to the edited source.
//!
//! Edits are applied in ascending offset order. When several edits land on
//! the same offset their text is emitted in this order: text inserted after a
//! span ending there, then text inserted before a span starting there, then
//! the replacement of a span starting there. Two edits touching the same
//! bytes are rejected with [`EditError::Overlap`]; they are never merged.

use crate::diagnostic::FixSafety;
use crate::syntax::{NodeKind, Span};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use thiserror::Error;

/// Error applying a fix plan to source text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Overlapping edits at {first} and {second}")]
    Overlap { first: Span, second: Span },

    #[error("Edit span {span} is outside the source ({len} bytes)")]
    OutOfBounds { span: Span, len: usize },

    #[error("Edit span {span} does not fall on character boundaries")]
    NotCharBoundary { span: Span },
}

/// A single textual edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Edit {
    /// Insert text immediately before the span
    InsertBefore { span: Span, text: String },
    /// Replace the span's text
    Replace { span: Span, text: String },
    /// Insert text immediately after the span
    InsertAfter { span: Span, text: String },
}

impl Edit {
    pub fn span(&self) -> Span {
        match self {
            Edit::InsertBefore { span, .. }
            | Edit::Replace { span, .. }
            | Edit::InsertAfter { span, .. } => *span,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Edit::InsertBefore { text, .. }
            | Edit::Replace { text, .. }
            | Edit::InsertAfter { text, .. } => text,
        }
    }

    /// Bytes of the original source this edit consumes
    fn target(&self) -> Span {
        match self {
            Edit::InsertBefore { span, .. } => Span::new(span.start, span.start),
            Edit::Replace { span, .. } => *span,
            Edit::InsertAfter { span, .. } => Span::new(span.end, span.end),
        }
    }

    /// Tie-break for edits starting at the same offset
    fn rank(&self) -> u8 {
        match self {
            Edit::InsertAfter { .. } => 0,
            Edit::InsertBefore { .. } => 1,
            Edit::Replace { .. } => 2,
        }
    }
}

/// One candidate automatic repair
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixPlan {
    /// Short description shown next to the fix
    #[serde(default)]
    pub description: String,

    /// Edits in the order they were added
    pub edits: Vec<Edit>,

    /// Fully-qualified names to import
    #[serde(default)]
    pub imports: BTreeSet<String>,

    #[serde(default)]
    pub safety: FixSafety,
}

/// A primitive splice: consume `target`, emit `text`
struct Splice<'a> {
    target: Span,
    rank: u8,
    order: usize,
    text: Cow<'a, str>,
    origin: Span,
}

impl FixPlan {
    pub fn builder() -> FixPlanBuilder {
        FixPlanBuilder::default()
    }

    /// Single replacement of `span` with `text`
    pub fn replace(span: Span, text: &str) -> Self {
        Self::builder().replace(span, text).build()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.imports.is_empty()
    }

    pub fn is_safe(&self) -> bool {
        self.safety == FixSafety::Safe
    }

    /// Combine several plans for the same source into one.
    ///
    /// The result is only as safe as its least safe input.
    pub fn merge<'a>(plans: impl IntoIterator<Item = &'a FixPlan>) -> FixPlan {
        let mut merged = FixPlan::default();
        let mut descriptions = Vec::new();
        for plan in plans {
            merged.edits.extend(plan.edits.iter().cloned());
            merged.imports.extend(plan.imports.iter().cloned());
            if !plan.description.is_empty() {
                descriptions.push(plan.description.clone());
            }
            if !plan.is_safe() {
                merged.safety = plan.safety;
            }
        }
        merged.description = descriptions.join("; ");
        merged
    }

    /// Check the plan against `source` without producing any output
    pub fn validate(&self, source: &str) -> Result<(), EditError> {
        self.splices(source).map(|_| ())
    }

    /// Produce the edited source
    pub fn apply(&self, source: &str) -> Result<String, EditError> {
        let splices = self.splices(source)?;

        let inserted: usize = splices.iter().map(|s| s.text.len()).sum();
        let mut out = String::with_capacity(source.len() + inserted);
        let mut cursor = 0;
        for splice in &splices {
            out.push_str(&source[cursor..splice.target.start]);
            out.push_str(&splice.text);
            cursor = splice.target.end;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }

    fn splices<'a>(&'a self, source: &str) -> Result<Vec<Splice<'a>>, EditError> {
        let mut splices = Vec::with_capacity(self.edits.len() + 1);

        for (order, edit) in self.edits.iter().enumerate() {
            let span = edit.span();
            if span.start > span.end || span.end > source.len() {
                return Err(EditError::OutOfBounds {
                    span,
                    len: source.len(),
                });
            }
            if !source.is_char_boundary(span.start) || !source.is_char_boundary(span.end) {
                return Err(EditError::NotCharBoundary { span });
            }
            splices.push(Splice {
                target: edit.target(),
                rank: edit.rank(),
                order,
                text: Cow::Borrowed(edit.text()),
                origin: span,
            });
        }

        if let Some((offset, text)) = self.import_block(source) {
            // Import lines follow other insert-after text at the same offset
            splices.push(Splice {
                target: Span::new(offset, offset),
                rank: 0,
                order: usize::MAX,
                text: Cow::Owned(text),
                origin: Span::new(offset, offset),
            });
        }

        splices.sort_by(|a, b| {
            a.target
                .start
                .cmp(&b.target.start)
                .then(a.rank.cmp(&b.rank))
                .then(a.order.cmp(&b.order))
        });

        for pair in splices.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let collides = next.target.start < prev.target.end
                || (prev.target == next.target && !prev.target.is_empty());
            if collides {
                log::warn!(
                    "Rejecting fix plan: edits at {} and {} overlap",
                    prev.origin,
                    next.origin
                );
                return Err(EditError::Overlap {
                    first: prev.origin,
                    second: next.origin,
                });
            }
        }

        Ok(splices)
    }

    /// Offset and text of the import lines still missing from `source`
    fn import_block(&self, source: &str) -> Option<(usize, String)> {
        let missing: Vec<&String> = self
            .imports
            .iter()
            .filter(|name| !has_import(source, name))
            .collect();
        if missing.is_empty() {
            return None;
        }

        let mut offset = 0;
        let mut after_package = None;
        let mut after_import = None;
        for line in source.split_inclusive('\n') {
            let end = offset + line.len();
            let trimmed = line.trim_start();
            if trimmed.starts_with("import ") {
                after_import = Some(end);
            } else if trimmed.starts_with("package ") && after_package.is_none() {
                after_package = Some(end);
            }
            offset = end;
        }

        let mut text = String::new();
        let at = match (after_import, after_package) {
            (Some(end), _) => {
                if !source[..end].ends_with('\n') {
                    text.push('\n');
                }
                end
            }
            (None, Some(end)) => {
                if !source[..end].ends_with('\n') {
                    text.push('\n');
                }
                text.push('\n');
                end
            }
            (None, None) => 0,
        };
        for name in &missing {
            text.push_str(&format!("import {};\n", name));
        }
        if after_import.is_none() && after_package.is_none() {
            text.push('\n');
        }
        Some((at, text))
    }
}

fn has_import(source: &str, name: &str) -> bool {
    source.lines().any(|line| {
        line.trim()
            .strip_prefix("import ")
            .and_then(|rest| rest.trim().strip_suffix(';'))
            .is_some_and(|imported| imported.trim() == name)
    })
}

/// Accumulates edits for a [`FixPlan`]
#[derive(Debug, Clone, Default)]
pub struct FixPlanBuilder {
    plan: FixPlan,
}

impl FixPlanBuilder {
    pub fn prefix_with(mut self, span: Span, text: &str) -> Self {
        self.plan.edits.push(Edit::InsertBefore {
            span,
            text: text.to_string(),
        });
        self
    }

    pub fn replace(mut self, span: Span, text: &str) -> Self {
        self.plan.edits.push(Edit::Replace {
            span,
            text: text.to_string(),
        });
        self
    }

    pub fn postfix_with(mut self, span: Span, text: &str) -> Self {
        self.plan.edits.push(Edit::InsertAfter {
            span,
            text: text.to_string(),
        });
        self
    }

    pub fn add_import(mut self, fully_qualified_name: &str) -> Self {
        self.plan.imports.insert(fully_qualified_name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.plan.description = description.to_string();
        self
    }

    pub fn safety(mut self, safety: FixSafety) -> Self {
        self.plan.safety = safety;
        self
    }

    pub fn build(self) -> FixPlan {
        self.plan
    }
}

/// Which node kinds get wrapped in parentheses when their text is spliced
/// into the position of another expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParenPolicy {
    kinds: BTreeSet<NodeKind>,
}

impl Default for ParenPolicy {
    /// Wrap everything that is not a primary expression
    fn default() -> Self {
        Self {
            kinds: NodeKind::ALL
                .into_iter()
                .filter(|kind| !kind.is_primary())
                .collect(),
        }
    }
}

impl ParenPolicy {
    pub fn new(kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Only binary expressions are wrapped
    pub fn binary_only() -> Self {
        Self::new([NodeKind::Binary])
    }

    pub fn requires_parentheses(&self, kind: NodeKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Text to splice for a node of `kind`
    pub fn wrap(&self, kind: NodeKind, text: &str) -> String {
        if self.requires_parentheses(kind) {
            format!("({})", text)
        } else {
            text.to_string()
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.kinds.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replace_single_span() {
        let source = "long y = Math.round(x);";
        let plan = FixPlan::replace(Span::new(9, 22), "x");
        assert_eq!(plan.apply(source).unwrap(), "long y = x;");
    }

    #[test]
    fn test_prefix_replace_postfix_same_span() {
        let source = "long y = Math.round(a + b);";
        let call = Span::new(9, 26);
        let plan = FixPlan::builder()
            .prefix_with(call, "(")
            .replace(call, "a + b")
            .postfix_with(call, ")")
            .build();
        assert_eq!(plan.apply(source).unwrap(), "long y = (a + b);");
    }

    #[test]
    fn test_order_independent_of_insertion_order() {
        let source = "f(x)";
        let call = Span::new(0, 4);
        let a = FixPlan::builder()
            .postfix_with(call, "]")
            .replace(call, "x")
            .prefix_with(call, "[")
            .build();
        assert_eq!(a.apply(source).unwrap(), "[x]");
    }

    #[test]
    fn test_adjacent_spans_do_not_overlap() {
        let source = "ab";
        let plan = FixPlan::builder()
            .replace(Span::new(0, 1), "A")
            .replace(Span::new(1, 2), "B")
            .postfix_with(Span::new(0, 1), "-")
            .build();
        assert_eq!(plan.apply(source).unwrap(), "A-B");
    }

    #[test]
    fn test_overlapping_replacements_rejected() {
        let source = "0123456789";
        let plan = FixPlan::builder()
            .replace(Span::new(2, 6), "x")
            .replace(Span::new(4, 8), "y")
            .build();
        assert_eq!(
            plan.apply(source),
            Err(EditError::Overlap {
                first: Span::new(2, 6),
                second: Span::new(4, 8),
            })
        );
    }

    #[test]
    fn test_same_span_replaced_twice_rejected() {
        let plan = FixPlan::builder()
            .replace(Span::new(0, 3), "a")
            .replace(Span::new(0, 3), "b")
            .build();
        assert!(matches!(
            plan.validate("abcdef"),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn test_insert_inside_replaced_span_rejected() {
        let plan = FixPlan::builder()
            .replace(Span::new(0, 6), "x")
            .prefix_with(Span::new(3, 4), "(")
            .build();
        assert!(matches!(
            plan.apply("abcdef"),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let plan = FixPlan::replace(Span::new(3, 20), "x");
        assert_eq!(
            plan.apply("abc"),
            Err(EditError::OutOfBounds {
                span: Span::new(3, 20),
                len: 3,
            })
        );
    }

    #[test]
    fn test_char_boundary_rejected() {
        let plan = FixPlan::replace(Span::new(1, 2), "x");
        assert_eq!(
            plan.apply("äb"),
            Err(EditError::NotCharBoundary {
                span: Span::new(1, 2)
            })
        );
    }

    #[test]
    fn test_apply_does_not_touch_plan() {
        let plan = FixPlan::replace(Span::new(0, 1), "z");
        let before = plan.clone();
        let _ = plan.apply("abc");
        assert_eq!(plan, before);
    }

    #[test]
    fn test_import_after_last_import() {
        let source = "package a;\n\nimport java.util.List;\n\nclass A {}\n";
        let plan = FixPlan::builder()
            .add_import("com.google.common.primitives.Ints")
            .build();
        assert_eq!(
            plan.apply(source).unwrap(),
            "package a;\n\nimport java.util.List;\nimport com.google.common.primitives.Ints;\n\nclass A {}\n"
        );
    }

    #[test]
    fn test_import_after_package() {
        let source = "package a;\nclass A {}\n";
        let plan = FixPlan::builder().add_import("b.C").build();
        assert_eq!(
            plan.apply(source).unwrap(),
            "package a;\n\nimport b.C;\nclass A {}\n"
        );
    }

    #[test]
    fn test_import_at_top() {
        let plan = FixPlan::builder().add_import("b.C").build();
        assert_eq!(plan.apply("class A {}").unwrap(), "import b.C;\n\nclass A {}");
    }

    #[test]
    fn test_existing_import_not_duplicated() {
        let source = "import b.C;\nclass A {}\n";
        let plan = FixPlan::builder().add_import("b.C").add_import("b.C").build();
        assert_eq!(plan.imports.len(), 1);
        assert_eq!(plan.apply(source).unwrap(), source);
    }

    #[test]
    fn test_import_with_edit() {
        let source = "import x.Y;\nlong v = Math.round(l);\n";
        let call = Span::new(21, 34);
        let plan = FixPlan::builder()
            .add_import("com.google.common.primitives.Ints")
            .prefix_with(call, "Ints.saturatedCast(")
            .replace(call, "l")
            .postfix_with(call, ")")
            .build();
        assert_eq!(
            plan.apply(source).unwrap(),
            "import x.Y;\nimport com.google.common.primitives.Ints;\nlong v = Ints.saturatedCast(l);\n"
        );
    }

    #[test]
    fn test_merge_keeps_least_safe() {
        let safe = FixPlan::builder()
            .replace(Span::new(0, 1), "a")
            .description("first")
            .build();
        let risky = FixPlan::builder()
            .replace(Span::new(2, 3), "c")
            .description("second")
            .safety(FixSafety::Unsafe)
            .build();
        let merged = FixPlan::merge([&safe, &risky]);
        assert_eq!(merged.edits.len(), 2);
        assert_eq!(merged.safety, FixSafety::Unsafe);
        assert_eq!(merged.description, "first; second");
        assert_eq!(merged.apply("xyz").unwrap(), "ayc");
    }

    #[test]
    fn test_paren_policy_default() {
        let policy = ParenPolicy::default();
        assert!(policy.requires_parentheses(NodeKind::Binary));
        assert!(policy.requires_parentheses(NodeKind::Conditional));
        assert!(policy.requires_parentheses(NodeKind::Lambda));
        assert!(policy.requires_parentheses(NodeKind::Other));
        assert!(!policy.requires_parentheses(NodeKind::MethodCall));
        assert!(!policy.requires_parentheses(NodeKind::Identifier));
        assert!(!policy.requires_parentheses(NodeKind::Literal));
        assert!(!policy.requires_parentheses(NodeKind::FieldAccess));
        assert!(!policy.requires_parentheses(NodeKind::Parenthesized));
    }

    #[test]
    fn test_paren_policy_wrap() {
        let policy = ParenPolicy::default();
        assert_eq!(policy.wrap(NodeKind::Binary, "a + b"), "(a + b)");
        assert_eq!(policy.wrap(NodeKind::MethodCall, "foo(x)"), "foo(x)");

        let narrow = ParenPolicy::binary_only();
        assert_eq!(narrow.wrap(NodeKind::Conditional, "c ? a : b"), "c ? a : b");
    }
}

//! `Math.round` called with an `int`, `Integer`, `long` or `Long` argument
//!
//! `Math.round` only has `float` and `double` overloads, so an integral
//! argument is widened to floating point first. For `int` that round trip is
//! a no-op and the call can simply go away. For `long` the value may not be
//! representable as a `float`, and the `Math.round(float)` overload returns an
//! `int`, so large values get silently truncated.
//!
//! ```text
//! Math.round(count)        ->  count
//! Math.round(a + b)        ->  (a + b)
//! Math.round(total)        ->  Ints.saturatedCast(total)   // helper on classpath
//! ```

use crate::config::FixConfig;
use crate::diagnostic::{Diagnostic, FixSafety, Severity};
use crate::engine::EngineError;
use crate::environment::Environment;
use crate::fix::{FixPlan, ParenPolicy};
use crate::matcher::{all, any, argument_type_in, is_static_call_to, AllOf, Matcher};
use crate::rule::{FixAvailability, Rule, RuleCategory, RuleInfo};
use crate::syntax::{PrimitiveType, Span, SyntaxNode, TypeRef};

const RULE_ID: &str = "math-round-int-long";

/// Which argument shape the screen let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFamily {
    /// `int` or `java.lang.Integer`
    Int,
    /// `long` or `java.lang.Long`
    Long,
}

/// Decide the family from the two branch matchers.
///
/// The screen already passed, so exactly one branch has to hold. Anything
/// else means the screen and the branch matchers disagree.
pub fn classify(int_hit: bool, long_hit: bool, span: Span) -> Result<ArgumentFamily, EngineError> {
    match (int_hit, long_hit) {
        (true, false) => Ok(ArgumentFamily::Int),
        (false, true) => Ok(ArgumentFamily::Long),
        (int_hit, long_hit) => Err(EngineError::Invariant {
            rule_id: RULE_ID.to_string(),
            span,
            message: format!(
                "screened call classified as int={} long={}",
                int_hit, long_hit
            ),
        }),
    }
}

pub struct MathRoundIntLong {
    info: RuleInfo,
    screen: AllOf,
    int_argument: AllOf,
    long_argument: AllOf,
    helper: String,
    helper_method: String,
    parens: ParenPolicy,
}

impl Default for MathRoundIntLong {
    fn default() -> Self {
        Self::from_config(&FixConfig::default())
    }
}

impl MathRoundIntLong {
    pub fn from_config(fix: &FixConfig) -> Self {
        let int_family = [
            TypeRef::primitive(PrimitiveType::Int),
            TypeRef::class("java.lang.Integer"),
        ];
        let long_family = [
            TypeRef::primitive(PrimitiveType::Long),
            TypeRef::class("java.lang.Long"),
        ];
        let round_call = || -> Box<dyn Matcher> { Box::new(is_static_call_to("java.lang.Math", "round")) };

        Self {
            info: RuleInfo::new(RULE_ID, "Math.round(Integer) results in truncation")
                .with_name("MathRoundIntLong")
                .with_explanation(
                    "Math.round() called with an integer or long type results in truncation \
                     because Math.round only accepts floats or doubles and some integers and \
                     longs can't be represented with float.",
                )
                .with_severity(Severity::Error)
                .with_category(RuleCategory::Correctness)
                .with_fix(FixAvailability::RequiresHumanAttention)
                .with_tag("numeric")
                .with_example_bad("long total = Math.round(count);")
                .with_example_good("long total = count;"),
            screen: all(vec![
                round_call(),
                Box::new(any(vec![
                    Box::new(argument_type_in(0, &int_family)),
                    Box::new(argument_type_in(0, &long_family)),
                ])),
            ]),
            int_argument: all(vec![round_call(), Box::new(argument_type_in(0, &int_family))]),
            long_argument: all(vec![round_call(), Box::new(argument_type_in(0, &long_family))]),
            helper: fix.saturating_helper.clone(),
            helper_method: fix.saturating_method.clone(),
            parens: fix.parenthesize.clone(),
        }
    }

    fn helper_simple_name(&self) -> &str {
        self.helper.rsplit('.').next().unwrap_or(&self.helper)
    }

    /// Rounding an integral value is a no-op: splice the argument in place of the call
    fn remove_round(&self, call: &dyn SyntaxNode, argument: &dyn SyntaxNode, text: &str) -> Diagnostic {
        let span = call.span();
        let mut builder = FixPlan::builder().description("Remove redundant Math.round");
        builder = if self.parens.requires_parentheses(argument.kind()) {
            builder
                .prefix_with(span, "(")
                .replace(span, text)
                .postfix_with(span, ")")
        } else {
            builder.replace(span, text)
        };
        let plan = builder.build();

        Diagnostic::new(RULE_ID, self.info.severity, &self.info.summary, span).with_fix(plan)
    }

    fn narrow_long(&self, call: &dyn SyntaxNode, text: &str, env: &dyn Environment) -> Diagnostic {
        let span = call.span();

        if env.resolves(&self.helper) {
            let plan = FixPlan::builder()
                .description(&format!(
                    "Replace with {}.{}",
                    self.helper_simple_name(),
                    self.helper_method
                ))
                .add_import(&self.helper)
                .prefix_with(
                    span,
                    &format!("{}.{}(", self.helper_simple_name(), self.helper_method),
                )
                .replace(span, text)
                .postfix_with(span, ")")
                .safety(FixSafety::Unsafe)
                .build();
            return Diagnostic::new(RULE_ID, self.info.severity, &self.info.summary, span)
                .with_fix(plan);
        }

        log::debug!(
            "{} not resolvable, reporting {} without a fix",
            self.helper,
            span
        );
        let message = format!(
            "Calling Math.round() with a long argument can result in a loss of information: \
             the argument is coerced to a float before being rounded back to an int, so \
             values outside the float-representable range suffer truncation. Replace \
             Math.round() with {}.{}() once {} is available, or narrow manually with an \
             explicit check; a plain (int) cast silently wraps values outside the int range.",
            self.helper_simple_name(),
            self.helper_method,
            self.helper
        );
        Diagnostic::new(RULE_ID, self.info.severity, &message, span)
            .with_help(&self.info.summary)
            .requiring_review()
    }
}

impl Rule for MathRoundIntLong {
    fn info(&self) -> &RuleInfo {
        &self.info
    }

    fn check(
        &self,
        node: &dyn SyntaxNode,
        env: &dyn Environment,
    ) -> Result<Option<Diagnostic>, EngineError> {
        if !self.screen.matches(node, env) {
            return Ok(None);
        }

        let span = node.span();
        let family = classify(
            self.int_argument.matches(node, env),
            self.long_argument.matches(node, env),
            span,
        )?;

        let arguments = node.arguments();
        let Some(&argument) = arguments.first() else {
            return Err(EngineError::Invariant {
                rule_id: RULE_ID.to_string(),
                span,
                message: "screened call has no argument".to_string(),
            });
        };
        let text = env
            .source_for(argument.span())
            .ok_or_else(|| EngineError::MissingSource {
                rule_id: RULE_ID.to_string(),
                span: argument.span(),
            })?;

        let diagnostic = match family {
            ArgumentFamily::Int => self.remove_round(node, argument, text),
            ArgumentFamily::Long => self.narrow_long(node, text, env),
        };
        Ok(Some(diagnostic))
    }
}

//! Sitefix - call-site lint and rewrite engine
//!
//! Rules inspect one typed expression at a time and either ignore it or
//! return a diagnostic, optionally with a fix plan of textual edits.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Engine -> Rule (Matcher screen) -> Diagnostic + FixPlan -> Fixer
//! ```
//!
//! The engine receives already parsed and type-checked compilation units
//! (`CompilationUnit`), walks every method call in them, runs the enabled
//! rules and validates what they return. The fixer merges the plans of one
//! unit and applies them to its source text.
//!
//! # Writing a rule
//!
//! A rule screens candidate nodes with [`matcher`] combinators, then builds a
//! [`FixPlan`] against the unit source:
//!
//! ```
//! use sitefix::matcher::{all, argument_type_in, is_static_call_to, Matcher};
//! use sitefix::syntax::{PrimitiveType, TypeRef};
//!
//! let screen = all(vec![
//!     Box::new(is_static_call_to("java.lang.Math", "abs")),
//!     Box::new(argument_type_in(0, &[TypeRef::primitive(PrimitiveType::Int)])),
//! ]);
//! # let _: &dyn Matcher = &screen;
//! ```

pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod environment;
pub mod fix;
pub mod fixer;
pub mod matcher;
pub mod output;
pub mod rule;
pub mod rules;
pub mod syntax;

// Re-export main types
pub use config::Config;
pub use diagnostic::{Diagnostic, FixSafety, Location, Severity};
pub use engine::{Engine, EngineDefect, EngineError, LintResult, RuleTiming, UnitReport};
pub use environment::{CompilationUnit, Environment, SymbolResolver, SymbolTable};
pub use fix::{Edit, EditError, FixPlan, ParenPolicy};
pub use fixer::{Fix, FixMode, FixResult, Fixer};
pub use matcher::Matcher;
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use rule::{FixAvailability, Rule, RuleCategory, RuleInfo};
pub use syntax::{Expr, MethodRef, NodeKind, Span, SyntaxNode, TypeRef};

//! Matcher combinators over syntax nodes
//!
//! A [`Matcher`] is a pure predicate over a node and its environment. Leaf
//! matchers look at call targets and argument types; [`all`], [`any`] and
//! [`not`] compose them. `all` and `any` short-circuit left to right, which
//! only affects how much work is done, never the answer.
//!
//! ```
//! use sitefix::matcher::{all, any, argument_type_in, is_static_call_to, Matcher};
//! use sitefix::syntax::TypeRef;
//!
//! let int_family = [TypeRef::parse("int").unwrap(), TypeRef::class("java.lang.Integer")];
//! let long_family = [TypeRef::parse("long").unwrap(), TypeRef::class("java.lang.Long")];
//! let screen = all(vec![
//!     Box::new(is_static_call_to("java.lang.Math", "round")),
//!     Box::new(any(vec![
//!         Box::new(argument_type_in(0, &int_family)),
//!         Box::new(argument_type_in(0, &long_family)),
//!     ])),
//! ]);
//! # let _ = &screen as &dyn Matcher;
//! ```

use crate::environment::Environment;
use crate::syntax::{NodeKind, SyntaxNode, TypeRef};

/// Boolean predicate over a syntax node
pub trait Matcher: Send + Sync {
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&dyn SyntaxNode, &dyn Environment) -> bool + Send + Sync,
{
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool {
        self(node, env)
    }
}

/// Matches when every inner matcher matches (true for an empty list)
pub struct AllOf {
    matchers: Vec<Box<dyn Matcher>>,
}

impl Matcher for AllOf {
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool {
        self.matchers.iter().all(|m| m.matches(node, env))
    }
}

/// Matches when at least one inner matcher matches (false for an empty list)
pub struct AnyOf {
    matchers: Vec<Box<dyn Matcher>>,
}

impl Matcher for AnyOf {
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool {
        self.matchers.iter().any(|m| m.matches(node, env))
    }
}

/// Inverts the inner matcher
pub struct Not {
    inner: Box<dyn Matcher>,
}

impl Matcher for Not {
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool {
        !self.inner.matches(node, env)
    }
}

pub fn all(matchers: Vec<Box<dyn Matcher>>) -> AllOf {
    AllOf { matchers }
}

pub fn any(matchers: Vec<Box<dyn Matcher>>) -> AnyOf {
    AnyOf { matchers }
}

pub fn not(inner: Box<dyn Matcher>) -> Not {
    Not { inner }
}

/// Call to a method named `method_name` declared on `type_name`
#[derive(Debug, Clone)]
pub struct CallTo {
    type_name: String,
    method_name: String,
    static_only: bool,
}

impl Matcher for CallTo {
    fn matches(&self, node: &dyn SyntaxNode, _env: &dyn Environment) -> bool {
        if node.kind() != NodeKind::MethodCall {
            return false;
        }
        let Some(target) = node.method_target() else {
            return false;
        };
        target.name == self.method_name
            && target.owner.is_named(&self.type_name)
            && (!self.static_only || target.is_static)
    }
}

/// `type_name` may be fully qualified or a simple name
pub fn is_call_to(type_name: &str, method_name: &str) -> CallTo {
    CallTo {
        type_name: type_name.to_string(),
        method_name: method_name.to_string(),
        static_only: false,
    }
}

pub fn is_static_call_to(type_name: &str, method_name: &str) -> CallTo {
    CallTo {
        static_only: true,
        ..is_call_to(type_name, method_name)
    }
}

/// Applies a matcher to the call argument at `position`
pub struct Argument {
    position: usize,
    inner: Box<dyn Matcher>,
}

impl Matcher for Argument {
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool {
        node.arguments()
            .get(self.position)
            .is_some_and(|arg| self.inner.matches(*arg, env))
    }
}

pub fn argument(position: usize, inner: Box<dyn Matcher>) -> Argument {
    Argument { position, inner }
}

/// Node's resolved type is structurally equal to one of a set
#[derive(Debug, Clone)]
pub struct HasTypeIn {
    types: Vec<TypeRef>,
}

impl Matcher for HasTypeIn {
    fn matches(&self, node: &dyn SyntaxNode, env: &dyn Environment) -> bool {
        env.type_of(node).is_some_and(|ty| self.types.contains(ty))
    }
}

pub fn has_type_in(types: &[TypeRef]) -> HasTypeIn {
    HasTypeIn {
        types: types.to_vec(),
    }
}

/// Argument at `position` has a type in `types`; out-of-range is a non-match
pub fn argument_type_in(position: usize, types: &[TypeRef]) -> Argument {
    argument(position, Box::new(has_type_in(types)))
}

//! Compilation unit environment
//!
//! Read-only facade over one compilation unit: source text, attached types
//! and symbol lookup. Symbol lookup goes through [`SymbolResolver`] so tests
//! can stub it with a closure instead of a real classpath.

use crate::syntax::{Expr, Span, SyntaxNode, TypeRef};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Answers "does this fully-qualified name resolve here?"
pub trait SymbolResolver: Send + Sync {
    fn resolves(&self, fully_qualified_name: &str) -> bool;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn resolves(&self, fully_qualified_name: &str) -> bool {
        self(fully_qualified_name)
    }
}

/// Dotted Java-style name: `pkg.sub.Type`, every segment an identifier
pub fn is_well_formed_name(name: &str) -> bool {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Set of names visible on the unit's classpath
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    names: BTreeSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, name: &str) -> Self {
        self.insert(name);
        self
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolves(&self, fully_qualified_name: &str) -> bool {
        self.names.contains(fully_qualified_name)
    }
}

impl<'a> FromIterator<&'a str> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(String::from).collect(),
        }
    }
}

/// Everything a rule may ask about the unit it is evaluating
pub trait Environment: Sync {
    /// Full source text of the unit
    fn source(&self) -> &str;

    fn resolver(&self) -> &dyn SymbolResolver;

    /// Resolved type of an expression
    fn type_of<'n>(&self, node: &'n dyn SyntaxNode) -> Option<&'n TypeRef> {
        node.resolved_type()
    }

    /// Source text for a span; `None` when out of range or not on char boundaries
    fn source_for(&self, span: Span) -> Option<&str> {
        if span.start > span.end {
            return None;
        }
        self.source().get(span.start..span.end)
    }

    /// Probe for a symbol. Malformed names are reported as unresolved.
    fn resolves(&self, fully_qualified_name: &str) -> bool {
        is_well_formed_name(fully_qualified_name) && self.resolver().resolves(fully_qualified_name)
    }
}

/// One parsed and type-checked compilation unit, as handed over by the driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Source file path
    #[serde(default)]
    pub path: PathBuf,

    /// Source text; the driver reads `path` when this is absent
    #[serde(default)]
    pub source: String,

    /// Names resolvable from this unit
    #[serde(default)]
    pub symbols: SymbolTable,

    /// Top-level expression trees containing the call sites
    #[serde(default)]
    pub trees: Vec<Expr>,
}

impl CompilationUnit {
    pub fn new(path: impl Into<PathBuf>, source: &str) -> Self {
        Self {
            path: path.into(),
            source: source.to_string(),
            symbols: SymbolTable::new(),
            trees: Vec::new(),
        }
    }

    pub fn with_symbols(mut self, symbols: SymbolTable) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_tree(mut self, tree: Expr) -> Self {
        self.trees.push(tree);
        self
    }
}

impl Environment for CompilationUnit {
    fn source(&self) -> &str {
        &self.source
    }

    fn resolver(&self) -> &dyn SymbolResolver {
        &self.symbols
    }
}

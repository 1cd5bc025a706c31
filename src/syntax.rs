//! Syntax tree surface consumed by the engine
//!
//! The parser and typechecker live outside this crate. Rules only see a
//! read-only [`SyntaxNode`] view: a node kind, a byte span into the unit
//! source, the type the typechecker attached, and (for calls) the statically
//! resolved target plus arguments. [`Expr`] is the owned implementation used
//! by the JSON unit format and by tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Byte range into the compilation unit source (`start..end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check whether `other` lies entirely within this span
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check whether the two spans share at least one byte
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Syntactic category of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Literal,
    Identifier,
    FieldAccess,
    MethodCall,
    ArrayAccess,
    NewObject,
    MethodReference,
    Parenthesized,
    Unary,
    TypeCast,
    Binary,
    InstanceOf,
    Conditional,
    Assignment,
    CompoundAssignment,
    Lambda,
    /// Anything the parser reports that has no dedicated kind
    Other,
}

impl NodeKind {
    pub const ALL: [NodeKind; 17] = [
        NodeKind::Literal,
        NodeKind::Identifier,
        NodeKind::FieldAccess,
        NodeKind::MethodCall,
        NodeKind::ArrayAccess,
        NodeKind::NewObject,
        NodeKind::MethodReference,
        NodeKind::Parenthesized,
        NodeKind::Unary,
        NodeKind::TypeCast,
        NodeKind::Binary,
        NodeKind::InstanceOf,
        NodeKind::Conditional,
        NodeKind::Assignment,
        NodeKind::CompoundAssignment,
        NodeKind::Lambda,
        NodeKind::Other,
    ];

    /// Primary expressions bind tighter than any operator, so their text can
    /// be dropped into any expression position unchanged.
    pub fn is_primary(self) -> bool {
        matches!(
            self,
            NodeKind::Literal
                | NodeKind::Identifier
                | NodeKind::FieldAccess
                | NodeKind::MethodCall
                | NodeKind::ArrayAccess
                | NodeKind::NewObject
                | NodeKind::MethodReference
                | NodeKind::Parenthesized
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Literal => "literal",
            NodeKind::Identifier => "identifier",
            NodeKind::FieldAccess => "field-access",
            NodeKind::MethodCall => "method-call",
            NodeKind::ArrayAccess => "array-access",
            NodeKind::NewObject => "new-object",
            NodeKind::MethodReference => "method-reference",
            NodeKind::Parenthesized => "parenthesized",
            NodeKind::Unary => "unary",
            NodeKind::TypeCast => "type-cast",
            NodeKind::Binary => "binary",
            NodeKind::InstanceOf => "instance-of",
            NodeKind::Conditional => "conditional",
            NodeKind::Assignment => "assignment",
            NodeKind::CompoundAssignment => "compound-assignment",
            NodeKind::Lambda => "lambda",
            NodeKind::Other => "other",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("Unknown node kind: {}", s))
    }
}

/// Primitive value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "boolean" => PrimitiveType::Boolean,
            "byte" => PrimitiveType::Byte,
            "short" => PrimitiveType::Short,
            "char" => PrimitiveType::Char,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            _ => return None,
        })
    }
}

/// A resolved type identity as attached by the typechecker.
///
/// Equality is structural: `int` and `java.lang.Integer` are different types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Primitive(PrimitiveType),
    /// Fully-qualified class name
    Class(String),
}

impl TypeRef {
    pub fn primitive(p: PrimitiveType) -> Self {
        TypeRef::Primitive(p)
    }

    pub fn class(name: &str) -> Self {
        TypeRef::Class(name.to_string())
    }

    /// Parse the typechecker's spelling of a type
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        Some(match PrimitiveType::parse(s) {
            Some(p) => TypeRef::Primitive(p),
            None => TypeRef::Class(s.to_string()),
        })
    }

    /// Unqualified name (`java.lang.Math` -> `Math`)
    pub fn simple_name(&self) -> &str {
        match self {
            TypeRef::Primitive(p) => p.as_str(),
            TypeRef::Class(name) => name.rsplit('.').next().unwrap_or(name),
        }
    }

    /// Match against either the fully-qualified or the simple name
    pub fn is_named(&self, name: &str) -> bool {
        match self {
            TypeRef::Primitive(p) => p.as_str() == name,
            TypeRef::Class(fqn) => fqn == name || (!name.contains('.') && self.simple_name() == name),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => f.write_str(p.as_str()),
            TypeRef::Class(name) => f.write_str(name),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&value).ok_or_else(|| "empty type name".to_string())
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// Statically resolved target of a method invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    /// Declaring type
    pub owner: TypeRef,
    /// Method name
    pub name: String,
    #[serde(default)]
    pub is_static: bool,
}

impl MethodRef {
    pub fn new(owner: TypeRef, name: &str, is_static: bool) -> Self {
        Self {
            owner,
            name: name.to_string(),
            is_static,
        }
    }
}

/// Read-only view of a parsed, type-checked expression
pub trait SyntaxNode: Send + Sync {
    fn kind(&self) -> NodeKind;

    fn span(&self) -> Span;

    /// Type the typechecker attached to this expression
    fn resolved_type(&self) -> Option<&TypeRef>;

    /// Resolved target, for `MethodCall` nodes
    fn method_target(&self) -> Option<&MethodRef>;

    fn children(&self) -> Vec<&dyn SyntaxNode>;

    /// Ordered arguments of a call; empty for every other kind
    fn arguments(&self) -> Vec<&dyn SyntaxNode> {
        if self.kind() == NodeKind::MethodCall {
            self.children()
        } else {
            Vec::new()
        }
    }
}

/// Owned expression tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: NodeKind,
    pub span: Span,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<MethodRef>,
    /// Operands; for calls these are the arguments in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Expr>,
}

impl Expr {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
            target: None,
            children: Vec::new(),
        }
    }

    /// A call expression with its resolved target and arguments
    pub fn call(span: Span, target: MethodRef, arguments: Vec<Expr>) -> Self {
        Self {
            kind: NodeKind::MethodCall,
            span,
            ty: None,
            target: Some(target),
            children: arguments,
        }
    }

    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_child(mut self, child: Expr) -> Self {
        self.children.push(child);
        self
    }
}

impl SyntaxNode for Expr {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn span(&self) -> Span {
        self.span
    }

    fn resolved_type(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    fn method_target(&self) -> Option<&MethodRef> {
        self.target.as_ref()
    }

    fn children(&self) -> Vec<&dyn SyntaxNode> {
        self.children.iter().map(|c| c as &dyn SyntaxNode).collect()
    }
}

/// Depth-first pre-order walk over `root` and everything below it
pub fn descendants(root: &dyn SyntaxNode) -> Vec<&dyn SyntaxNode> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let children = node.children();
        stack.extend(children.into_iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_overlap() {
        let a = Span::new(0, 5);
        assert!(a.overlaps(Span::new(4, 8)));
        assert!(!a.overlaps(Span::new(5, 8)));
        assert!(a.contains(Span::new(1, 5)));
        assert!(Span::new(3, 3).is_empty());
    }

    #[test]
    fn test_type_ref_parse() {
        assert_eq!(TypeRef::parse("int"), Some(TypeRef::Primitive(PrimitiveType::Int)));
        assert_eq!(
            TypeRef::parse("java.lang.Integer"),
            Some(TypeRef::class("java.lang.Integer"))
        );
        assert_eq!(TypeRef::parse("  "), None);
        assert_ne!(TypeRef::parse("int"), TypeRef::parse("java.lang.Integer"));
    }

    #[test]
    fn test_type_ref_names() {
        let math = TypeRef::class("java.lang.Math");
        assert_eq!(math.simple_name(), "Math");
        assert!(math.is_named("Math"));
        assert!(math.is_named("java.lang.Math"));
        assert!(!math.is_named("com.example.Math"));
        assert!(!math.is_named("StrictMath"));
    }

    #[test]
    fn test_node_kind_from_str() {
        assert_eq!("binary".parse::<NodeKind>(), Ok(NodeKind::Binary));
        assert_eq!(
            "compound_assignment".parse::<NodeKind>(),
            Ok(NodeKind::CompoundAssignment)
        );
        assert_eq!("Type-Cast".parse::<NodeKind>(), Ok(NodeKind::TypeCast));
        assert!("statement".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_primary_kinds() {
        assert!(NodeKind::Identifier.is_primary());
        assert!(NodeKind::MethodCall.is_primary());
        assert!(NodeKind::Parenthesized.is_primary());
        assert!(!NodeKind::Binary.is_primary());
        assert!(!NodeKind::Conditional.is_primary());
    }

    #[test]
    fn test_arguments_only_for_calls() {
        let binary = Expr::new(NodeKind::Binary, Span::new(0, 5))
            .with_child(Expr::new(NodeKind::Identifier, Span::new(0, 1)))
            .with_child(Expr::new(NodeKind::Identifier, Span::new(4, 5)));
        assert_eq!(binary.children().len(), 2);
        assert!(binary.arguments().is_empty());

        let call = Expr::call(
            Span::new(0, 13),
            MethodRef::new(TypeRef::class("java.lang.Math"), "round", true),
            vec![Expr::new(NodeKind::Identifier, Span::new(11, 12))],
        );
        assert_eq!(call.arguments().len(), 1);
    }

    #[test]
    fn test_descendants_preorder() {
        let inner = Expr::call(
            Span::new(6, 10),
            MethodRef::new(TypeRef::class("Foo"), "g", false),
            vec![],
        );
        let outer = Expr::call(
            Span::new(0, 11),
            MethodRef::new(TypeRef::class("Foo"), "f", false),
            vec![inner, Expr::new(NodeKind::Literal, Span::new(10, 11))],
        );
        let kinds: Vec<NodeKind> = descendants(&outer).iter().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::MethodCall, NodeKind::MethodCall, NodeKind::Literal]
        );
    }

    #[test]
    fn test_expr_deserialize() {
        let json = r#"{
            "kind": "method-call",
            "span": {"start": 0, "end": 15},
            "type": "long",
            "target": {"owner": "java.lang.Math", "name": "round", "is_static": true},
            "children": [
                {"kind": "identifier", "span": {"start": 11, "end": 14}, "type": "int"}
            ]
        }"#;
        let expr: Expr = serde_json::from_str(json).unwrap();
        assert_eq!(expr.kind, NodeKind::MethodCall);
        assert_eq!(expr.ty, Some(TypeRef::Primitive(PrimitiveType::Long)));
        assert_eq!(expr.children[0].ty, Some(TypeRef::Primitive(PrimitiveType::Int)));
        assert!(expr.target.as_ref().is_some_and(|t| t.is_static));
    }
}

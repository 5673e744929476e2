//! The closed expression-node set produced by the parser.
//!
//! Expression trees are immutable once built and own their children
//! strictly (no cycles), so a compiled expression can be shared read-only
//! across concurrent evaluations.

use crate::model::Axis;
use crate::value::Numeric;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(Numeric),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// Filter applied to axis members before predicates. Name and wildcard tests
/// match against the axis's principal node kind (attributes on the attribute
/// axis, namespace nodes on the namespace axis, elements everywhere else).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `name` or `prefix:name`; the prefix is resolved against the
    /// evaluation context's namespace bindings.
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `*` or `prefix:*`.
    Wildcard { prefix: Option<String> },
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with optional target literal.
    ProcessingInstruction(Option<String>),
    /// `node()`, matching every kind.
    AnyNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }
}

/// Where a path's initial node-set comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PathStart {
    /// Relative path: starts at the context node.
    Context,
    /// Absolute path: starts at the document root of the context node.
    Root,
    /// Filter-expression start, e.g. `$nodes/child` or `id('x')/..`.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable {
        prefix: Option<String>,
        local: String,
    },
    FunctionCall {
        prefix: Option<String>,
        local: String,
        args: Vec<Expr>,
    },
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Union(Box<Expr>, Box<Expr>),
    /// A primary expression filtered by predicates, e.g. `$set[2]`.
    Filter {
        expr: Box<Expr>,
        predicates: Vec<Expr>,
    },
    Path {
        start: PathStart,
        steps: Vec<Step>,
    },
}

impl Expr {
    pub fn number(n: impl Into<Numeric>) -> Self {
        Expr::Literal(Literal::Number(n.into()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }
}

//! Recursive evaluation of compiled expressions.
//!
//! Evaluation is a pure function of (expression, context): no state survives
//! a call, errors abort the whole call chain, and nested iteration scopes run
//! in derived contexts so sibling evaluations cannot observe each other.

use smallvec::SmallVec;
use tracing::trace;

use crate::model::{Axis, ExpandedName, NodeKind, TreeNode};
use crate::nodeset;
use crate::parser;
use crate::parser::ast::{BinaryOp, Expr, Literal, NodeTest, PathStart, Step};
use crate::runtime::{ContextBuilder, Error, EvalContext};
use crate::value::{Numeric, Value, parse_number};

/// A compiled, immutable expression. Safe to share and evaluate concurrently
/// against independent contexts.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn compile(text: &str) -> Result<Self, Error> {
        trace!(expression = text, "compiling");
        let expr = parser::parse(text)?;
        Ok(Self {
            source: text.to_string(),
            expr,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate<N: TreeNode>(&self, ctx: &EvalContext<N>) -> Result<Value<N>, Error> {
        trace!(expression = %self.source, "evaluating");
        evaluate(&self.expr, ctx)
    }

    /// Evaluate against `node` with an otherwise default context.
    pub fn evaluate_on<N: TreeNode + 'static>(&self, node: N) -> Result<Value<N>, Error> {
        self.evaluate(&ContextBuilder::new().with_node(node).build())
    }

    /// The result as a node sequence; fails if the expression does not
    /// produce a node-set.
    pub fn select_nodes<N: TreeNode>(&self, ctx: &EvalContext<N>) -> Result<Vec<N>, Error> {
        match self.evaluate(ctx)? {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::evaluation(format!(
                "expression '{}' produced a {} where a node-set was required",
                self.source,
                kind_name(&other),
            ))),
        }
    }

    /// The first node of the result in document order, if any.
    pub fn select_node<N: TreeNode>(&self, ctx: &EvalContext<N>) -> Result<Option<N>, Error> {
        Ok(self.select_nodes(ctx)?.into_iter().next())
    }

    pub fn string_value_of<N: TreeNode>(&self, ctx: &EvalContext<N>) -> Result<String, Error> {
        Ok(self.evaluate(ctx)?.string_value())
    }

    pub fn number_value_of<N: TreeNode>(&self, ctx: &EvalContext<N>) -> Result<Numeric, Error> {
        Ok(self.evaluate(ctx)?.number_value())
    }

    pub fn boolean_value_of<N: TreeNode>(&self, ctx: &EvalContext<N>) -> Result<bool, Error> {
        Ok(self.evaluate(ctx)?.boolean_value())
    }
}

/// Compile an expression.
pub fn compile(text: &str) -> Result<XPath, Error> {
    XPath::compile(text)
}

fn kind_name<N>(v: &Value<N>) -> &'static str {
    match v {
        Value::NodeSet(_) => "node-set",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Boolean(_) => "boolean",
    }
}

/// Evaluate an expression tree against a context.
pub fn evaluate<N: TreeNode>(expr: &Expr, ctx: &EvalContext<N>) -> Result<Value<N>, Error> {
    match expr {
        Expr::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
        Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
        Expr::Variable { prefix, local } => {
            let name = ExpandedName::new(resolve_prefix(ctx, prefix.as_deref())?, local.clone());
            ctx.lookup_variable(&name).cloned()
        }
        Expr::FunctionCall {
            prefix,
            local,
            args,
        } => {
            let name = ExpandedName::new(resolve_prefix(ctx, prefix.as_deref())?, local.clone());
            // Arity is checked on resolve, before any argument runs.
            let fun = ctx.functions.resolve(&name, args.len())?;
            let mut argv = Vec::with_capacity(args.len());
            for arg in args {
                argv.push(evaluate(arg, ctx)?);
            }
            fun(ctx, argv)
        }
        Expr::Negate(inner) => Ok(Value::Number(evaluate(inner, ctx)?.number_value().neg())),
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, ctx),
        Expr::Union(lhs, rhs) => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            match (left, right) {
                (Value::NodeSet(a), Value::NodeSet(b)) => {
                    Ok(Value::NodeSet(nodeset::union(a, b)))
                }
                _ => Err(Error::evaluation("union requires node-set operands")),
            }
        }
        Expr::Filter { expr, predicates } => match evaluate(expr, ctx)? {
            Value::NodeSet(nodes) => {
                Ok(Value::NodeSet(apply_predicates(nodes, predicates, ctx)?))
            }
            _ => Err(Error::evaluation("predicates can only filter a node-set")),
        },
        Expr::Path { start, steps } => eval_path(start, steps, ctx),
    }
}

fn eval_binary<N: TreeNode>(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &EvalContext<N>,
) -> Result<Value<N>, Error> {
    match op {
        // Short-circuit: the right operand must not run once the left decides.
        BinaryOp::And => {
            if !evaluate(lhs, ctx)?.boolean_value() {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(evaluate(rhs, ctx)?.boolean_value()))
        }
        BinaryOp::Or => {
            if evaluate(lhs, ctx)?.boolean_value() {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(evaluate(rhs, ctx)?.boolean_value()))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let a = evaluate(lhs, ctx)?.number_value();
            let b = evaluate(rhs, ctx)?.number_value();
            Ok(Value::Number(match op {
                BinaryOp::Add => a.add(b),
                BinaryOp::Sub => a.sub(b),
                BinaryOp::Mul => a.mul(b),
                BinaryOp::Div => a.div(b),
                BinaryOp::Mod => a.modulo(b),
                _ => unreachable!("arithmetic operator"),
            }))
        }
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => {
            let left = evaluate(lhs, ctx)?;
            let right = evaluate(rhs, ctx)?;
            Ok(Value::Boolean(compare(op, &left, &right)))
        }
    }
}

/// Comparison semantics: existential over node-sets, otherwise coerced to a
/// common type (boolean dominates for `=`/`!=`, ordering is always numeric).
fn compare<N: TreeNode>(op: BinaryOp, left: &Value<N>, right: &Value<N>) -> bool {
    match (left, right) {
        (Value::NodeSet(l), Value::NodeSet(r)) => {
            if op.is_ordering() {
                l.iter().any(|a| {
                    let na = parse_number(&a.string_value());
                    r.iter()
                        .any(|b| cmp_num(op, na, parse_number(&b.string_value())))
                })
            } else {
                l.iter().any(|a| {
                    let sa = a.string_value();
                    r.iter().any(|b| cmp_str(op, &sa, &b.string_value()))
                })
            }
        }
        (Value::NodeSet(nodes), scalar) => compare_nodeset_scalar(op, nodes, scalar),
        (scalar, Value::NodeSet(nodes)) => compare_nodeset_scalar(flip(op), nodes, scalar),
        (l, r) => {
            if op.is_ordering() {
                cmp_num(op, l.number_value().as_f64(), r.number_value().as_f64())
            } else if matches!(l, Value::Boolean(_)) || matches!(r, Value::Boolean(_)) {
                cmp_bool(op, l.boolean_value(), r.boolean_value())
            } else if matches!(l, Value::Number(_)) || matches!(r, Value::Number(_)) {
                cmp_num(op, l.number_value().as_f64(), r.number_value().as_f64())
            } else {
                cmp_str(op, &l.string_value(), &r.string_value())
            }
        }
    }
}

/// `node OP scalar` for each node, true if any node satisfies it.
fn compare_nodeset_scalar<N: TreeNode>(op: BinaryOp, nodes: &[N], scalar: &Value<N>) -> bool {
    if op.is_ordering() {
        let rv = scalar.number_value().as_f64();
        return nodes
            .iter()
            .any(|n| cmp_num(op, parse_number(&n.string_value()), rv));
    }
    match scalar {
        Value::Boolean(b) => cmp_bool(op, !nodes.is_empty(), *b),
        Value::Number(num) => {
            let rv = num.as_f64();
            nodes
                .iter()
                .any(|n| cmp_num(op, parse_number(&n.string_value()), rv))
        }
        Value::String(s) => nodes.iter().any(|n| cmp_str(op, &n.string_value(), s)),
        Value::NodeSet(_) => unreachable!("handled by the node-set/node-set arm"),
    }
}

/// Mirror an ordering operator so `scalar OP nodes` can run as
/// `node flip(OP) scalar`.
fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}

fn cmp_num(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!("comparison operator"),
    }
}

fn cmp_str(op: BinaryOp, a: &str, b: &str) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        _ => unreachable!("string comparison is equality only"),
    }
}

fn cmp_bool(op: BinaryOp, a: bool, b: bool) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        _ => unreachable!("boolean comparison is equality only"),
    }
}

fn eval_path<N: TreeNode>(
    start: &PathStart,
    steps: &[Step],
    ctx: &EvalContext<N>,
) -> Result<Value<N>, Error> {
    let mut current: Vec<N> = match start {
        PathStart::Context => vec![ctx.require_node()?],
        PathStart::Root => vec![crate::model::document_root(ctx.require_node()?)],
        PathStart::Expr(e) => match evaluate(e, ctx)? {
            Value::NodeSet(nodes) => nodes,
            _ => {
                return Err(Error::evaluation(
                    "path steps can only be applied to a node-set",
                ));
            }
        },
    };
    for step in steps {
        let mut gathered: Vec<N> = Vec::new();
        for node in &current {
            // Members arrive in axis direction, which is also the order
            // positional predicates count in.
            let members = node.axis_members(step.axis)?;
            let mut tested: SmallVec<[N; 8]> = SmallVec::new();
            for m in members {
                if matches_node_test(&m, step.axis, &step.test, ctx)? {
                    tested.push(m);
                }
            }
            let kept = apply_predicates(tested.into_vec(), &step.predicates, ctx)?;
            gathered.extend(kept);
        }
        current = nodeset::sort_document_order(gathered);
    }
    Ok(Value::NodeSet(current))
}

/// Successive filtering: each predicate sees the list its predecessor left,
/// one derived context per candidate carrying that candidate's rank. A
/// numeric predicate value selects by position, everything else by boolean
/// coercion.
fn apply_predicates<N: TreeNode>(
    candidates: Vec<N>,
    predicates: &[Expr],
    ctx: &EvalContext<N>,
) -> Result<Vec<N>, Error> {
    let mut current = candidates;
    for predicate in predicates {
        let size = current.len();
        let mut kept = Vec::with_capacity(size);
        for (idx, node) in current.into_iter().enumerate() {
            let scope = ctx.with_position(node.clone(), idx + 1, size);
            let value = evaluate(predicate, &scope)?;
            let selected = match &value {
                Value::Number(n) => n.as_f64() == (idx + 1) as f64,
                other => other.boolean_value(),
            };
            if selected {
                kept.push(node);
            }
        }
        current = kept;
    }
    Ok(current)
}

/// The node kind a name or wildcard test matches on a given axis.
fn principal_kind(axis: Axis) -> NodeKind {
    match axis {
        Axis::Attribute => NodeKind::Attribute,
        Axis::Namespace => NodeKind::Namespace,
        _ => NodeKind::Element,
    }
}

fn matches_node_test<N: TreeNode>(
    node: &N,
    axis: Axis,
    test: &NodeTest,
    ctx: &EvalContext<N>,
) -> Result<bool, Error> {
    match test {
        NodeTest::AnyNode => Ok(true),
        NodeTest::Text => Ok(node.kind() == NodeKind::Text),
        NodeTest::Comment => Ok(node.kind() == NodeKind::Comment),
        NodeTest::ProcessingInstruction(target) => {
            if node.kind() != NodeKind::ProcessingInstruction {
                return Ok(false);
            }
            Ok(match target {
                Some(t) => node.name().is_some_and(|q| q.local == *t),
                None => true,
            })
        }
        NodeTest::Wildcard { prefix } => {
            if node.kind() != principal_kind(axis) {
                return Ok(false);
            }
            match prefix {
                None => Ok(true),
                Some(p) => {
                    let uri = require_prefix(ctx, p)?;
                    Ok(node
                        .name()
                        .is_some_and(|q| q.ns_uri.as_deref() == Some(uri.as_str())))
                }
            }
        }
        NodeTest::Name { prefix, local } => {
            if node.kind() != principal_kind(axis) {
                return Ok(false);
            }
            let Some(qname) = node.name() else {
                return Ok(false);
            };
            if qname.local != *local {
                return Ok(false);
            }
            let test_uri = resolve_prefix(ctx, prefix.as_deref())?;
            Ok(qname.ns_uri.as_deref().unwrap_or("") == test_uri.as_deref().unwrap_or(""))
        }
    }
}

fn resolve_prefix<N: TreeNode>(
    ctx: &EvalContext<N>,
    prefix: Option<&str>,
) -> Result<Option<String>, Error> {
    match prefix {
        None => Ok(None),
        Some(p) => require_prefix(ctx, p).map(Some),
    }
}

fn require_prefix<N: TreeNode>(ctx: &EvalContext<N>, prefix: &str) -> Result<String, Error> {
    ctx.namespace_uri(prefix)
        .map(str::to_string)
        .ok_or_else(|| Error::evaluation(format!("no namespace binding for prefix '{prefix}'")))
}

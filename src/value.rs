//! Runtime values and the coercion rules between them.
//!
//! Every expression evaluates to exactly one [`Value`]: a node-set, a string,
//! a number, or a boolean. Numbers carry an integer/double subtype that is
//! preserved by `+ - *` and `mod` when both operands are integers; coercion
//! and comparison always see the IEEE double domain, and canonical rendering
//! prints integral doubles without a fractional part, so the subtype never
//! changes what a whole number looks like.

use core::fmt;

use crate::model::TreeNode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Double(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Double(d) => d,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Numeric::Double(d) if d.is_nan())
    }

    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => match a.checked_add(b) {
                Some(v) => Numeric::Integer(v),
                None => Numeric::Double(a as f64 + b as f64),
            },
            _ => Numeric::Double(self.as_f64() + other.as_f64()),
        }
    }

    pub fn sub(self, other: Self) -> Self {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => match a.checked_sub(b) {
                Some(v) => Numeric::Integer(v),
                None => Numeric::Double(a as f64 - b as f64),
            },
            _ => Numeric::Double(self.as_f64() - other.as_f64()),
        }
    }

    pub fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => match a.checked_mul(b) {
                Some(v) => Numeric::Integer(v),
                None => Numeric::Double(a as f64 * b as f64),
            },
            _ => Numeric::Double(self.as_f64() * other.as_f64()),
        }
    }

    /// Division is always performed in the double domain (`4 div 2` is `2`,
    /// but a double-typed `2`; rendering is identical either way).
    pub fn div(self, other: Self) -> Self {
        Numeric::Double(self.as_f64() / other.as_f64())
    }

    /// Truncated remainder, sign following the dividend. Integer `mod` zero
    /// yields NaN in the double domain rather than trapping.
    pub fn modulo(self, other: Self) -> Self {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) if b != 0 => Numeric::Integer(a % b),
            _ => Numeric::Double(self.as_f64() % other.as_f64()),
        }
    }

    pub fn neg(self) -> Self {
        match self {
            Numeric::Integer(i) => match i.checked_neg() {
                Some(v) => Numeric::Integer(v),
                None => Numeric::Double(-(i as f64)),
            },
            Numeric::Double(d) => Numeric::Double(-d),
        }
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::Integer(v)
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Numeric::Double(v)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Integer(i) => write!(f, "{i}"),
            Numeric::Double(d) => f.write_str(&format_double(*d)),
        }
    }
}

/// Canonical decimal rendering: `NaN`, `Infinity`, `-Infinity` as fixed
/// tokens; integral doubles without a fractional part; negative zero as `0`.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if d == 0.0 {
        return "0".to_string();
    }
    if d.fract() == 0.0 && d.abs() < 9_007_199_254_740_992.0 {
        return format!("{}", d as i64);
    }
    format!("{d}")
}

/// Number parsing for coercion: optional surrounding XML whitespace, then a
/// decimal literal. Anything else is NaN (parsing is total).
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim_matches([' ', '\t', '\r', '\n']);
    if t.is_empty() {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// The result of evaluating an expression.
///
/// Node-sets produced by the engine are deduplicated and sorted in document
/// order (see [`crate::nodeset`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    NodeSet(Vec<N>),
    String(String),
    Number(Numeric),
    Boolean(bool),
}

impl<N: TreeNode> Value<N> {
    pub fn number(n: impl Into<Numeric>) -> Self {
        Value::Number(n.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn empty_node_set() -> Self {
        Value::NodeSet(Vec::new())
    }

    /// Boolean coercion: node-set non-empty, number non-zero and not NaN,
    /// string non-empty.
    pub fn boolean_value(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::Number(n) => {
                let d = n.as_f64();
                d != 0.0 && !d.is_nan()
            }
            Value::String(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
        }
    }

    /// Number coercion. A node-set coerces via the string-value of its first
    /// node in document order; an empty node-set is NaN.
    pub fn number_value(&self) -> Numeric {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => Numeric::Integer(i64::from(*b)),
            Value::String(s) => Numeric::Double(parse_number(s)),
            Value::NodeSet(nodes) => match nodes.first() {
                Some(n) => Numeric::Double(parse_number(&n.string_value())),
                None => Numeric::Double(f64::NAN),
            },
        }
    }

    /// String coercion. A node-set coerces to the string-value of its first
    /// node in document order, or the empty string when empty.
    pub fn string_value(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::NodeSet(nodes) => nodes.first().map(TreeNode::string_value).unwrap_or_default(),
        }
    }

    /// The node-set behind this value, or `None` for the scalar kinds.
    pub fn as_node_set(&self) -> Option<&[N]> {
        match self {
            Value::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

}

impl<N> From<bool> for Value<N> {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl<N> From<Numeric> for Value<N> {
    fn from(v: Numeric) -> Self {
        Value::Number(v)
    }
}

impl<N> From<String> for Value<N> {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<N> From<&str> for Value<N> {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

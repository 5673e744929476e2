//! Evaluation-time environment: the error taxonomy, the function registry,
//! and the per-evaluation context.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Axis, ExpandedName, TreeNode};
use crate::value::Value;

/// Everything that can abort an evaluation.
///
/// `UnsupportedAxis` is the one recoverable kind: a host model that cannot
/// enumerate an axis reports it, and callers running suites are expected to
/// skip and continue. All other kinds are fatal to the evaluation that raised
/// them. The engine itself never retries and never logs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("the {axis} axis is not supported by this document model")]
    UnsupportedAxis { axis: Axis },

    #[error("unknown function {name}()")]
    UnknownFunction { name: String },

    #[error("function {name}() expects {expected} argument(s), called with {actual}")]
    WrongArity {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("unbound variable ${name}")]
    UnboundVariable { name: String },

    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("{0}")]
    Evaluation(String),
}

impl Error {
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Error::Evaluation(msg.into())
    }

    pub fn syntax(msg: impl Into<String>, offset: usize) -> Self {
        Error::Syntax {
            message: msg.into(),
            offset,
        }
    }
}

pub type Arity = usize;

/// A built-in or host-registered callable. Arguments arrive already evaluated,
/// left to right; the context carries position/size for `position()`/`last()`.
pub type FunctionImpl<N> =
    Arc<dyn Fn(&EvalContext<N>, Vec<Value<N>>) -> Result<Value<N>, Error> + Send + Sync>;

struct FunctionEntry<N> {
    min_arity: Arity,
    max_arity: Option<Arity>, // None = variadic
    fun: FunctionImpl<N>,
}

/// Name → callable table. An explicit value, never a process-wide singleton:
/// each context holds its own `Arc` so independent configurations can coexist
/// in one process.
pub struct FunctionRegistry<N> {
    fns: HashMap<ExpandedName, FunctionEntry<N>>,
}

impl<N> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }
}

impl<N> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register with an arity range. `max_arity` of `None` means variadic
    /// starting at `min_arity`. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_range<F>(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        f: F,
    ) where
        F: 'static + Send + Sync + Fn(&EvalContext<N>, Vec<Value<N>>) -> Result<Value<N>, Error>,
    {
        self.fns.insert(
            name,
            FunctionEntry {
                min_arity,
                max_arity,
                fun: Arc::new(f),
            },
        );
    }

    /// Convenience: exact-arity function without a namespace.
    pub fn register_local<F>(&mut self, local: &str, arity: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&EvalContext<N>, Vec<Value<N>>) -> Result<Value<N>, Error>,
    {
        self.register_range(ExpandedName::local(local), arity, Some(arity), f);
    }

    /// Convenience: bounded-range function without a namespace.
    pub fn register_local_range<F>(&mut self, local: &str, min: Arity, max: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&EvalContext<N>, Vec<Value<N>>) -> Result<Value<N>, Error>,
    {
        self.register_range(ExpandedName::local(local), min, Some(max), f);
    }

    /// Convenience: variadic function without a namespace.
    pub fn register_local_variadic<F>(&mut self, local: &str, min: Arity, f: F)
    where
        F: 'static + Send + Sync + Fn(&EvalContext<N>, Vec<Value<N>>) -> Result<Value<N>, Error>,
    {
        self.register_range(ExpandedName::local(local), min, None, f);
    }

    /// Resolve by name and argument count. Arity is validated here, before any
    /// argument is evaluated, so a wrong-arity call never runs its arguments.
    pub fn resolve(&self, name: &ExpandedName, argc: Arity) -> Result<&FunctionImpl<N>, Error> {
        let entry = self.fns.get(name).ok_or_else(|| Error::UnknownFunction {
            name: name.to_string(),
        })?;
        let in_range =
            argc >= entry.min_arity && entry.max_arity.is_none_or(|max| argc <= max);
        if !in_range {
            return Err(Error::WrongArity {
                name: name.to_string(),
                expected: expected_arity(entry.min_arity, entry.max_arity),
                actual: argc,
            });
        }
        Ok(&entry.fun)
    }
}

fn expected_arity(min: Arity, max: Option<Arity>) -> String {
    match max {
        Some(m) if m == min => format!("{min}"),
        Some(m) => format!("{min} to {m}"),
        None => format!("at least {min}"),
    }
}

/// The environment one expression is evaluated in.
///
/// Read-only once built; nested iteration scopes derive fresh contexts via
/// [`EvalContext::with_position`] and never write back to the parent, which is
/// what makes sibling predicate evaluations independent of each other.
#[derive(Clone)]
pub struct EvalContext<N> {
    pub node: Option<N>,
    pub position: usize,
    pub size: usize,
    pub namespaces: HashMap<String, String>,
    pub variables: HashMap<ExpandedName, Value<N>>,
    pub functions: Arc<FunctionRegistry<N>>,
}

impl<N: TreeNode + 'static> Default for EvalContext<N> {
    fn default() -> Self {
        Self {
            node: None,
            position: 1,
            size: 1,
            namespaces: HashMap::new(),
            variables: HashMap::new(),
            functions: Arc::new(crate::functions::core_function_registry()),
        }
    }
}

impl<N: TreeNode> EvalContext<N> {
    /// A copy of this context with a different context node and rank, used
    /// once per candidate inside a predicate or path step.
    pub fn with_position(&self, node: N, position: usize, size: usize) -> Self {
        debug_assert!(size == 0 || (1 <= position && position <= size));
        Self {
            node: Some(node),
            position,
            size,
            namespaces: self.namespaces.clone(),
            variables: self.variables.clone(),
            functions: Arc::clone(&self.functions),
        }
    }

    /// The context node, or a failure when the context has none (top-level
    /// evaluation without a node).
    pub fn require_node(&self) -> Result<N, Error> {
        self.node
            .clone()
            .ok_or_else(|| Error::evaluation("the context has no node to evaluate against"))
    }

    pub fn lookup_variable(&self, name: &ExpandedName) -> Result<&Value<N>, Error> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::UnboundVariable {
                name: name.to_string(),
            })
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }
}

pub struct ContextBuilder<N> {
    ctx: EvalContext<N>,
}

impl<N: TreeNode + 'static> Default for ContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: TreeNode + 'static> ContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: EvalContext::default(),
        }
    }

    pub fn with_node(mut self, node: N) -> Self {
        self.ctx.node = Some(node);
        self
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.ctx.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_variable(mut self, name: ExpandedName, value: impl Into<Value<N>>) -> Self {
        self.ctx.variables.insert(name, value.into());
        self
    }

    pub fn with_functions(mut self, functions: Arc<FunctionRegistry<N>>) -> Self {
        self.ctx.functions = functions;
        self
    }

    pub fn build(self) -> EvalContext<N> {
        self.ctx
    }
}

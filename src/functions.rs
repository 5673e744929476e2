//! The core function library.
//!
//! Registration conventions:
//! - One registration per function; optional parameters use an arity range
//!   and dispatch on `args.len()` inside the closure.
//! - `concat` is the only truly variadic family and uses
//!   `register_local_variadic`.
//! - Arity is enforced by the registry before arguments are evaluated, so
//!   implementations can index `args` freely within their declared range.

use crate::model::{NodeKind, TreeNode, document_root};
use crate::nodeset;
use crate::runtime::{Error, EvalContext, FunctionRegistry};
use crate::value::{Numeric, Value, parse_number};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// The complete core library: node-set, string, boolean, and number
/// functions. Hosts extend a copy of this registry rather than a global.
pub fn core_function_registry<N: TreeNode + 'static>() -> FunctionRegistry<N> {
    let mut reg: FunctionRegistry<N> = FunctionRegistry::new();

    // ===== Node-set functions =====
    reg.register_local("last", 0, |ctx, _args| Ok(Value::number(ctx.size as i64)));
    reg.register_local("position", 0, |ctx, _args| {
        Ok(Value::number(ctx.position as i64))
    });
    reg.register_local("count", 1, |_ctx, args| {
        let nodes = node_set_arg(&args[0], "count")?;
        Ok(Value::number(nodes.len() as i64))
    });
    reg.register_local("id", 1, |ctx, args| {
        let root = document_root(ctx.require_node()?);
        let mut wanted: Vec<String> = Vec::new();
        match &args[0] {
            Value::NodeSet(nodes) => {
                for n in nodes {
                    collect_whitespace_tokens(&n.string_value(), &mut wanted);
                }
            }
            other => collect_whitespace_tokens(&other.string_value(), &mut wanted),
        }
        let mut found: Vec<N> = Vec::new();
        collect_elements_by_id(&root, &wanted, &mut found);
        Ok(Value::NodeSet(nodeset::sort_document_order(found)))
    });
    reg.register_local_range("local-name", 0, 1, |ctx, args| {
        let name = name_target(ctx, &args)?.and_then(|n| n.name());
        Ok(Value::string(name.map(|q| q.local).unwrap_or_default()))
    });
    reg.register_local_range("namespace-uri", 0, 1, |ctx, args| {
        let name = name_target(ctx, &args)?.and_then(|n| n.name());
        Ok(Value::string(
            name.and_then(|q| q.ns_uri).unwrap_or_default(),
        ))
    });
    reg.register_local_range("name", 0, 1, |ctx, args| {
        let name = name_target(ctx, &args)?.and_then(|n| n.name());
        Ok(Value::string(match name {
            Some(q) => match q.prefix {
                Some(p) => format!("{}:{}", p, q.local),
                None => q.local,
            },
            None => String::new(),
        }))
    });

    // ===== String functions =====
    reg.register_local_range("string", 0, 1, |ctx, args| {
        Ok(Value::String(string_arg_or_context(ctx, &args)?))
    });
    reg.register_local_variadic("concat", 2, |_ctx, args| {
        let mut out = String::new();
        for a in &args {
            out.push_str(&a.string_value());
        }
        Ok(Value::String(out))
    });
    reg.register_local("starts-with", 2, |_ctx, args| {
        let s = args[0].string_value();
        let prefix = args[1].string_value();
        Ok(Value::Boolean(s.starts_with(&prefix)))
    });
    reg.register_local("contains", 2, |_ctx, args| {
        let s = args[0].string_value();
        let needle = args[1].string_value();
        Ok(Value::Boolean(s.contains(&needle)))
    });
    reg.register_local("substring-before", 2, |_ctx, args| {
        let s = args[0].string_value();
        let sep = args[1].string_value();
        Ok(Value::string(match s.find(&sep) {
            Some(i) => s[..i].to_string(),
            None => String::new(),
        }))
    });
    reg.register_local("substring-after", 2, |_ctx, args| {
        let s = args[0].string_value();
        let sep = args[1].string_value();
        Ok(Value::string(match s.find(&sep) {
            Some(i) => s[i + sep.len()..].to_string(),
            None => String::new(),
        }))
    });
    reg.register_local_range("substring", 2, 3, |_ctx, args| {
        let s = args[0].string_value();
        let begin = round_half_up(args[1].number_value().as_f64());
        let until = if args.len() == 3 {
            begin + round_half_up(args[2].number_value().as_f64())
        } else {
            f64::INFINITY
        };
        // 1-based character positions; NaN bounds compare false and select
        // nothing.
        let out: String = s
            .chars()
            .enumerate()
            .filter(|(i, _)| {
                let pos = (i + 1) as f64;
                pos >= begin && pos < until
            })
            .map(|(_, c)| c)
            .collect();
        Ok(Value::String(out))
    });
    reg.register_local_range("string-length", 0, 1, |ctx, args| {
        let s = string_arg_or_context(ctx, &args)?;
        Ok(Value::number(s.chars().count() as i64))
    });
    reg.register_local_range("normalize-space", 0, 1, |ctx, args| {
        let s = string_arg_or_context(ctx, &args)?;
        let mut tokens: Vec<String> = Vec::new();
        collect_whitespace_tokens(&s, &mut tokens);
        Ok(Value::String(tokens.join(" ")))
    });
    reg.register_local("translate", 3, |_ctx, args| {
        let s = args[0].string_value();
        let from: Vec<char> = args[1].string_value().chars().collect();
        let to: Vec<char> = args[2].string_value().chars().collect();
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            // First occurrence in the map wins; unmapped positions delete.
            match from.iter().position(|&f| f == ch) {
                Some(i) => {
                    if let Some(&r) = to.get(i) {
                        out.push(r);
                    }
                }
                None => out.push(ch),
            }
        }
        Ok(Value::String(out))
    });

    // ===== Boolean functions =====
    reg.register_local("boolean", 1, |_ctx, args| {
        Ok(Value::Boolean(args[0].boolean_value()))
    });
    reg.register_local("not", 1, |_ctx, args| {
        Ok(Value::Boolean(!args[0].boolean_value()))
    });
    reg.register_local("true", 0, |_ctx, _args| Ok(Value::Boolean(true)));
    reg.register_local("false", 0, |_ctx, _args| Ok(Value::Boolean(false)));
    reg.register_local("lang", 1, |ctx, args| {
        let target = args[0].string_value();
        let mut cur = Some(ctx.require_node()?);
        while let Some(n) = cur {
            for attr in n.attributes() {
                let Some(q) = attr.name() else { continue };
                let is_xml_lang = q.local == "lang"
                    && (q.prefix.as_deref() == Some("xml")
                        || q.ns_uri.as_deref() == Some(XML_NS));
                if is_xml_lang {
                    return Ok(Value::Boolean(lang_matches(&attr.string_value(), &target)));
                }
            }
            cur = n.parent();
        }
        Ok(Value::Boolean(false))
    });

    // ===== Number functions =====
    reg.register_local_range("number", 0, 1, |ctx, args| {
        Ok(Value::Number(match args.first() {
            Some(v) => v.number_value(),
            None => Numeric::Double(parse_number(&ctx.require_node()?.string_value())),
        }))
    });
    reg.register_local("sum", 1, |_ctx, args| {
        let nodes = node_set_arg(&args[0], "sum")?;
        let total: f64 = nodes
            .iter()
            .map(|n| parse_number(&n.string_value()))
            .sum();
        Ok(Value::Number(Numeric::Double(total)))
    });
    reg.register_local("floor", 1, |_ctx, args| {
        Ok(Value::Number(match args[0].number_value() {
            Numeric::Integer(i) => Numeric::Integer(i),
            Numeric::Double(d) => Numeric::Double(d.floor()),
        }))
    });
    reg.register_local("ceiling", 1, |_ctx, args| {
        Ok(Value::Number(match args[0].number_value() {
            Numeric::Integer(i) => Numeric::Integer(i),
            Numeric::Double(d) => Numeric::Double(d.ceil()),
        }))
    });
    reg.register_local("round", 1, |_ctx, args| {
        Ok(Value::Number(match args[0].number_value() {
            Numeric::Integer(i) => Numeric::Integer(i),
            Numeric::Double(d) => Numeric::Double(round_half_up(d)),
        }))
    });

    reg
}

/// Round half toward positive infinity, the rule `round()` and `substring()`
/// share. NaN and the infinities pass through.
fn round_half_up(d: f64) -> f64 {
    if d.is_nan() || d.is_infinite() {
        return d;
    }
    (d + 0.5).floor()
}

fn node_set_arg<'a, N: TreeNode>(v: &'a Value<N>, fname: &str) -> Result<&'a [N], Error> {
    v.as_node_set()
        .ok_or_else(|| Error::evaluation(format!("{fname}() requires a node-set argument")))
}

/// The node a name-reading function operates on: the first node of the
/// argument in document order, or the context node when no argument is given.
fn name_target<N: TreeNode>(
    ctx: &EvalContext<N>,
    args: &[Value<N>],
) -> Result<Option<N>, Error> {
    match args.first() {
        Some(Value::NodeSet(nodes)) => Ok(nodes.first().cloned()),
        Some(_) => Err(Error::evaluation("expected a node-set argument")),
        None => ctx.require_node().map(Some),
    }
}

fn string_arg_or_context<N: TreeNode>(
    ctx: &EvalContext<N>,
    args: &[Value<N>],
) -> Result<String, Error> {
    match args.first() {
        Some(v) => Ok(v.string_value()),
        None => Ok(ctx.require_node()?.string_value()),
    }
}

/// Split on the XML whitespace characters, dropping empty tokens.
fn collect_whitespace_tokens(s: &str, out: &mut Vec<String>) {
    out.extend(
        s.split([' ', '\t', '\r', '\n'])
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    );
}

fn collect_elements_by_id<N: TreeNode>(node: &N, wanted: &[String], out: &mut Vec<N>) {
    if node.kind() == NodeKind::Element {
        let id = node.attributes().into_iter().find_map(|a| {
            a.name()
                .filter(|q| q.local == "id")
                .map(|_| a.string_value())
        });
        if let Some(id) = id {
            if wanted.iter().any(|w| *w == id) {
                out.push(node.clone());
            }
        }
    }
    for c in node.children() {
        collect_elements_by_id(&c, wanted, out);
    }
}

/// `xml:lang` matching: exact, case-insensitive, or a dialect prefix
/// (`en` matches `en-US`).
fn lang_matches(value: &str, target: &str) -> bool {
    if value.eq_ignore_ascii_case(target) {
        return true;
    }
    value.len() > target.len()
        && value.as_bytes()[target.len()] == b'-'
        && value[..target.len()].eq_ignore_ascii_case(target)
}

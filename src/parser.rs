//! Recursive-descent parser turning expression text into the [`ast`] tree.
//!
//! Grammar: the XPath 1.0 expression language, abbreviated and unabbreviated
//! syntax. Precedence, loosest first: `or`, `and`, equality, relational,
//! additive, multiplicative, unary minus, union, path.

use crate::model::Axis;
use crate::runtime::Error;
use crate::value::Numeric;

pub mod ast;
pub mod lexer;

use ast::{BinaryOp, Expr, NodeTest, PathStart, Step};
use lexer::{Token, TokenKind, tokenize};

/// Names that form node-type tests when followed by `(`.
const NODE_TYPE_NAMES: [&str; 4] = ["node", "text", "comment", "processing-instruction"];

/// Parse an expression into its AST.
pub fn parse(input: &str) -> Result<Expr, Error> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    match parser.peek() {
        TokenKind::Eof => Ok(expr),
        other => Err(Error::syntax(
            format!("unexpected {other} after expression"),
            parser.offset(),
        )),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_second(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos.min(self.tokens.len() - 1)].kind.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(Error::syntax(
                format!("expected {kind}, found {}", self.peek()),
                self.offset(),
            ))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek(), TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            expr = binary(BinaryOp::Or, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_equality()?;
        while matches!(self.peek(), TokenKind::And) {
            self.advance();
            let rhs = self.parse_equality()?;
            expr = binary(BinaryOp::And, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_relational(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Multiply => BinaryOp::Mul,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        if matches!(self.peek(), TokenKind::Minus) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_path()?;
        while matches!(self.peek(), TokenKind::Pipe) {
            self.advance();
            let rhs = self.parse_path()?;
            expr = Expr::Union(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// A path expression: a location path, a filter expression, or a filter
    /// expression continued by `/` steps.
    fn parse_path(&mut self) -> Result<Expr, Error> {
        if matches!(self.peek(), TokenKind::Slash) {
            self.advance();
            let steps = if self.starts_step() {
                self.parse_relative_steps()?
            } else {
                Vec::new()
            };
            return Ok(Expr::Path {
                start: PathStart::Root,
                steps,
            });
        }
        if matches!(self.peek(), TokenKind::DoubleSlash) {
            self.advance();
            let mut steps = vec![descendant_or_self_step()];
            steps.extend(self.parse_relative_steps()?);
            return Ok(Expr::Path {
                start: PathStart::Root,
                steps,
            });
        }
        if self.starts_filter() {
            let primary = self.parse_primary()?;
            let predicates = self.parse_predicates()?;
            let base = if predicates.is_empty() {
                primary
            } else {
                Expr::Filter {
                    expr: Box::new(primary),
                    predicates,
                }
            };
            return match self.peek() {
                TokenKind::Slash => {
                    self.advance();
                    let steps = self.parse_relative_steps()?;
                    Ok(Expr::Path {
                        start: PathStart::Expr(Box::new(base)),
                        steps,
                    })
                }
                TokenKind::DoubleSlash => {
                    self.advance();
                    let mut steps = vec![descendant_or_self_step()];
                    steps.extend(self.parse_relative_steps()?);
                    Ok(Expr::Path {
                        start: PathStart::Expr(Box::new(base)),
                        steps,
                    })
                }
                _ => Ok(base),
            };
        }
        let steps = self.parse_relative_steps()?;
        Ok(Expr::Path {
            start: PathStart::Context,
            steps,
        })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::At
                | TokenKind::Axis(_)
                | TokenKind::Name { .. }
                | TokenKind::Wildcard { .. }
        )
    }

    /// Filter expressions start with a variable, literal, number, `(`, or a
    /// function call. A name followed by `(` is a function call unless the
    /// name is a node-type keyword, which belongs to a step instead.
    fn starts_filter(&self) -> bool {
        match self.peek() {
            TokenKind::Dollar
            | TokenKind::Literal(_)
            | TokenKind::Number(_)
            | TokenKind::LParen => true,
            TokenKind::Name { prefix, local } => {
                matches!(self.peek_second(), TokenKind::LParen)
                    && !(prefix.is_none() && NODE_TYPE_NAMES.contains(&local.as_str()))
            }
            _ => false,
        }
    }

    fn parse_relative_steps(&mut self) -> Result<Vec<Step>, Error> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                TokenKind::Slash => {
                    self.advance();
                    steps.push(self.parse_step()?);
                }
                TokenKind::DoubleSlash => {
                    self.advance();
                    steps.push(descendant_or_self_step());
                    steps.push(self.parse_step()?);
                }
                _ => break,
            }
        }
        Ok(steps)
    }

    fn parse_step(&mut self) -> Result<Step, Error> {
        match self.peek().clone() {
            TokenKind::Dot => {
                self.advance();
                Ok(Step::new(Axis::SelfAxis, NodeTest::AnyNode))
            }
            TokenKind::DotDot => {
                self.advance();
                Ok(Step::new(Axis::Parent, NodeTest::AnyNode))
            }
            TokenKind::At => {
                self.advance();
                self.parse_step_body(Axis::Attribute)
            }
            TokenKind::Axis(axis) => {
                self.advance();
                self.parse_step_body(axis)
            }
            TokenKind::Name { .. } | TokenKind::Wildcard { .. } => {
                self.parse_step_body(Axis::Child)
            }
            other => Err(Error::syntax(
                format!("expected a step, found {other}"),
                self.offset(),
            )),
        }
    }

    fn parse_step_body(&mut self, axis: Axis) -> Result<Step, Error> {
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, Error> {
        match self.peek().clone() {
            TokenKind::Wildcard { prefix } => {
                self.advance();
                Ok(NodeTest::Wildcard { prefix })
            }
            TokenKind::Name { prefix, local } => {
                self.advance();
                if matches!(self.peek(), TokenKind::LParen) {
                    if prefix.is_none() && NODE_TYPE_NAMES.contains(&local.as_str()) {
                        return self.parse_kind_test(&local);
                    }
                    return Err(Error::syntax(
                        format!("function call '{local}()' is not a valid node test"),
                        self.offset(),
                    ));
                }
                Ok(NodeTest::Name { prefix, local })
            }
            other => Err(Error::syntax(
                format!("expected a node test, found {other}"),
                self.offset(),
            )),
        }
    }

    fn parse_kind_test(&mut self, keyword: &str) -> Result<NodeTest, Error> {
        self.expect(&TokenKind::LParen)?;
        let test = match keyword {
            "node" => NodeTest::AnyNode,
            "text" => NodeTest::Text,
            "comment" => NodeTest::Comment,
            "processing-instruction" => {
                if let TokenKind::Literal(target) = self.peek().clone() {
                    self.advance();
                    NodeTest::ProcessingInstruction(Some(target))
                } else {
                    NodeTest::ProcessingInstruction(None)
                }
            }
            _ => unreachable!("caller checked the keyword"),
        };
        self.expect(&TokenKind::RParen)?;
        Ok(test)
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, Error> {
        let mut predicates = Vec::new();
        while matches!(self.peek(), TokenKind::LBracket) {
            self.advance();
            predicates.push(self.parse_expr()?);
            self.expect(&TokenKind::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.peek().clone() {
            TokenKind::Dollar => {
                self.advance();
                match self.advance() {
                    TokenKind::Name { prefix, local } => Ok(Expr::Variable { prefix, local }),
                    other => Err(Error::syntax(
                        format!("expected a variable name after '$', found {other}"),
                        self.offset(),
                    )),
                }
            }
            TokenKind::Literal(s) => {
                self.advance();
                Ok(Expr::string(s))
            }
            TokenKind::Number(raw) => {
                self.advance();
                Ok(Expr::number(parse_number_literal(&raw)))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Name { prefix, local } => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let args = self.parse_args()?;
                Ok(Expr::FunctionCall {
                    prefix,
                    local,
                    args,
                })
            }
            other => Err(Error::syntax(
                format!("expected an expression, found {other}"),
                self.offset(),
            )),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        if matches!(self.peek(), TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                other => {
                    return Err(Error::syntax(
                        format!("expected ',' or ')' in argument list, found {other}"),
                        self.offset(),
                    ));
                }
            }
        }
        Ok(args)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// The `//` abbreviation expands to a `descendant-or-self::node()` step.
fn descendant_or_self_step() -> Step {
    Step::new(Axis::DescendantOrSelf, NodeTest::AnyNode)
}

/// Literals without a decimal point stay integer-typed; everything else is a
/// double. An integer literal too large for `i64` falls back to double.
fn parse_number_literal(raw: &str) -> Numeric {
    if raw.contains('.') {
        Numeric::Double(raw.parse::<f64>().unwrap_or(f64::NAN))
    } else {
        match raw.parse::<i64>() {
            Ok(i) => Numeric::Integer(i),
            Err(_) => Numeric::Double(raw.parse::<f64>().unwrap_or(f64::NAN)),
        }
    }
}

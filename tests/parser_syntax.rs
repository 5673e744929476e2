use rstest::rstest;
use treepath::parser::ast::{BinaryOp, Expr, Literal, NodeTest, PathStart, Step};
use treepath::parser::parse;
use treepath::{Axis, Error, Numeric};

fn steps(expr: &Expr) -> &[Step] {
    match expr {
        Expr::Path { steps, .. } => steps,
        other => panic!("not a path: {other:?}"),
    }
}

#[rstest]
fn relative_child_step() {
    let expr = parse("book").unwrap();
    let Expr::Path { start, steps } = &expr else {
        panic!("not a path");
    };
    assert_eq!(*start, PathStart::Context);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].axis, Axis::Child);
    assert_eq!(
        steps[0].test,
        NodeTest::Name {
            prefix: None,
            local: "book".to_string()
        }
    );
}

#[rstest]
fn double_slash_expands_to_descendant_or_self() {
    let expr = parse("//book").unwrap();
    let s = steps(&expr);
    assert_eq!(s.len(), 2);
    assert_eq!(s[0].axis, Axis::DescendantOrSelf);
    assert_eq!(s[0].test, NodeTest::AnyNode);
    assert_eq!(s[1].axis, Axis::Child);
}

#[rstest]
#[case(".", Axis::SelfAxis)]
#[case("..", Axis::Parent)]
fn dot_abbreviations(#[case] text: &str, #[case] axis: Axis) {
    let expr = parse(text).unwrap();
    let s = steps(&expr);
    assert_eq!(s.len(), 1);
    assert_eq!(s[0].axis, axis);
    assert_eq!(s[0].test, NodeTest::AnyNode);
}

#[rstest]
fn at_abbreviates_the_attribute_axis() {
    let expr = parse("@id").unwrap();
    let s = steps(&expr);
    assert_eq!(s[0].axis, Axis::Attribute);
}

#[rstest]
fn predicates_attach_to_their_step() {
    let expr = parse("book[@id][2]/title").unwrap();
    let s = steps(&expr);
    assert_eq!(s.len(), 2);
    assert_eq!(s[0].predicates.len(), 2);
    assert!(s[1].predicates.is_empty());
}

#[rstest]
fn integer_and_decimal_literals_are_typed() {
    assert_eq!(
        parse("42").unwrap(),
        Expr::Literal(Literal::Number(Numeric::Integer(42)))
    );
    assert_eq!(
        parse("4.25").unwrap(),
        Expr::Literal(Literal::Number(Numeric::Double(4.25)))
    );
}

#[rstest]
fn operator_names_need_an_operand_before_them() {
    // Leading position: a name test for an element called "div".
    let expr = parse("div").unwrap();
    let s = steps(&expr);
    assert_eq!(
        s[0].test,
        NodeTest::Name {
            prefix: None,
            local: "div".to_string()
        }
    );
    // Operand position: the operator.
    let expr = parse("6 div 2").unwrap();
    assert!(matches!(
        expr,
        Expr::Binary {
            op: BinaryOp::Div,
            ..
        }
    ));
}

#[rstest]
fn union_of_paths() {
    let expr = parse("a | b | c").unwrap();
    // Left-associative: (a | b) | c
    let Expr::Union(lhs, _) = &expr else {
        panic!("not a union");
    };
    assert!(matches!(**lhs, Expr::Union(..)));
}

#[rstest]
fn filter_expression_with_trailing_steps() {
    let expr = parse("$items[1]/name").unwrap();
    let Expr::Path { start, steps } = &expr else {
        panic!("not a path");
    };
    assert!(matches!(start, PathStart::Expr(_)));
    assert_eq!(steps.len(), 1);
}

#[rstest]
fn function_call_versus_node_type_test() {
    assert!(matches!(
        parse("count(item)").unwrap(),
        Expr::FunctionCall { .. }
    ));
    // node() is a step, not a call.
    let expr = parse("node()").unwrap();
    assert_eq!(steps(&expr)[0].test, NodeTest::AnyNode);
}

#[rstest]
fn prefixed_names_and_wildcards() {
    let expr = parse("x:item/y:*").unwrap();
    let s = steps(&expr);
    assert_eq!(
        s[0].test,
        NodeTest::Name {
            prefix: Some("x".to_string()),
            local: "item".to_string()
        }
    );
    assert_eq!(
        s[1].test,
        NodeTest::Wildcard {
            prefix: Some("y".to_string())
        }
    );
}

#[rstest]
#[case("")]
#[case("/library/")]
#[case("book[")]
#[case("book[]")]
#[case("foo(")]
#[case("'unterminated")]
#[case("!= 3")]
#[case("1 +")]
#[case("a::b")]
#[case("child::foo()")]
#[case("$")]
#[case("a b")]
fn malformed_expressions_are_syntax_errors(#[case] text: &str) {
    match parse(text) {
        Err(Error::Syntax { .. }) => {}
        other => panic!("expected a syntax error for {text:?}, got {other:?}"),
    }
}

#[rstest]
fn trailing_tokens_are_rejected() {
    assert!(matches!(parse("1 2"), Err(Error::Syntax { .. })));
}

#[rstest]
fn compile_keeps_source_and_ast() {
    let xpath = treepath::compile("//book[1]").unwrap();
    assert_eq!(xpath.as_str(), "//book[1]");
    assert_eq!(*xpath.expr(), parse("//book[1]").unwrap());
}

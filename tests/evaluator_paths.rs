use rstest::{fixture, rstest};
use treepath::simple_node::{attr, doc, elem, text};
use treepath::{ContextBuilder, EvalContext, SimpleNode, TreeNode, compile};

/// <library owner="me">
///   <book id="b1" pages="412"><title>Dune</title><author>Herbert</author></book>
///   <book id="b2" pages="482"><title>Hyperion</title><author>Simmons</author></book>
///   <magazine id="m1"><title>Wired</title></magazine>
/// </library>
#[fixture]
fn library() -> SimpleNode {
    doc()
        .child(
            elem("library")
                .attr(attr("owner", "me"))
                .child(
                    elem("book")
                        .attr(attr("id", "b1"))
                        .attr(attr("pages", "412"))
                        .child(elem("title").child(text("Dune")))
                        .child(elem("author").child(text("Herbert"))),
                )
                .child(
                    elem("book")
                        .attr(attr("id", "b2"))
                        .attr(attr("pages", "482"))
                        .child(elem("title").child(text("Hyperion")))
                        .child(elem("author").child(text("Simmons"))),
                )
                .child(
                    elem("magazine")
                        .attr(attr("id", "m1"))
                        .child(elem("title").child(text("Wired"))),
                ),
        )
        .build()
}

fn ctx_on(node: SimpleNode) -> EvalContext<SimpleNode> {
    ContextBuilder::new().with_node(node).build()
}

fn select(document: &SimpleNode, expr: &str) -> Vec<SimpleNode> {
    compile(expr)
        .expect("compiles")
        .select_nodes(&ctx_on(document.clone()))
        .expect("evaluates")
}

#[rstest]
#[case("/library/book", 2)]
#[case("/library/*", 3)]
#[case("//book", 2)]
#[case("//title", 3)]
#[case("//@id", 3)]
#[case("/library/book/title", 2)]
#[case("//book/../magazine", 1)]
#[case("//text()", 5)]
#[case("/library/book[1]", 1)]
#[case("//book[@id='missing']", 0)]
fn path_cardinality(library: SimpleNode, #[case] expr: &str, #[case] expected: usize) {
    assert_eq!(select(&library, expr).len(), expected, "{expr}");
}

#[rstest]
fn absolute_path_ignores_context_depth(library: SimpleNode) {
    let title = select(&library, "//book[1]/title")[0].clone();
    let from_title = compile("/library/magazine")
        .unwrap()
        .select_nodes(&ctx_on(title))
        .unwrap();
    assert_eq!(from_title.len(), 1);
}

#[rstest]
fn numeric_predicate_selects_by_position(library: SimpleNode) {
    let books = select(&library, "/library/book[2]");
    assert_eq!(books.len(), 1);
    let id = books[0].attributes()[0].string_value();
    assert_eq!(id, "b2");
}

#[rstest]
fn predicates_apply_in_declaration_order(library: SimpleNode) {
    // [position() < 3] keeps both books, [2] then picks the second of those.
    let books = select(&library, "/library/book[position() < 3][2]");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].attributes()[0].string_value(), "b2");
}

#[rstest]
fn reverse_axis_counts_from_context_outward(library: SimpleNode) {
    let title = select(&library, "//book[2]/title")[0].clone();
    // The nearest ancestor element is the book, not the library.
    let first_ancestor = compile("ancestor::*[1]")
        .unwrap()
        .select_nodes(&ctx_on(title.clone()))
        .unwrap();
    assert_eq!(first_ancestor.len(), 1);
    assert_eq!(first_ancestor[0].name().unwrap().local, "book");

    let second_ancestor = compile("ancestor::*[2]")
        .unwrap()
        .select_nodes(&ctx_on(title))
        .unwrap();
    assert_eq!(second_ancestor[0].name().unwrap().local, "library");
}

#[rstest]
fn preceding_sibling_nearest_first(library: SimpleNode) {
    let magazine = select(&library, "/library/magazine")[0].clone();
    let nearest = compile("preceding-sibling::book[1]")
        .unwrap()
        .select_nodes(&ctx_on(magazine))
        .unwrap();
    assert_eq!(nearest.len(), 1);
    assert_eq!(nearest[0].attributes()[0].string_value(), "b2");
}

#[rstest]
fn following_axis_excludes_descendants(library: SimpleNode) {
    let first_book = select(&library, "/library/book[1]")[0].clone();
    let following = compile("following::title")
        .unwrap()
        .select_nodes(&ctx_on(first_book))
        .unwrap();
    // Titles of book 2 and the magazine; book 1's own title is a descendant.
    assert_eq!(following.len(), 2);
    assert_eq!(following[0].string_value(), "Hyperion");
    assert_eq!(following[1].string_value(), "Wired");
}

#[rstest]
fn union_dedups_and_orders_by_document(library: SimpleNode) {
    let nodes = select(&library, "/library/book[2] | /library/book[1] | /library/book[1]");
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].attributes()[0].string_value(), "b1");
    assert_eq!(nodes[1].attributes()[0].string_value(), "b2");
}

#[rstest]
fn attribute_step_string_value(library: SimpleNode) {
    let lib = select(&library, "/library")[0].clone();
    let owner = compile("@owner").unwrap().evaluate_on(lib).unwrap();
    assert_eq!(owner.string_value(), "me");
}

#[rstest]
fn select_node_takes_the_first_in_document_order(library: SimpleNode) {
    let first = compile("//title")
        .unwrap()
        .select_node(&ctx_on(library.clone()))
        .unwrap()
        .expect("at least one title");
    assert_eq!(first.string_value(), "Dune");
    let none = compile("//missing")
        .unwrap()
        .select_node(&ctx_on(library))
        .unwrap();
    assert!(none.is_none());
}

#[rstest]
fn variable_node_set_in_path(library: SimpleNode) {
    let books = select(&library, "/library/book");
    let ctx = ContextBuilder::new()
        .with_node(library)
        .with_variable(
            treepath::ExpandedName::local("books"),
            treepath::Value::NodeSet(books),
        )
        .build();
    let titles = compile("$books/title").unwrap().select_nodes(&ctx).unwrap();
    assert_eq!(titles.len(), 2);
    let second = compile("$books[2]").unwrap().select_nodes(&ctx).unwrap();
    assert_eq!(second[0].attributes()[0].string_value(), "b2");
}

#[rstest]
fn evaluating_twice_yields_identical_values(library: SimpleNode) {
    let xpath = compile("//book[@pages > 450]/title").unwrap();
    let ctx = ctx_on(library);
    let first = xpath.evaluate(&ctx).unwrap();
    let second = xpath.evaluate(&ctx).unwrap();
    assert_eq!(first, second);
}

#[rstest]
fn relative_path_without_context_node_fails(library: SimpleNode) {
    let _ = library;
    let ctx: EvalContext<SimpleNode> = ContextBuilder::new().build();
    assert!(compile("book").unwrap().evaluate(&ctx).is_err());
}

use std::sync::Arc;

use nodal_core::{Context, ErrorKind, Expression, Loader, Match, Node, ResultType, Value};
use rstest::{fixture, rstest};

#[fixture]
fn ctx() -> Context {
    Loader::discover().create_context(None).expect("context")
}

/// ```text
/// root
///   a:1
///     x:10
///     y:20
///   b:2
///     x:11
///   c:3
/// ```
#[fixture]
fn tree() -> Node {
    Node::new("root")
        .with_child(
            Node::with_value("a", 1)
                .with_child(Node::with_value("x", 10))
                .with_child(Node::with_value("y", 20)),
        )
        .with_child(Node::with_value("b", 2).with_child(Node::with_value("x", 11)))
        .with_child(Node::with_value("c", 3))
}

fn eval(ctx: &Context, source: &str, node: &Node) -> Match {
    Expression::compile(source).expect("compiles").evaluate(ctx, node, None).expect("evaluates")
}

fn names(ctx: &Context, source: &str, node: &Node) -> Vec<String> {
    eval(ctx, source, node).names()
}

#[rstest]
fn value_and_count_of_a_single_child(ctx: Context) {
    let t = Node::new("T").with_child(Node::with_value("x", 1));
    let values = eval(&ctx, "/x?value", &t);
    assert_eq!(values.len(), 1);
    assert_eq!(values.values(), [Value::Int(1)]);

    let count = eval(&ctx, "/x?count", &t);
    assert_eq!(count.len(), 1);
    assert_eq!(count.result_type(), ResultType::Count);
    assert_eq!(count.values(), [Value::Int(1)]);
}

#[rstest]
fn abc_scenario(ctx: Context) {
    let root = Node::new("root")
        .with_child(Node::with_value("a", "1"))
        .with_child(Node::with_value("b", "2"))
        .with_child(Node::with_value("c", "3"));
    assert_eq!(names(&ctx, "*?name", &root), ["a", "b", "c"]);
    assert_eq!(eval(&ctx, "*?value.int", &root).values(), [
        Value::Int(1),
        Value::Int(2),
        Value::Int(3)
    ]);
    assert_eq!(names(&ctx, "[0,1]?node", &root), ["a"]);
}

#[rstest]
#[case("/a/x?name", &["x"])]
#[case("*/x?name", &["x", "x"])]
#[case("**?name", &["a", "x", "y", "b", "x", "c"])]
#[case("/a/x/.?name", &["a"])]
#[case("/a/x/..?name", &["root"])]
#[case("/a/x/..a?name", &["a"])]
#[case("/b/x/..a?name", &[])]
#[case("/b/++?name", &["a"])]
#[case("/b/--?name", &["c"])]
#[case("/a/++?name", &[])]
#[case("/a/+2?name", &["c"])]
#[case("/c/-2?name", &["a"])]
#[case("/b/<?name", &["y"])]
#[case("/a/>?name", &["x"])]
#[case("/1?name", &["b"])]
#[case("/[1,]?name", &["b", "c"])]
#[case("/[2,]?name", &["c"])]
#[case("/[,1]?name", &["a"])]
#[case("*/%2?name", &["a", "c"])]
#[case("*/=2?name", &["b"])]
#[case("*/=:int:3?name", &["c"])]
#[case("*/=:regex:[12]?name", &["a", "b"])]
#[case("/:regex:[ab]?name", &["a", "b"])]
#[case("/\"a\"/y?name", &["y"])]
#[case("**/$?name", &["a", "x", "y", "b", "c"])]
#[case("/a(/y|/x)?name", &["y", "x"])]
fn iterators(ctx: Context, tree: Node, #[case] source: &str, #[case] expected: &[&str]) {
    assert_eq!(names(&ctx, source, &tree), expected, "{source}");
}

#[rstest]
fn elder_relative_scans_backwards(ctx: Context, tree: Node) {
    assert_eq!(eval(&ctx, "/c/@x?value", &tree).values(), [Value::Int(11)]);
}

#[rstest]
fn distinct_values_keep_first(ctx: Context) {
    let root = Node::new("root")
        .with_child(Node::with_value("p", 1))
        .with_child(Node::with_value("q", 1))
        .with_child(Node::with_value("r", 2));
    assert_eq!(names(&ctx, "*/=$?name", &root), ["p", "r"]);
}

#[rstest]
fn distinct_values_follow_value_equality(ctx: Context) {
    let root = Node::new("root")
        .with_child(Node::with_value("zero", 0.0))
        .with_child(Node::with_value("negative-zero", -0.0))
        .with_child(Node::with_value("nan", f64::NAN))
        .with_child(Node::with_value("nan-again", f64::NAN))
        .with_child(Node::with_value("int", 0))
        .with_child(Node::with_value("text", "0"));
    assert_eq!(names(&ctx, "*/=$?name", &root), ["zero", "nan", "nan-again", "int", "text"]);
}

#[rstest]
fn distinct_values_scale_to_large_sets(ctx: Context) {
    let root = Node::new("root");
    for index in 0..5_000_i64 {
        root.add_new("n", index % 7);
    }
    assert_eq!(eval(&ctx, "*/=$?count", &root).count(), 7);
}

#[rstest]
fn duplicates_collapse(ctx: Context, tree: Node) {
    // Both x nodes share the root.
    assert_eq!(names(&ctx, "*/x/../..?name", &tree), ["root"]);
}

#[fixture]
fn numbered() -> Node {
    Node::new("root")
        .with_child(Node::new("n1"))
        .with_child(Node::new("n2"))
        .with_child(Node::new("n3"))
}

#[rstest]
#[case("|", &["n1", "n2", "n3"])]
#[case("&", &["n2"])]
#[case("^", &["n1", "n3"])]
#[case("!", &["n1"])]
fn set_algebra(ctx: Context, numbered: Node, #[case] op: &str, #[case] expected: &[&str]) {
    let source = format!("(/n1|/n2){op}(/n2|/n3)?name");
    assert_eq!(names(&ctx, &source, &numbered), expected);
}

#[rstest]
fn logical_chains_are_anchored_at_the_group_input(ctx: Context, tree: Node) {
    assert_eq!(names(&ctx, "/a/x|/b/x?value", &tree), ["x", "x"]);
    assert_eq!(eval(&ctx, "/a/x|/b/x?value", &tree).values(), [Value::Int(10), Value::Int(11)]);
    assert_eq!(names(&ctx, "/a(/x|/y)!/a/y?name", &tree), ["x"]);
}

#[rstest]
#[case("/[2,1]")]
#[case("/[a,b]")]
#[case("/%x")]
#[case("/a)")]
#[case("/(a")]
#[case("/a?unknown")]
#[case("/a?value/b")]
#[case("/a|")]
fn syntax_errors_carry_the_expression(#[case] source: &str) {
    let error = Expression::compile(source).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Syntax);
    assert!(error.to_string().contains(source), "{error}");
}

#[rstest]
fn reference_flag_evaluates_expression_values(ctx: Context, tree: Node) {
    let inner = Expression::compile("../a/x?value").expect("compiles");
    tree.add_new("ref", Value::Expression(Arc::new(inner)));

    let plain = eval(&ctx, "/ref?value", &tree);
    assert!(matches!(plain.values()[0], Value::Expression(_)));

    let referenced = eval(&ctx, "@/ref?value", &tree);
    assert_eq!(referenced.values(), [Value::Int(10)]);
}

#[rstest]
fn referenced_values_take_the_outer_conversion(ctx: Context, tree: Node) {
    tree.add_new("label", "5");
    let inner = Expression::compile("../label?value").expect("compiles");
    tree.add_new("ref", Value::Expression(Arc::new(inner)));

    assert_eq!(eval(&ctx, "@/ref?value", &tree).values(), [Value::from("5")]);
    assert_eq!(eval(&ctx, "@/ref?value.int", &tree).values(), [Value::Int(5)]);
}

#[rstest]
fn hash_follows_node_values(ctx: Context, tree: Node) {
    let b = tree.child(1).expect("b");
    tree.add_new("link", b);
    tree.add_new("text-link", "../c");
    assert_eq!(eval(&ctx, "/link/#/x?value", &tree).values(), [Value::Int(11)]);
    assert_eq!(names(&ctx, "/text-link/#?name", &tree), ["c"]);
}

#[rstest]
fn placeholder_arguments_may_be_expressions(ctx: Context, tree: Node) {
    let holder = Node::new("holder");
    let argument = Expression::compile("/a/y?name").expect("compiles");
    holder.add_new("", Value::Expression(Arc::new(argument)));
    let expression = Expression::compile("/a/{0}?value").expect("compiles");
    assert!(expression.is_formatted());
    let matched = expression.evaluate(&ctx, &tree, Some(&holder)).expect("evaluates");
    assert_eq!(matched.values(), [Value::Int(20)]);
}

#[rstest]
fn entities_write_through(ctx: Context, tree: Node) {
    let matched = eval(&ctx, "*/x?value", &tree);
    for entity in &matched {
        entity.set_value(0).expect("write");
    }
    assert_eq!(eval(&ctx, "*/x?value", &tree).values(), [Value::Int(0), Value::Int(0)]);
    assert_eq!(matched.get(0).and_then(|e| e.index()), Some(0));
}

#[rstest]
fn get_ex_evaluates_expression_values(ctx: Context, tree: Node) {
    let holder = tree.add_new("sum", Value::Expression(Arc::new(
        Expression::compile("../b?value").expect("compiles"),
    )));
    assert_eq!(holder.get_ex(&ctx, 0i64).expect("get"), 2);
    assert_eq!(tree.child(0).expect("a").get_ex(&ctx, 0i64).expect("get"), 1);
}

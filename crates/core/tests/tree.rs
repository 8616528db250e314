use std::cmp::Ordering;

use nodal_core::{ErrorKind, Node, Value};
use rstest::{fixture, rstest};

#[fixture]
fn abc() -> Node {
    Node::new("root")
        .with_child(Node::with_value("a", 1))
        .with_child(Node::with_value("b", 2))
        .with_child(Node::with_value("c", 3))
}

fn names(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(Node::name).collect()
}

#[rstest]
fn added_node_is_linked_exactly_once(abc: Node) {
    let n = Node::new("n");
    abc.add(n.clone()).expect("add");
    assert_eq!(n.parent(), Some(abc.clone()));
    assert_eq!(abc.children().iter().filter(|child| **child == n).count(), 1);

    n.untie();
    assert!(n.parent().is_none());
    assert!(!abc.children().contains(&n));
}

#[rstest]
fn adding_moves_between_parents(abc: Node) {
    let other = Node::new("other");
    let a = abc.first_child().expect("a");
    other.add(a.clone()).expect("add");
    assert_eq!(names(&abc.children()), ["b", "c"]);
    assert_eq!(a.parent(), Some(other));
}

#[rstest]
fn insert_range_keeps_order(abc: Node) {
    abc.insert_range(1, [Node::new("x"), Node::new("y")]).expect("insert");
    assert_eq!(names(&abc.children()), ["a", "x", "y", "b", "c"]);
    assert_eq!(abc.insert(9, Node::new("z")).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[rstest]
fn rejected_move_within_parent_keeps_the_child(abc: Node) {
    let a = abc.first_child().expect("a");
    assert_eq!(abc.insert(3, a.clone()).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(names(&abc.children()), ["a", "b", "c"]);
    assert_eq!(a.parent(), Some(abc.clone()));

    abc.insert(2, a.clone()).expect("move to the end");
    assert_eq!(names(&abc.children()), ["b", "c", "a"]);
}

#[rstest]
fn rejected_insert_leaves_the_old_parent_alone(abc: Node) {
    let other = Node::new("other").with_child(Node::new("x"));
    let x = other.first_child().expect("x");
    assert!(abc.insert(99, x.clone()).is_err());
    assert_eq!(other.count(), 1);
    assert_eq!(x.parent(), Some(other.clone()));

    assert!(abc.insert_range(99, [x.clone(), Node::new("y")]).is_err());
    assert_eq!(other.count(), 1);
    assert_eq!(abc.count(), 3);
}

#[rstest]
fn insert_range_moves_children_as_a_block(abc: Node) {
    let [a, b] = [abc.child(0).expect("a"), abc.child(1).expect("b")];
    abc.insert_range(1, [a, b]).expect("move");
    assert_eq!(names(&abc.children()), ["c", "a", "b"]);
}

#[rstest]
fn cycles_are_rejected(abc: Node) {
    let a = abc.first_child().expect("a");
    let error = a.add(abc.clone()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    assert_eq!(abc.add(abc.clone()).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[rstest]
fn removing_a_stranger_fails(abc: Node) {
    let stranger = Node::new("a");
    assert_eq!(abc.remove(&stranger).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(abc.count(), 3);
}

#[rstest]
fn replace_returns_the_replacement(abc: Node) {
    let b = abc.child(1).expect("b");
    let replaced = b.replace(Node::with_value("B", 20)).expect("replace");
    assert_eq!(replaced.name(), "B");
    assert_eq!(replaced.index(), Some(1));
    assert!(b.parent().is_none());
    assert_eq!(names(&abc.children()), ["a", "B", "c"]);
}

#[rstest]
fn clone_is_independent_but_equal(abc: Node) {
    let copy = abc.deep_clone();
    assert_ne!(copy, abc);
    assert_eq!(copy.compare_to(&abc), Ordering::Equal);

    copy.first_child().expect("a").untie();
    copy.add_new("d", 4);
    assert_eq!(names(&abc.children()), ["a", "b", "c"]);
    assert_ne!(copy.compare_to(&abc), Ordering::Equal);
}

#[rstest]
fn comparison_is_antisymmetric(abc: Node) {
    assert_eq!(abc.compare_to(&abc), Ordering::Equal);
    let other = abc.deep_clone();
    other.child(2).expect("c").set_value(4);
    assert_eq!(abc.compare_to(&other), Ordering::Less);
    assert_eq!(other.compare_to(&abc), Ordering::Greater);
}

#[rstest]
fn find_or_insert_materializes_once(abc: Node) {
    let settings = abc.find_or_insert("settings");
    assert_eq!(abc.find_or_insert("settings"), settings);
    assert_eq!(abc.count(), 4);
    let first = abc.find_or_insert_at("first", 0);
    assert_eq!(first.index(), Some(0));
}

#[rstest]
fn dna_round_trips(abc: Node) {
    let deep = abc.child(1).expect("b").add_new("deep", Value::Null);
    assert_eq!(deep.dna(), "1-0");
    assert_eq!(abc.find_dna("1-0").expect("dna"), Some(deep));
    assert_eq!(abc.find_dna("5").expect("dna"), None);
    assert!(abc.find_dna("x-1").is_err());
}

#[rstest]
fn document_order_navigation(abc: Node) {
    let a = abc.first_child().expect("a");
    let inner = a.add_new("inner", Value::Null);
    let b = abc.child(1).expect("b");
    assert_eq!(b.previous_node(), Some(inner.clone()));
    assert_eq!(inner.next_node(), Some(b.clone()));
    assert_eq!(a.next_node(), Some(inner));
    assert_eq!(names(&abc.descendants()), ["a", "inner", "b", "c"]);
}

#[rstest]
fn sort_reorders_children(abc: Node) {
    abc.sort_by(|x, y| y.name().cmp(&x.name()));
    assert_eq!(names(&abc.children()), ["c", "b", "a"]);
}

#[rstest]
fn display_lists_the_subtree(abc: Node) {
    assert_eq!(abc.to_string(), "root\n  a:1\n  b:2\n  c:3\n");
}

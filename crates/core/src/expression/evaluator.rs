//! Group evaluation and the set algebra behind `|`, `&`, `^` and `!`.

use std::collections::HashSet;

use tracing::trace;

use super::compiler::{Group, LogicalOp, Program, Step};
use super::iterators;
use super::matches::{Conversion, Match, MatchEntity, ResultType};
use crate::dispatch::Context;
use crate::error::Result;
use crate::node::Node;
use crate::value::Value;

pub(crate) fn run(ctx: &Context, program: &Program, data_source: &Node) -> Result<Match> {
    let nodes = evaluate_group(ctx, &program.root, vec![data_source.clone()])?;
    trace!(matched = nodes.len(), result_type = %program.result_type, "expression evaluated");

    let result_type = program.result_type;
    if result_type == ResultType::Count {
        return Ok(Match::new(vec![MatchEntity::count(nodes.len())], result_type));
    }

    let conversion = program.convert.as_deref().map(|alias| Conversion::new(ctx, alias));
    let mut entities = Vec::with_capacity(nodes.len());
    for node in nodes {
        if program.reference
            && result_type == ResultType::Value
            && let Value::Expression(inner) = node.value()
        {
            let spliced = inner.evaluate(ctx, &node, Some(&node))?;
            entities.extend(
                spliced.into_iter().map(|entity| entity.then_convert(conversion.as_ref())),
            );
            continue;
        }
        entities.push(MatchEntity::for_node(node, result_type, conversion.clone()));
    }
    Ok(Match::new(entities, result_type))
}

/// Runs the group's chain, then each logical chain anchored at the same input, folding the
/// results left to right.
pub(crate) fn evaluate_group(ctx: &Context, group: &Group, input: Vec<Node>) -> Result<Vec<Node>> {
    let mut result = run_chain(ctx, &group.chain, input.clone())?;
    for logical in &group.logicals {
        let rhs = run_chain(ctx, &logical.chain, input.clone())?;
        result = combine(logical.op, result, rhs);
    }
    Ok(result)
}

fn run_chain(ctx: &Context, chain: &[Step], input: Vec<Node>) -> Result<Vec<Node>> {
    let mut current = input;
    for step in chain {
        if current.is_empty() {
            break;
        }
        current = iterators::apply(ctx, step, current)?;
    }
    Ok(current)
}

pub(crate) fn combine(op: LogicalOp, lhs: Vec<Node>, rhs: Vec<Node>) -> Vec<Node> {
    match op {
        LogicalOp::Or => union(lhs, rhs),
        LogicalOp::And => intersect(lhs, &rhs),
        LogicalOp::Xor => symmetric_difference(lhs, rhs),
        LogicalOp::Not => except(lhs, &rhs),
    }
}

/// `lhs` followed by the `rhs` entries not in `lhs`.
fn union(mut lhs: Vec<Node>, rhs: Vec<Node>) -> Vec<Node> {
    let mut seen: HashSet<Node> = lhs.iter().cloned().collect();
    lhs.extend(rhs.into_iter().filter(|node| seen.insert(node.clone())));
    lhs
}

fn intersect(lhs: Vec<Node>, rhs: &[Node]) -> Vec<Node> {
    let keep: HashSet<&Node> = rhs.iter().collect();
    lhs.into_iter().filter(|node| keep.contains(node)).collect()
}

/// `lhs` entries not in `rhs`, followed by `rhs` entries not in `lhs`.
fn symmetric_difference(lhs: Vec<Node>, rhs: Vec<Node>) -> Vec<Node> {
    let left: HashSet<Node> = lhs.iter().cloned().collect();
    let right: HashSet<Node> = rhs.iter().cloned().collect();
    lhs.into_iter()
        .filter(|node| !right.contains(node))
        .chain(rhs.into_iter().filter(|node| !left.contains(node)))
        .collect()
}

fn except(lhs: Vec<Node>, rhs: &[Node]) -> Vec<Node> {
    let drop: HashSet<&Node> = rhs.iter().collect();
    lhs.into_iter().filter(|node| !drop.contains(node)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn nodes() -> [Node; 3] {
        [Node::new("n1"), Node::new("n2"), Node::new("n3")]
    }

    fn names(nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(Node::name).collect()
    }

    #[rstest]
    #[case(LogicalOp::Or, &["n1", "n2", "n3"])]
    #[case(LogicalOp::And, &["n2"])]
    #[case(LogicalOp::Xor, &["n1", "n3"])]
    #[case(LogicalOp::Not, &["n1"])]
    fn set_algebra(nodes: [Node; 3], #[case] op: LogicalOp, #[case] expected: &[&str]) {
        let [n1, n2, n3] = nodes;
        let lhs = vec![n1, n2.clone()];
        let rhs = vec![n2, n3];
        assert_eq!(names(&combine(op, lhs, rhs)), expected);
    }

    #[rstest]
    fn membership_is_by_identity() {
        let a = Node::new("same");
        let b = Node::new("same");
        assert_eq!(combine(LogicalOp::And, vec![a], vec![b]).len(), 0);
    }

    #[rstest]
    fn union_keeps_lhs_order_then_new_rhs(nodes: [Node; 3]) {
        let [n1, n2, n3] = nodes;
        let result = combine(LogicalOp::Or, vec![n2.clone(), n1.clone()], vec![n3, n1, n2]);
        assert_eq!(names(&result), ["n2", "n1", "n3"]);
    }
}

//! Single iterator steps. Each step maps an ordered node set to an ordered node set without
//! duplicates.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use super::compiler::Step;
use super::evaluator;
use crate::convert;
use crate::dispatch::Context;
use crate::error::Result;
use crate::node::Node;
use crate::value::{Value, type_names};

/// Ordered set of nodes, by identity.
struct Output {
    seen: HashSet<Node>,
    nodes: Vec<Node>,
}

impl Output {
    fn with_capacity(capacity: usize) -> Self {
        Self { seen: HashSet::with_capacity(capacity), nodes: Vec::with_capacity(capacity) }
    }

    fn push(&mut self, node: Node) {
        if self.seen.insert(node.clone()) {
            self.nodes.push(node);
        }
    }

    fn push_opt(&mut self, node: Option<Node>) {
        if let Some(node) = node {
            self.push(node);
        }
    }

    fn extend(&mut self, nodes: impl IntoIterator<Item = Node>) {
        for node in nodes {
            self.push(node);
        }
    }
}

/// Hashable projection of a value with the same equality as `Value`'s `PartialEq`. NaN has
/// no key, so every NaN-valued node is kept.
#[derive(PartialEq, Eq, Hash)]
enum DistinctKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Blob(Arc<[u8]>),
    DateTime(DateTime<FixedOffset>),
    Node(Node),
    Nodes(Vec<Node>),
    Expression(String),
    Opaque(usize),
}

impl DistinctKey {
    fn of(value: Value) -> Option<Self> {
        Some(match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Int(int) => Self::Int(int),
            Value::Float(float) if float.is_nan() => return None,
            // -0.0 == 0.0
            Value::Float(float) => Self::Float((float + 0.0).to_bits()),
            Value::String(text) => Self::String(text),
            Value::Blob(bytes) => Self::Blob(bytes),
            Value::DateTime(date) => Self::DateTime(date),
            Value::Node(node) => Self::Node(node),
            Value::Nodes(nodes) => Self::Nodes(nodes),
            Value::Expression(expression) => Self::Expression(expression.source().to_owned()),
            Value::Opaque(payload) => {
                Self::Opaque(Arc::as_ptr(&payload).cast::<()>() as usize)
            }
        })
    }
}

pub(crate) fn apply(ctx: &Context, step: &Step, input: Vec<Node>) -> Result<Vec<Node>> {
    if let Step::Group(group) = step {
        return evaluator::evaluate_group(ctx, group, input);
    }

    let mut out = Output::with_capacity(input.len());
    match step {
        Step::Root => input.iter().for_each(|node| out.push(node.root())),
        Step::Children => input.iter().for_each(|node| out.extend(node.children())),
        Step::Descendants => input.iter().for_each(|node| out.extend(node.descendants())),
        Step::Parent => input.iter().for_each(|node| out.push_opt(node.parent())),
        Step::Reference => {
            for node in &input {
                dereference(ctx, node, &mut out)?;
            }
        }
        Step::PreviousNode => input.iter().for_each(|node| out.push_opt(node.previous_node())),
        Step::NextNode => input.iter().for_each(|node| out.push_opt(node.next_node())),
        Step::OlderSibling => input.iter().for_each(|node| out.push_opt(node.previous_sibling())),
        Step::YoungerSibling => input.iter().for_each(|node| out.push_opt(node.next_sibling())),
        Step::DistinctValues => {
            let mut values = HashSet::new();
            for node in input {
                let duplicate = DistinctKey::of(node.value()).is_some_and(|key| !values.insert(key));
                if !duplicate {
                    out.push(node);
                }
            }
        }
        Step::DistinctNames => {
            let mut names = HashSet::new();
            for node in input {
                if names.insert(node.name()) {
                    out.push(node);
                }
            }
        }
        Step::Range { start, end } => {
            for node in &input {
                let children = node.children();
                let from = start.unwrap_or(0);
                let to = end.unwrap_or(children.len()).min(children.len());
                if from < to {
                    out.extend(children[from..to].iter().cloned());
                }
            }
        }
        Step::Modulo(n) => out.extend(
            input.into_iter().enumerate().filter(|(index, _)| index % n == 0).map(|(_, node)| node),
        ),
        Step::SiblingOffset(offset) => {
            input.iter().for_each(|node| out.push_opt(sibling_at(node, *offset)));
        }
        Step::ElderRelative(name) => {
            for node in &input {
                let mut current = node.previous_node();
                while let Some(candidate) = current {
                    if candidate.has_name(name) {
                        out.push(candidate);
                        break;
                    }
                    current = candidate.previous_node();
                }
            }
        }
        Step::NamedAncestor(name) => {
            for node in &input {
                let mut current = node.parent();
                while let Some(candidate) = current {
                    if candidate.has_name(name) {
                        out.push(candidate);
                        break;
                    }
                    current = candidate.parent();
                }
            }
        }
        Step::Named(name) => input.iter().for_each(|node| out.extend(node.children_named(name))),
        Step::NamedRegex(regex) => {
            for node in &input {
                out.extend(
                    node.children()
                        .into_iter()
                        .filter(|child| regex.is_match(&child.name()).unwrap_or(false)),
                );
            }
        }
        Step::ValueEquals(text) => out.extend(
            input.into_iter().filter(|node| convert::to_string(ctx, &node.value()) == *text),
        ),
        Step::TypedValue { alias, literal } => {
            let expected = convert::convert_alias(ctx, &Value::from(literal.as_str()), alias);
            if !expected.is_null() {
                out.extend(input.into_iter().filter(|node| {
                    convert::convert_alias(ctx, &node.value(), alias) == expected
                }));
            }
        }
        Step::ValueRegex(regex) => out.extend(input.into_iter().filter(|node| {
            regex.is_match(&convert::to_string(ctx, &node.value())).unwrap_or(false)
        })),
        Step::Numbered(index) => input.iter().for_each(|node| out.push_opt(node.child(*index))),
        Step::Group(_) => {}
    }
    Ok(out.nodes)
}

fn sibling_at(node: &Node, offset: i64) -> Option<Node> {
    let parent = node.parent()?;
    let index = i64::try_from(node.index()?).ok()?.checked_add(offset)?;
    parent.child(usize::try_from(index).ok()?)
}

/// Follows a node's value: node and node-list values directly, expressions (or text that
/// converts to one) by evaluating them against the node.
fn dereference(ctx: &Context, node: &Node, out: &mut Output) -> Result<()> {
    let value = match node.value() {
        Value::String(text) => {
            convert::convert_alias(ctx, &Value::String(text), type_names::EXPRESSION)
        }
        other => other,
    };
    match value {
        Value::Node(target) => out.push(target),
        Value::Nodes(targets) => out.extend(targets),
        Value::Expression(expression) => {
            out.extend(expression.evaluate(ctx, node, Some(node))?.nodes());
        }
        _ => {}
    }
    Ok(())
}

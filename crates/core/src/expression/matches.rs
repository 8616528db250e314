use std::fmt;
use std::sync::Arc;

use crate::convert;
use crate::dispatch::Context;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::value::Value;

/// Facet of the matched nodes an expression yields, selected with `?name`, `?value`,
/// `?node` or `?count`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResultType {
    Name,
    Value,
    #[default]
    Node,
    Count,
}

impl ResultType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultType::Name => "name",
            ResultType::Value => "value",
            ResultType::Node => "node",
            ResultType::Count => "count",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a `.converttype` suffix.
#[derive(Debug)]
pub(crate) struct Conversion {
    ctx: Context,
    alias: String,
}

impl Conversion {
    pub(crate) fn new(ctx: &Context, alias: &str) -> Arc<Self> {
        Arc::new(Self { ctx: ctx.clone(), alias: alias.to_owned() })
    }
}

#[derive(Clone, Debug)]
enum Source {
    Node(Node),
    Count(usize),
}

/// One result of an evaluated expression.
///
/// Names and values are read from the node on every access, so they reflect later changes to
/// the tree.
#[derive(Clone, Debug)]
pub struct MatchEntity {
    source: Source,
    result_type: ResultType,
    /// Applied in order; spliced reference results carry the outer expression's conversion
    /// after their own.
    conversions: Vec<Arc<Conversion>>,
}

impl MatchEntity {
    pub(crate) fn for_node(
        node: Node,
        result_type: ResultType,
        conversion: Option<Arc<Conversion>>,
    ) -> Self {
        Self { source: Source::Node(node), result_type, conversions: conversion.into_iter().collect() }
    }

    pub(crate) fn count(count: usize) -> Self {
        Self { source: Source::Count(count), result_type: ResultType::Count, conversions: Vec::new() }
    }

    /// Adds a conversion applied after the entity's own.
    pub(crate) fn then_convert(mut self, conversion: Option<&Arc<Conversion>>) -> Self {
        self.conversions.extend(conversion.cloned());
        self
    }

    /// The matched node; `None` for a count.
    pub fn node(&self) -> Option<&Node> {
        match &self.source {
            Source::Node(node) => Some(node),
            Source::Count(_) => None,
        }
    }

    /// Position of the matched node within its parent.
    pub fn index(&self) -> Option<usize> {
        self.node().and_then(Node::index)
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    pub fn name(&self) -> Option<String> {
        self.node().map(Node::name)
    }

    /// The facet selected by the result type, converted if the expression asked for it.
    pub fn value(&self) -> Value {
        match &self.source {
            Source::Count(count) => Value::Int(i64::try_from(*count).unwrap_or(i64::MAX)),
            Source::Node(node) => match self.result_type {
                ResultType::Name => self.converted(Value::String(node.name())),
                ResultType::Node => Value::Node(node.clone()),
                ResultType::Value | ResultType::Count => self.converted(node.value()),
            },
        }
    }

    /// Writes the selected facet back into the tree. Writing a node result replaces the node
    /// in its parent.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let Source::Node(node) = &self.source else {
            return Err(Error::invalid_argument("count results cannot be written"));
        };
        let value = value.into();
        match self.result_type {
            ResultType::Name => node.set_name(match value {
                Value::String(text) => text,
                other => other.to_string(),
            }),
            ResultType::Value | ResultType::Count => node.set_value(value),
            ResultType::Node => {
                let Value::Node(replacement) = value else {
                    return Err(Error::invalid_argument(format!(
                        "node results can only be replaced by a node, got {}",
                        value.type_name()
                    )));
                };
                node.replace(replacement)?;
            }
        }
        Ok(())
    }

    fn converted(&self, value: Value) -> Value {
        self.conversions.iter().fold(value, |value, conversion| {
            convert::convert_alias(&conversion.ctx, &value, &conversion.alias)
        })
    }
}

/// Typed view over the result of [`Expression::evaluate`](super::Expression::evaluate).
#[derive(Clone, Debug, Default)]
pub struct Match {
    entities: Vec<MatchEntity>,
    result_type: ResultType,
}

impl Match {
    pub(crate) fn new(entities: Vec<MatchEntity>, result_type: ResultType) -> Self {
        Self { entities, result_type }
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MatchEntity> {
        self.entities.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchEntity> {
        self.entities.iter()
    }

    /// Number of matched nodes. For `?count` expressions, the counted size.
    pub fn count(&self) -> usize {
        match (self.result_type, self.entities.first()) {
            (ResultType::Count, Some(MatchEntity { source: Source::Count(count), .. })) => *count,
            _ => self.entities.len(),
        }
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.entities.iter().filter_map(|entity| entity.node().cloned()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entities.iter().filter_map(MatchEntity::name).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entities.iter().map(MatchEntity::value).collect()
    }
}

impl<'a> IntoIterator for &'a Match {
    type Item = &'a MatchEntity;
    type IntoIter = std::slice::Iter<'a, MatchEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

impl IntoIterator for Match {
    type Item = MatchEntity;
    type IntoIter = std::vec::IntoIter<MatchEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn values_are_read_live() {
        let node = Node::with_value("x", 1);
        let entity = MatchEntity::for_node(node.clone(), ResultType::Value, None);
        node.set_value(2);
        assert_eq!(entity.value(), Value::Int(2));
    }

    #[rstest]
    fn name_results_write_names() {
        let node = Node::new("old");
        let entity = MatchEntity::for_node(node.clone(), ResultType::Name, None);
        entity.set_value("new").unwrap();
        assert_eq!(node.name(), "new");
        assert_eq!(entity.value(), Value::from("new"));
    }

    #[rstest]
    fn node_results_replace_nodes() {
        let parent = Node::new("p").with_child(Node::new("a"));
        let a = parent.first_child().unwrap();
        let entity = MatchEntity::for_node(a.clone(), ResultType::Node, None);
        entity.set_value(Node::new("b")).unwrap();
        assert_eq!(parent.first_child().unwrap().name(), "b");
        assert!(a.parent().is_none());
        assert!(entity.set_value(3).is_err());
    }

    #[rstest]
    fn count_results_are_read_only() {
        let matched = Match::new(vec![MatchEntity::count(4)], ResultType::Count);
        assert_eq!(matched.count(), 4);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched.values(), vec![Value::Int(4)]);
        assert!(matched.get(0).unwrap().set_value(1).is_err());
    }
}

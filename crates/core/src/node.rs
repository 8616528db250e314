//! The universal tree entity.
//!
//! A [`Node`] is a cheap, reference-counted handle. Cloning the handle shares the node;
//! [`Node::deep_clone`] produces a structurally independent copy. Children are owned by their
//! parent, the parent link is a weak back-reference used only for navigation.
//!
//! ```
//! use nodal_core::Node;
//!
//! let root = Node::new("root")
//!     .with_child(Node::with_value("a", 1))
//!     .with_child(Node::with_value("b", 2));
//!
//! let b = root.find(|child| child.name() == "b").unwrap();
//! assert_eq!(b.parent(), Some(root.clone()));
//! assert_eq!(b.previous_sibling().map(|n| n.name()), Some("a".to_string()));
//!
//! b.untie();
//! assert_eq!(root.count(), 1);
//! assert!(b.parent().is_none());
//! ```
use core::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, Weak};

use crate::convert::{self, Convertible};
use crate::dispatch::Context;
use crate::error::{Error, Result};
use crate::lock::{read, write};
use crate::value::Value;

pub(crate) struct Inner {
    name: RwLock<String>,
    value: RwLock<Value>,
    parent: RwLock<Weak<Inner>>,
    children: RwLock<Vec<Node>>,
}

/// Handle to a tree node. Equality and hashing use node identity.
#[derive(Clone)]
pub struct Node(pub(crate) Arc<Inner>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &*read(&self.0.name))
            .field("value", &*read(&self.0.value))
            .field("children", &read(&self.0.children).len())
            .finish()
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new("")
    }
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_value(name, Value::Null)
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Node(Arc::new(Inner {
            name: RwLock::new(name.into()),
            value: RwLock::new(value.into()),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
        }))
    }

    pub fn with_children(
        name: impl Into<String>,
        value: impl Into<Value>,
        children: impl IntoIterator<Item = Node>,
    ) -> Result<Self> {
        let node = Self::with_value(name, value);
        node.add_range(children)?;
        Ok(node)
    }

    /// Builder-style append. A child that would create a cycle is skipped.
    #[must_use]
    pub fn with_child(self, child: Node) -> Self {
        if let Err(error) = self.add(child) {
            tracing::warn!(%error, "child not attached");
        }
        self
    }

    // ---- name / value -------------------------------------------------------------------

    pub fn name(&self) -> String {
        read(&self.0.name).clone()
    }

    pub fn has_name(&self, name: &str) -> bool {
        *read(&self.0.name) == name
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *write(&self.0.name) = name.into();
    }

    pub fn value(&self) -> Value {
        read(&self.0.value).clone()
    }

    pub fn set_value(&self, value: impl Into<Value>) {
        *write(&self.0.value) = value.into();
    }

    pub fn take_value(&self) -> Value {
        std::mem::take(&mut *write(&self.0.value))
    }

    // ---- typed access -------------------------------------------------------------------

    /// Converts the value to `T`, yielding `default` if no conversion path exists.
    pub fn get<T: Convertible>(&self, ctx: &Context, default: T) -> T {
        convert::convert(ctx, &self.value(), default)
    }

    pub fn get_child_value<T: Convertible>(&self, name: &str, ctx: &Context, default: T) -> T {
        match self.find(|child| child.has_name(name)) {
            Some(child) => child.get(ctx, default),
            None => default,
        }
    }

    /// Like [`Node::get`], but an expression value is first evaluated against this node and
    /// its first result is converted instead.
    pub fn get_ex<T: Convertible>(&self, ctx: &Context, default: T) -> Result<T> {
        let value = self.value();
        let Value::Expression(expression) = &value else {
            return Ok(convert::convert(ctx, &value, default));
        };
        let matches = expression.evaluate(ctx, self, Some(self))?;
        Ok(match matches.iter().next() {
            Some(entity) => convert::convert(ctx, &entity.value(), default),
            None => default,
        })
    }

    // ---- navigation ---------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        read(&self.0.parent).upgrade().map(Node)
    }

    /// Snapshot of the children in order.
    pub fn children(&self) -> Vec<Node> {
        read(&self.0.children).clone()
    }

    pub fn children_named(&self, name: &str) -> Vec<Node> {
        read(&self.0.children).iter().filter(|child| child.has_name(name)).cloned().collect()
    }

    pub fn count(&self) -> usize {
        read(&self.0.children).len()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        read(&self.0.children).get(index).cloned()
    }

    pub fn first_child(&self) -> Option<Node> {
        read(&self.0.children).first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        read(&self.0.children).last().cloned()
    }

    /// Position of this node within its parent's children.
    pub fn index(&self) -> Option<usize> {
        let parent = self.parent()?;
        read(&parent.0.children).iter().position(|child| child == self)
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let children = read(&parent.0.children);
        let idx = children.iter().position(|child| child == self)?;
        idx.checked_sub(1).and_then(|prev| children.get(prev).cloned())
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let children = read(&parent.0.children);
        let idx = children.iter().position(|child| child == self)?;
        children.get(idx + 1).cloned()
    }

    /// Previous node in document order: the deepest last descendant of the previous
    /// sibling, else the parent.
    pub fn previous_node(&self) -> Option<Node> {
        match self.previous_sibling() {
            Some(mut current) => {
                while let Some(last) = current.last_child() {
                    current = last;
                }
                Some(current)
            }
            None => self.parent(),
        }
    }

    /// Next node in document order: first child, else next sibling, else the nearest
    /// ancestor's next sibling.
    pub fn next_node(&self) -> Option<Node> {
        if let Some(first) = self.first_child() {
            return Some(first);
        }
        let mut current = self.clone();
        loop {
            if let Some(next) = current.next_sibling() {
                return Some(next);
            }
            current = current.parent()?;
        }
    }

    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn is_ancestor_or_self_of(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    // ---- lookup -------------------------------------------------------------------------

    pub fn find<F>(&self, predicate: F) -> Option<Node>
    where
        F: Fn(&Node) -> bool,
    {
        self.children().into_iter().find(|child| predicate(child))
    }

    /// Returns the first child named `name`, appending a new one if none exists.
    pub fn find_or_insert(&self, name: &str) -> Node {
        if let Some(found) = self.find(|child| child.has_name(name)) {
            return found;
        }
        self.add_new(name, Value::Null)
    }

    /// Returns the first child named `name`, inserting a new one at `index` (clamped to the
    /// child count) if none exists.
    pub fn find_or_insert_at(&self, name: &str, index: usize) -> Node {
        if let Some(found) = self.find(|child| child.has_name(name)) {
            return found;
        }
        let node = Node::new(name);
        let mut children = write(&self.0.children);
        *write(&node.0.parent) = Arc::downgrade(&self.0);
        let at = index.min(children.len());
        children.insert(at, node.clone());
        node
    }

    // ---- mutation -----------------------------------------------------------------------

    fn ensure_attachable(&self, child: &Node) -> Result<()> {
        if child.is_ancestor_or_self_of(self) {
            return Err(Error::invalid_argument(format!(
                "cannot attach node '{}' to itself or to one of its descendants",
                child.name()
            )));
        }
        Ok(())
    }

    fn detach(&self) {
        let parent = read(&self.0.parent).upgrade();
        if let Some(parent) = parent {
            write(&parent.children).retain(|child| !Arc::ptr_eq(&child.0, &self.0));
        }
        *write(&self.0.parent) = Weak::new();
    }

    /// Appends `child`, detaching it from any previous parent first. Returns the child.
    pub fn add(&self, child: Node) -> Result<Node> {
        self.ensure_attachable(&child)?;
        child.detach();
        *write(&child.0.parent) = Arc::downgrade(&self.0);
        write(&self.0.children).push(child.clone());
        Ok(child)
    }

    /// Creates a new child and appends it.
    pub fn add_new(&self, name: impl Into<String>, value: impl Into<Value>) -> Node {
        let child = Node::with_value(name, value);
        *write(&child.0.parent) = Arc::downgrade(&self.0);
        write(&self.0.children).push(child.clone());
        child
    }

    pub fn add_range(&self, children: impl IntoIterator<Item = Node>) -> Result<()> {
        for child in children {
            self.add(child)?;
        }
        Ok(())
    }

    /// Inserts `child` at `index`, detaching it from any previous parent first. The index
    /// counts positions after the detach, so moving a child within this node uses the shorter
    /// list. A rejected insert leaves both trees untouched.
    pub fn insert(&self, index: usize, child: Node) -> Result<Node> {
        self.ensure_attachable(&child)?;
        self.ensure_insert_index(index, std::slice::from_ref(&child))?;
        child.detach();
        *write(&child.0.parent) = Arc::downgrade(&self.0);
        write(&self.0.children).insert(index, child.clone());
        Ok(child)
    }

    pub fn insert_range(&self, index: usize, children: impl IntoIterator<Item = Node>) -> Result<()> {
        let children: Vec<Node> = children.into_iter().collect();
        for child in &children {
            self.ensure_attachable(child)?;
        }
        self.ensure_insert_index(index, &children)?;
        let mut incoming: Vec<Node> = Vec::with_capacity(children.len());
        for child in children {
            if !incoming.contains(&child) {
                child.detach();
                *write(&child.0.parent) = Arc::downgrade(&self.0);
                incoming.push(child);
            }
        }
        write(&self.0.children).splice(index..index, incoming);
        Ok(())
    }

    fn ensure_insert_index(&self, index: usize, incoming: &[Node]) -> Result<()> {
        let mut moved: Vec<&Node> = Vec::new();
        for child in incoming {
            if child.parent().as_ref() == Some(self) && !moved.contains(&child) {
                moved.push(child);
            }
        }
        let count = self.count() - moved.len();
        if index > count {
            return Err(Error::invalid_argument(format!(
                "insert index {index} out of range (count {count})"
            )));
        }
        Ok(())
    }

    /// Removes `child`, which must be one of this node's children.
    pub fn remove(&self, child: &Node) -> Result<()> {
        let mut children = write(&self.0.children);
        let Some(idx) = children.iter().position(|c| c == child) else {
            return Err(Error::invalid_argument(format!(
                "node '{}' is not a child of '{}'",
                child.name(),
                read(&self.0.name)
            )));
        };
        let removed = children.remove(idx);
        drop(children);
        *write(&removed.0.parent) = Weak::new();
        Ok(())
    }

    pub fn remove_at(&self, index: usize) -> Result<Node> {
        let mut children = write(&self.0.children);
        if index >= children.len() {
            return Err(Error::invalid_argument(format!(
                "remove index {index} out of range (count {})",
                children.len()
            )));
        }
        let removed = children.remove(index);
        drop(children);
        *write(&removed.0.parent) = Weak::new();
        Ok(removed)
    }

    /// Substitutes `self` in its parent with `replacement`, at the same index. `self`
    /// becomes parentless. Returns the replacement.
    pub fn replace(&self, replacement: Node) -> Result<Node> {
        if replacement == *self {
            return Ok(replacement);
        }
        let Some(parent) = self.parent() else {
            return Err(Error::invalid_argument(format!(
                "node '{}' has no parent to be replaced in",
                self.name()
            )));
        };
        parent.ensure_attachable(&replacement)?;
        replacement.detach();
        let mut children = write(&parent.0.children);
        let Some(idx) = children.iter().position(|child| child == self) else {
            return Err(Error::invalid_argument("node is not a member of its parent"));
        };
        *write(&replacement.0.parent) = Arc::downgrade(&parent.0);
        children[idx] = replacement.clone();
        drop(children);
        *write(&self.0.parent) = Weak::new();
        Ok(replacement)
    }

    /// Detaches this node from its parent. Returns `self` for chaining.
    pub fn untie(&self) -> Node {
        self.detach();
        self.clone()
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut *write(&self.0.children));
        for child in removed {
            *write(&child.0.parent) = Weak::new();
        }
    }

    /// Stable sort of the children.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Node, &Node) -> Ordering,
    {
        let mut snapshot = self.children();
        snapshot.sort_by(|a, b| compare(a, b));
        *write(&self.0.children) = snapshot;
    }

    // ---- copy & compare -----------------------------------------------------------------

    /// Deep copy: children are cloned recursively, the value is shared by reference. The
    /// copy has no parent.
    pub fn deep_clone(&self) -> Node {
        let copy = Node::with_value(self.name(), self.value());
        let children: Vec<Node> = self.children().iter().map(Node::deep_clone).collect();
        for child in &children {
            *write(&child.0.parent) = Arc::downgrade(&copy.0);
        }
        *write(&copy.0.children) = children;
        copy
    }

    /// Structural comparison: name, then value, then child count, then each child pair.
    pub fn compare_to(&self, other: &Node) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        let ord = self.name().cmp(&other.name());
        if ord != Ordering::Equal {
            return ord;
        }
        let ord = self.value().compare_to(&other.value());
        if ord != Ordering::Equal {
            return ord;
        }
        let lhs = self.children();
        let rhs = other.children();
        let ord = lhs.len().cmp(&rhs.len());
        if ord != Ordering::Equal {
            return ord;
        }
        lhs.iter()
            .zip(rhs.iter())
            .map(|(a, b)| a.compare_to(b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    // ---- dna ----------------------------------------------------------------------------

    /// Index path from the root, e.g. `"0-2-1"`. The root itself has an empty path.
    pub fn dna(&self) -> String {
        let mut parts = Vec::new();
        let mut current = self.clone();
        while let Some(idx) = current.index() {
            parts.push(idx.to_string());
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        parts.reverse();
        parts.join("-")
    }

    /// Resolves a path produced by [`Node::dna`] starting from this node.
    pub fn find_dna(&self, dna: &str) -> Result<Option<Node>> {
        let mut current = self.clone();
        if dna.is_empty() {
            return Ok(Some(current));
        }
        for part in dna.split('-') {
            let idx: usize = part
                .parse()
                .map_err(|_| Error::invalid_argument(format!("malformed dna path '{dna}'")))?;
            match current.child(idx) {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let value = self.value();
        if value.is_null() {
            writeln!(f, "{indent}{}", self.name())?;
        } else if matches!(value, Value::Node(_) | Value::Nodes(_)) {
            writeln!(f, "{indent}{}:{}", self.name(), value.type_name())?;
        } else {
            writeln!(f, "{indent}{}:{value}", self.name())?;
        }
        for child in self.children() {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented `name:value` listing of the node and its subtree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

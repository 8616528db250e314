use core::cmp::Ordering;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::expression::Expression;
use crate::node::Node;

/// Payload owned by a collaborator that the core does not know how to interpret.
///
/// The `type_name` is the suffix used when the core dispatches conversion events for the
/// payload (e.g. `.get-string-value.<type_name>`).
pub trait Opaque: Any + fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

/// Dynamically typed node value.
///
/// Cloning is shallow: nested nodes, blobs, expressions and opaque payloads are shared by
/// reference.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Blob(Arc<[u8]>),
    DateTime(DateTime<FixedOffset>),
    Node(Node),
    Nodes(Vec<Node>),
    Expression(Arc<Expression>),
    Opaque(Arc<dyn Opaque>),
}

pub mod type_names {
    pub const NULL: &str = "null";
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const STRING: &str = "string";
    pub const BLOB: &str = "blob";
    pub const DATE: &str = "date";
    pub const NODE: &str = "node";
    pub const NODES: &str = "nodes";
    pub const EXPRESSION: &str = "x";
}

impl Value {
    /// Short alias of the runtime type, used as the suffix of conversion events.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => type_names::NULL,
            Value::Bool(_) => type_names::BOOL,
            Value::Int(_) => type_names::INT,
            Value::Float(_) => type_names::FLOAT,
            Value::String(_) => type_names::STRING,
            Value::Blob(_) => type_names::BLOB,
            Value::DateTime(_) => type_names::DATE,
            Value::Node(_) => type_names::NODE,
            Value::Nodes(_) => type_names::NODES,
            Value::Expression(_) => type_names::EXPRESSION,
            Value::Opaque(payload) => payload.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Arc<Expression>> {
        match self {
            Value::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    /// Total order used by structural node comparison: the type alias breaks ties between
    /// different kinds, values of the same kind use their natural ordering.
    pub fn compare_to(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Node(a), Value::Node(b)) => a.compare_to(b),
            (Value::Nodes(a), Value::Nodes(b)) => {
                for (lhs, rhs) in a.iter().zip(b.iter()) {
                    let ord = lhs.compare_to(rhs);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Expression(a), Value::Expression(b)) => a.source().cmp(b.source()),
            (Value::Opaque(a), Value::Opaque(b)) if a.type_name() == b.type_name() => {
                format!("{a:?}").cmp(&format!("{b:?}"))
            }
            _ => self.type_name().cmp(other.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Nodes(a), Value::Nodes(b)) => a == b,
            (Value::Expression(a), Value::Expression(b)) => a.source() == b.source(),
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Locale-invariant stringification used when no conversion handler produced a string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(text) => f.write_str(text),
            Value::Blob(bytes) => f.write_str(&BASE64.encode(bytes)),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Node(node) => write!(f, "{node}"),
            Value::Nodes(nodes) => {
                for (idx, node) in nodes.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{node}")?;
                }
                Ok(())
            }
            Value::Expression(expression) => f.write_str(expression.source()),
            Value::Opaque(payload) => write!(f, "{payload:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(Arc::from(value))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

impl From<Vec<Node>> for Value {
    fn from(value: Vec<Node>) -> Self {
        Value::Nodes(value)
    }
}

impl From<Expression> for Value {
    fn from(value: Expression) -> Self {
        Value::Expression(Arc::new(value))
    }
}

impl From<Arc<Expression>> for Value {
    fn from(value: Arc<Expression>) -> Self {
        Value::Expression(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

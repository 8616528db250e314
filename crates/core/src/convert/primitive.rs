//! Generic conversions between the scalar kinds, used when no handler converted a value.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::value::{Value, type_names};

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(n) if n.is_finite() => Some(n.trunc() as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(text) => text.trim().parse().ok(),
        Value::DateTime(dt) => Some(dt.timestamp()),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(n) => Some(*n),
        Value::Int(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Float(n) => Some(*n != 0.0),
        Value::String(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") {
                Some(true)
            } else if text.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub(crate) fn to_date(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim()).ok(),
        Value::Int(seconds) => {
            DateTime::from_timestamp(*seconds, 0).map(|utc| utc.fixed_offset())
        }
        _ => None,
    }
}

/// Converts `value` to the kind named by `alias`, if the conversion is a plain scalar one.
pub(crate) fn coerce(value: &Value, alias: &str) -> Option<Value> {
    match alias {
        type_names::INT => to_int(value).map(Value::Int),
        type_names::FLOAT => to_float(value).map(Value::Float),
        type_names::BOOL => to_bool(value).map(Value::Bool),
        type_names::DATE => to_date(value).map(Value::DateTime),
        type_names::STRING => Some(Value::String(value.to_string())),
        type_names::BLOB => match value {
            Value::Blob(bytes) => Some(Value::Blob(Arc::clone(bytes))),
            Value::String(text) => Some(Value::Blob(Arc::from(text.as_bytes()))),
            _ => None,
        },
        type_names::NODE => match value {
            Value::Node(node) => Some(Value::Node(node.clone())),
            Value::Nodes(nodes) if nodes.len() == 1 => nodes.first().cloned().map(Value::Node),
            _ => None,
        },
        type_names::NODES => match value {
            Value::Nodes(nodes) => Some(Value::Nodes(nodes.clone())),
            Value::Node(node) => Some(Value::Nodes(vec![node.clone()])),
            _ => None,
        },
        _ => None,
    }
}

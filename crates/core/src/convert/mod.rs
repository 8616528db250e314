//! Type conversion facade.
//!
//! Conversions never fail: when no path exists the caller's default is returned. Anything the
//! core cannot convert natively is delegated to event handlers, so new types are added by
//! registering handlers for the conversion events in [`crate::events`].

mod builtin;
mod primitive;

use std::any::TypeId;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::dispatch::Context;
use crate::events;
use crate::expression::Expression;
use crate::node::Node;
use crate::value::{Value, type_names};

pub(crate) use primitive::coerce;

/// Native types the facade can produce.
pub trait Convertible: Sized + 'static {
    /// Key used to ask handlers for the type's short alias (`.get-type-name.<TYPE_KEY>`).
    const TYPE_KEY: &'static str;

    /// Returns the value unchanged if it already is of this type.
    fn from_value(value: &Value) -> Option<Self>;

    /// Generic primitive conversion, tried after the dispatched conversion.
    fn coerce(_value: &Value) -> Option<Self> {
        None
    }
}

/// Converts `value` to `T`, returning `default` if no conversion path exists.
pub fn convert<T: Convertible>(ctx: &Context, value: &Value, default: T) -> T {
    if value.is_null() {
        return default;
    }
    if let Some(same) = T::from_value(value) {
        return same;
    }
    if TypeId::of::<T>() == TypeId::of::<String>() {
        return T::from_value(&Value::String(to_string(ctx, value))).unwrap_or(default);
    }
    if let Some(alias) = type_alias(ctx, T::TYPE_KEY)
        && let Some(converted) = object_value(ctx, &alias, value)
        && let Some(result) = T::from_value(&converted)
    {
        return result;
    }
    T::coerce(value).unwrap_or(default)
}

/// Converts `value` to the type named by a runtime alias (`int`, `date`, `x`, ...).
///
/// Yields [`Value::Null`] when no conversion path exists.
pub fn convert_alias(ctx: &Context, value: &Value, alias: &str) -> Value {
    if value.is_null() || value.type_name() == alias {
        return value.clone();
    }
    if alias == type_names::STRING {
        return Value::String(to_string(ctx, value));
    }
    if let Some(converted) = object_value(ctx, alias, value) {
        return converted;
    }
    coerce(value, alias).unwrap_or(Value::Null)
}

/// Produces a string for any value, asking `.get-string-value.<type>` handlers first and
/// falling back to the locale-invariant rendering of [`Value`]'s `Display`.
pub fn to_string(ctx: &Context, value: &Value) -> String {
    if let Value::String(text) = value {
        return text.clone();
    }
    let event = format!("{}{}", events::GET_STRING_VALUE, value.type_name());
    if let Some(Value::String(text)) = dispatch(ctx, &event, value.clone()) {
        return text;
    }
    value.to_string()
}

fn type_alias(ctx: &Context, type_key: &str) -> Option<String> {
    let event = format!("{}{type_key}", events::GET_TYPE_NAME);
    match dispatch(ctx, &event, Value::Null)? {
        Value::String(alias) if !alias.is_empty() => Some(alias),
        _ => None,
    }
}

fn object_value(ctx: &Context, alias: &str, value: &Value) -> Option<Value> {
    let event = format!("{}{alias}", events::GET_OBJECT_VALUE);
    dispatch(ctx, &event, value.clone())
}

/// Raises a conversion event carrying `value`; returns the resulting value if a handler
/// replaced it. Handler failures degrade to "no conversion".
fn dispatch(ctx: &Context, event: &str, value: Value) -> Option<Value> {
    if !ctx.has_event(event) {
        return None;
    }
    match ctx.raise(event, Some(Node::with_value("", value.clone()))) {
        Ok(result) => Some(result.value()).filter(|out| !out.is_null() && *out != value),
        Err(error) => {
            tracing::warn!(event, %error, "conversion handler failed");
            None
        }
    }
}

// ---- Convertible implementations ---------------------------------------------------------

impl Convertible for Value {
    const TYPE_KEY: &'static str = "Value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Convertible for bool {
    const TYPE_KEY: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        primitive::to_bool(value)
    }
}

impl Convertible for i64 {
    const TYPE_KEY: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        primitive::to_int(value)
    }
}

impl Convertible for i32 {
    const TYPE_KEY: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => i32::try_from(*i).ok(),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        primitive::to_int(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl Convertible for u64 {
    const TYPE_KEY: &'static str = "u64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        primitive::to_int(value).and_then(|i| u64::try_from(i).ok())
    }
}

impl Convertible for f64 {
    const TYPE_KEY: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        primitive::to_float(value)
    }
}

impl Convertible for String {
    const TYPE_KEY: &'static str = "String";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl Convertible for Vec<u8> {
    const TYPE_KEY: &'static str = "Vec<u8>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(bytes) => Some(bytes.to_vec()),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        match primitive::coerce(value, type_names::BLOB)? {
            Value::Blob(bytes) => Some(bytes.to_vec()),
            _ => None,
        }
    }
}

impl Convertible for DateTime<FixedOffset> {
    const TYPE_KEY: &'static str = "DateTime";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        primitive::to_date(value)
    }
}

impl Convertible for Node {
    const TYPE_KEY: &'static str = "Node";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_node().cloned()
    }

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Nodes(nodes) if nodes.len() == 1 => nodes.first().cloned(),
            _ => None,
        }
    }
}

impl Convertible for Vec<Node> {
    const TYPE_KEY: &'static str = "Vec<Node>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Nodes(nodes) => Some(nodes.clone()),
            _ => None,
        }
    }

    fn coerce(value: &Value) -> Option<Self> {
        value.as_node().map(|node| vec![node.clone()])
    }
}

impl Convertible for Arc<Expression> {
    const TYPE_KEY: &'static str = "Expression";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_expression().cloned()
    }
}

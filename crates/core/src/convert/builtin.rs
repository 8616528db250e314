//! Conversion handlers for the built-in value kinds, registered at link time.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::dispatch::{Context, EventArgs};
use crate::error::Result;
use crate::expression::Expression;
use crate::register_event_handler;
use crate::value::{Value, type_names};

fn alias(args: &EventArgs, name: &str) -> Result<()> {
    args.args().set_value(name);
    Ok(())
}

fn int_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::INT)
}

fn float_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::FLOAT)
}

fn bool_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::BOOL)
}

fn date_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::DATE)
}

fn blob_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::BLOB)
}

fn node_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::NODE)
}

fn nodes_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::NODES)
}

fn expression_alias(_ctx: &Context, args: &EventArgs) -> Result<()> {
    alias(args, type_names::EXPRESSION)
}

register_event_handler!(
    [".get-type-name.i64", ".get-type-name.i32", ".get-type-name.u64"],
    int_alias
);
register_event_handler!([".get-type-name.f64"], float_alias);
register_event_handler!([".get-type-name.bool"], bool_alias);
register_event_handler!([".get-type-name.DateTime"], date_alias);
register_event_handler!([".get-type-name.Vec<u8>"], blob_alias);
register_event_handler!([".get-type-name.Node"], node_alias);
register_event_handler!([".get-type-name.Vec<Node>"], nodes_alias);
register_event_handler!([".get-type-name.Expression"], expression_alias);

/// Strings compile to expressions. Text that does not compile is left alone.
fn expression_value(_ctx: &Context, args: &EventArgs) -> Result<()> {
    let node = args.args();
    if let Value::String(text) = node.value() {
        match Expression::compile(&text) {
            Ok(expression) => node.set_value(Value::Expression(Arc::new(expression))),
            Err(error) => tracing::debug!(%error, "value is not an expression"),
        }
    }
    Ok(())
}

/// Strings holding base64 decode to blobs, mirroring how blobs render as strings.
fn blob_value(_ctx: &Context, args: &EventArgs) -> Result<()> {
    let node = args.args();
    if let Value::String(text) = node.value()
        && let Ok(bytes) = STANDARD.decode(text.trim())
    {
        node.set_value(bytes);
    }
    Ok(())
}

register_event_handler!([".get-object-value.x"], expression_value);
register_event_handler!([".get-object-value.blob"], blob_value);

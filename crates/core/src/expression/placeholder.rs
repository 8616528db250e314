//! `{n}` placeholders, filled from the positional (empty-named) children of the node holding
//! an expression.

use crate::convert;
use crate::dispatch::Context;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::value::Value;

/// Byte ranges and indices of the placeholders in `source`.
fn placeholders(source: &str) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
    source.match_indices('{').filter_map(|(open, _)| {
        let after = &source[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || !after[digits..].starts_with('}') {
            return None;
        }
        let index = after[..digits].parse().ok()?;
        Some((open, open + digits + 2, index))
    })
}

pub(crate) fn has_placeholders(source: &str) -> bool {
    placeholders(source).next().is_some()
}

/// Replaces every placeholder with the text of its argument. Expression arguments are
/// evaluated against `data_source` and their results concatenated.
pub(crate) fn substitute(
    ctx: &Context,
    source: &str,
    data_source: &Node,
    holder: Option<&Node>,
) -> Result<String> {
    let arguments = holder.map(|holder| holder.children_named("")).unwrap_or_default();
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for (start, end, index) in placeholders(source) {
        let argument = arguments.get(index).ok_or_else(|| {
            Error::syntax(format!("no argument for placeholder {{{index}}}"), source)
        })?;
        out.push_str(&source[copied..start]);
        out.push_str(&argument_text(ctx, argument, data_source)?);
        copied = end;
    }
    out.push_str(&source[copied..]);
    Ok(out)
}

fn argument_text(ctx: &Context, argument: &Node, data_source: &Node) -> Result<String> {
    match argument.value() {
        Value::Expression(expression) => {
            let matched = expression.evaluate(ctx, data_source, Some(argument))?;
            Ok(matched.values().iter().map(|value| convert::to_string(ctx, value)).collect())
        }
        other => Ok(convert::to_string(ctx, &other)),
    }
}

//! Handlers linked into the `nodal` binary.
//!
//! * `nodal.version` sets the argument value to the package version.
//! * `nodal.evaluate` evaluates the `expression` child against the `data` child (the arguments
//!   themselves when absent) and appends one `result` child per match value.
//! * `requires` is a whitelist verifier for pre- and post-conditions: the condition's
//!   `expression` child must match at least one node of the verified arguments.

use nodal_core::{Context, EventArgs, Expression, Node, Result, Value, convert_alias};
use tracing::debug;

pub const VERSION: &str = "nodal.version";
pub const EVALUATE: &str = "nodal.evaluate";

fn version(_ctx: &Context, args: &EventArgs) -> Result<()> {
    args.args().set_value(env!("CARGO_PKG_VERSION"));
    Ok(())
}

nodal_core::register_event_handler!([VERSION], version);

fn evaluate(ctx: &Context, args: &EventArgs) -> Result<()> {
    let node = args.args();
    let Some(holder) = node.children_named("expression").into_iter().next() else {
        return Err(nodal_core::Error::invalid_argument("missing 'expression' argument"));
    };
    let expression = expression_of(ctx, &holder)?;
    let data = node.children_named("data").into_iter().next().unwrap_or_else(|| node.clone());
    let matched = expression.evaluate(ctx, &data, Some(&holder))?;
    debug!(expression = %expression, matches = matched.len(), "evaluated");
    for value in matched.values() {
        node.add_new("result", value);
    }
    Ok(())
}

nodal_core::register_event_handler!([EVALUATE], evaluate);

fn requires(ctx: &Context, args: &EventArgs) -> Result<()> {
    let payload = args.args();
    let condition = payload_node(payload, "condition");
    let subject = payload_node(payload, "args");
    let (Some(condition), Some(subject)) = (condition, subject) else {
        payload.set_value(false);
        return Ok(());
    };
    let Some(holder) = condition.children_named("expression").into_iter().next() else {
        payload.set_value(false);
        return Ok(());
    };
    let matched = expression_of(ctx, &holder)?.evaluate(ctx, &subject, Some(&holder))?;
    payload.set_value(!matched.is_empty());
    Ok(())
}

nodal_core::register_event_handler!(
    [".whitelist.pre-condition.requires", ".whitelist.post-condition.requires"],
    requires
);

fn payload_node(payload: &Node, name: &str) -> Option<Node> {
    payload.children_named(name).into_iter().next()?.value().as_node().cloned()
}

fn expression_of(ctx: &Context, holder: &Node) -> Result<Expression> {
    match convert_alias(ctx, &holder.value(), "x") {
        Value::Expression(expression) => Ok((*expression).clone()),
        _ => Expression::compile(&nodal_core::to_string(ctx, &holder.value())),
    }
}

use nodal_core::{Context, Node, Value, to_string};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::Write;
use std::io::Read;
use std::path::Path;

pub type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Object key that sets the value of the node holding the object instead of adding a child.
pub const VALUE_KEY: &str = "$value";

/// Reads a JSON document from `path`, or from standard input when no path is given, and maps
/// it to a node named `name`.
pub fn read_document(path: Option<&Path>, name: &str) -> CliResult<Node> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {err}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let json: JsonValue = serde_json::from_str(&text)?;
    Ok(json_to_node(name, &json))
}

/// Maps JSON onto a node tree. Object members become named children, array items become
/// positional (empty-named) children and scalars become values.
pub fn json_to_node(name: &str, json: &JsonValue) -> Node {
    let node = Node::new(name);
    fill_node(&node, json);
    node
}

fn fill_node(node: &Node, json: &JsonValue) {
    match json {
        JsonValue::Object(members) => {
            for (key, member) in members {
                if key == VALUE_KEY {
                    fill_node(node, member);
                } else {
                    fill_node(&node.add_new(key.as_str(), Value::Null), member);
                }
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                fill_node(&node.add_new("", Value::Null), item);
            }
        }
        JsonValue::Null => node.set_value(Value::Null),
        JsonValue::Bool(flag) => node.set_value(*flag),
        JsonValue::Number(number) => match number.as_i64() {
            Some(int) => node.set_value(int),
            None => node.set_value(number.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(text) => node.set_value(text.as_str()),
    }
}

/// JSON rendering of a value. Types without a JSON counterpart render through the context's
/// string conversion.
pub fn value_to_json(ctx: &Context, value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(flag) => JsonValue::Bool(*flag),
        Value::Int(int) => JsonValue::from(*int),
        Value::Float(float) => {
            serde_json::Number::from_f64(*float).map_or(JsonValue::Null, JsonValue::Number)
        }
        Value::String(text) => JsonValue::String(text.clone()),
        other => JsonValue::String(to_string(ctx, other)),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub name: String,
    pub value: JsonValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSummary>,
}

impl NodeSummary {
    pub fn of(ctx: &Context, node: &Node) -> Self {
        Self {
            name: node.name(),
            value: value_to_json(ctx, &node.value()),
            children: node.children().iter().map(|child| Self::of(ctx, child)).collect(),
        }
    }
}

/// Indented `name = value` lines, one per node.
pub fn render_tree_text(summary: &NodeSummary) -> String {
    let mut output = String::new();
    render_tree_level(&mut output, summary, 0);
    output.trim_end().to_owned()
}

fn render_tree_level(output: &mut String, summary: &NodeSummary, depth: usize) {
    let indent = "    ".repeat(depth);
    let name = colorize_name(&format_name(&summary.name));
    if summary.value.is_null() {
        let _ = writeln!(output, "{indent}{name}");
    } else {
        let value = colorize_value(&format_json(&summary.value));
        let _ = writeln!(output, "{indent}{name} = {value}");
    }
    for child in &summary.children {
        render_tree_level(output, child, depth + 1);
    }
}

pub fn format_name(name: &str) -> String {
    if name.is_empty() { String::from("[]") } else { name.to_owned() }
}

pub fn format_json(value: &JsonValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("<value>"))
}

pub fn colorize_name(name: &str) -> String {
    name.if_supports_color(Stream::Stdout, |text| text.bold().fg_rgb::<79, 166, 255>().to_string())
        .to_string()
}

pub fn colorize_value(value: &str) -> String {
    value.if_supports_color(Stream::Stdout, |text| text.fg_rgb::<136, 192, 74>().to_string()).to_string()
}

pub fn colorize_dimmed(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |text| text.dimmed().to_string()).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nodal_core::testing;
    use rstest::rstest;
    use std::borrow::Cow;

    pub(crate) fn strip_ansi(input: &str) -> Cow<'_, str> {
        if !input.contains('\u{1b}') {
            return Cow::Borrowed(input);
        }

        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars();
        loop {
            match chars.next() {
                Some('\u{1b}') => {
                    for next in chars.by_ref() {
                        if next == 'm' {
                            break;
                        }
                    }
                }
                Some(ch) => result.push(ch),
                None => break,
            }
        }
        Cow::Owned(result)
    }

    #[rstest]
    fn objects_arrays_and_scalars_map_onto_nodes() {
        let json = serde_json::json!({
            "name": "tree",
            "size": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "meta": { "$value": true, "owner": null }
        });
        let root = json_to_node("", &json);

        assert_eq!(root.get_child_value("name", &testing::context(), String::new()), "tree");
        assert_eq!(root.children_named("size")[0].value(), Value::Int(3));
        assert_eq!(root.children_named("ratio")[0].value(), Value::Float(0.5));

        let tags = &root.children_named("tags")[0];
        assert_eq!(tags.count(), 2);
        assert!(tags.children().iter().all(|tag| tag.name().is_empty()));

        let meta = &root.children_named("meta")[0];
        assert_eq!(meta.value(), Value::Bool(true));
        assert_eq!(meta.count(), 1);
        assert!(meta.children_named("owner")[0].value().is_null());
    }

    #[rstest]
    fn summaries_carry_json_values() {
        let ctx = testing::context();
        let summary = NodeSummary::of(&ctx, &testing::abc());
        assert_eq!(summary.name, "root");
        assert!(summary.value.is_null());
        assert_eq!(summary.children.len(), 3);
        assert_eq!(summary.children[1].value, serde_json::json!(2));
    }

    #[rstest]
    fn tree_text_indents_children() {
        let ctx = testing::context();
        let summary = NodeSummary::of(&ctx, &testing::abc());
        let text = render_tree_text(&summary);
        assert_eq!(strip_ansi(&text), "root\n    a = 1\n    b = 2\n    c = 3");
    }

    #[rstest]
    #[case(Value::Null, serde_json::json!(null))]
    #[case(Value::Bool(false), serde_json::json!(false))]
    #[case(Value::Int(-4), serde_json::json!(-4))]
    #[case(Value::from("text"), serde_json::json!("text"))]
    fn values_map_to_json(#[case] value: Value, #[case] expected: JsonValue) {
        assert_eq!(value_to_json(&testing::context(), &value), expected);
    }
}

use crate::OutputFormat;
use crate::util::{
    CliResult, colorize_dimmed, colorize_name, colorize_value, format_json, format_name,
    read_document, value_to_json,
};
use clap::Args;
use nodal_core::{Context, Expression, Match, MatchEntity, ResultType, Value};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,
    /// JSON document to query; read from standard input when omitted.
    #[arg(long = "input", short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum QueryItemSummary {
    Node { dna: String, name: String, value: JsonValue, children: usize },
    Name { dna: String, name: String },
    Value { dna: String, name: String, value: JsonValue },
    Count { count: usize },
}

pub fn run(ctx: &Context, args: &QueryArgs) -> CliResult<String> {
    let document = read_document(args.input.as_deref(), "")?;
    let expression = Expression::compile(&args.expression)?;
    let matched = expression.evaluate(ctx, &document, None)?;

    let summaries = summarize_query_results(ctx, &matched);

    let output = match args.format {
        OutputFormat::Text => render_query_text(&summaries),
        OutputFormat::Json => render_query_json(&summaries)?,
    };

    Ok(output)
}

pub(crate) fn summarize_query_results(ctx: &Context, matched: &Match) -> Vec<QueryItemSummary> {
    matched.iter().map(|entity| summarize_entity(ctx, entity)).collect()
}

fn summarize_entity(ctx: &Context, entity: &MatchEntity) -> QueryItemSummary {
    let Some(node) = entity.node() else {
        let count = match entity.value() {
            Value::Int(count) => usize::try_from(count).unwrap_or_default(),
            _ => 0,
        };
        return QueryItemSummary::Count { count };
    };
    let dna = node.dna();
    match entity.result_type() {
        ResultType::Name => QueryItemSummary::Name { dna, name: node.name() },
        ResultType::Value | ResultType::Count => QueryItemSummary::Value {
            dna,
            name: node.name(),
            value: value_to_json(ctx, &entity.value()),
        },
        ResultType::Node => QueryItemSummary::Node {
            dna,
            name: node.name(),
            value: value_to_json(ctx, &node.value()),
            children: node.count(),
        },
    }
}

pub(crate) fn render_query_text(items: &[QueryItemSummary]) -> String {
    let mut output = String::new();
    for item in items {
        match item {
            QueryItemSummary::Node { dna, name, value, children } => {
                let colored_name = colorize_name(&format_name(name));
                let location = colorize_dimmed(&format!("({dna}, {children} children)"));
                if value.is_null() {
                    let _ = writeln!(&mut output, "{colored_name} {location}");
                } else {
                    let colored_value = colorize_value(&format_json(value));
                    let _ = writeln!(&mut output, "{colored_name} = {colored_value} {location}");
                }
            }
            QueryItemSummary::Name { dna, name } => {
                let location = colorize_dimmed(&format!("({dna})"));
                let _ = writeln!(&mut output, "{} {location}", colorize_name(name));
            }
            QueryItemSummary::Value { dna: _, name: _, value } => {
                let _ = writeln!(&mut output, "{}", colorize_value(&format_json(value)));
            }
            QueryItemSummary::Count { count } => {
                let _ = writeln!(&mut output, "{}", colorize_value(&count.to_string()));
            }
        }
    }

    output.trim_end().to_owned()
}

pub(crate) fn render_query_json(items: &[QueryItemSummary]) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::tests::strip_ansi;
    use nodal_core::testing;
    use rstest::{fixture, rstest};
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[fixture]
    fn document() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"shop": {{"items": [{{"name": "pen", "price": 2}}, {{"name": "ink", "price": 7}}], "open": true}}}}"#
        )
        .expect("write document");
        file
    }

    fn query(document: &NamedTempFile, expression: &str, format: OutputFormat) -> String {
        let args = QueryArgs {
            expression: expression.into(),
            input: Some(document.path().to_path_buf()),
            format,
        };
        run(&testing::context(), &args).expect("query")
    }

    #[rstest]
    fn query_text_lists_values(document: NamedTempFile) {
        let output = query(&document, "/shop/items/*/name?value", OutputFormat::Text);
        assert_eq!(strip_ansi(&output), "\"pen\"\n\"ink\"");
    }

    #[rstest]
    fn query_text_shows_node_locations(document: NamedTempFile) {
        let output = query(&document, "/shop/open", OutputFormat::Text);
        assert_eq!(strip_ansi(&output), "open = true (0-1, 0 children)");
    }

    #[rstest]
    fn query_count_is_rendered_once(document: NamedTempFile) {
        let output = query(&document, "/shop/items/*?count", OutputFormat::Text);
        assert_eq!(strip_ansi(&output), "2");
    }

    #[rstest]
    fn query_json_produces_valid_payload(document: NamedTempFile) {
        let output = query(&document, "/shop/items/*/price?value.int", OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(output.trim()).expect("json");
        assert_eq!(json[0]["type"], "Value");
        assert_eq!(json[1]["value"], 7);
    }

    #[rstest]
    fn query_reports_syntax_errors(document: NamedTempFile) {
        let args = QueryArgs {
            expression: "/shop)".into(),
            input: Some(document.path().to_path_buf()),
            format: OutputFormat::Text,
        };
        assert!(run(&testing::context(), &args).is_err());
    }
}

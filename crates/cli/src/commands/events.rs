use crate::OutputFormat;
use crate::util::{CliResult, colorize_dimmed, colorize_name};
use clap::Args;
use nodal_core::Loader;
use nodal_core::events::is_privileged;
use serde::Serialize;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct EventsArgs {
    /// Include internal events (leading `.` or `_`).
    #[arg(long = "all")]
    pub all: bool,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EventsSummary {
    modules: Vec<String>,
    events: Vec<String>,
}

pub fn run(loader: &Loader, args: &EventsArgs) -> CliResult<String> {
    let summary = EventsSummary {
        modules: loader.modules(),
        events: loader
            .events()
            .into_iter()
            .filter(|event| args.all || !is_privileged(event))
            .collect(),
    };

    let output = match args.format {
        OutputFormat::Text => render_events_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

fn render_events_text(summary: &EventsSummary) -> String {
    let mut output = String::new();
    for module in &summary.modules {
        let _ = writeln!(&mut output, "{}", colorize_dimmed(&format!("module {module}")));
    }
    for event in &summary.events {
        let label = if event.is_empty() { "<catch-all>" } else { event.as_str() };
        let _ = writeln!(&mut output, "{}", colorize_name(label));
    }
    output.trim_end().to_owned()
}

use crate::OutputFormat;
use crate::util::{CliResult, NodeSummary, read_document, render_tree_text};
use clap::Args;
use nodal_core::{Loader, Node, Ticket};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct RaiseArgs {
    #[arg(value_name = "EVENT")]
    pub event: String,
    /// JSON document used as event arguments; the event gets an empty node when omitted.
    #[arg(long = "input", short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// JSON whitelist restricting which events may be raised.
    #[arg(long = "whitelist", value_name = "FILE")]
    pub whitelist: Option<PathBuf>,
    #[arg(long = "user", default_value = "anonymous")]
    pub user: String,
    /// Comma-separated roles of the user.
    #[arg(long = "role", default_value = "")]
    pub role: String,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(loader: &Loader, args: &RaiseArgs) -> CliResult<String> {
    let arguments = match &args.input {
        Some(path) => Some(read_document(Some(path.as_path()), "")?),
        None => None,
    };

    let mut ticket = Ticket::new(args.user.as_str(), args.role.as_str());
    if let Some(path) = &args.whitelist {
        ticket = ticket.with_whitelist(read_document(Some(path.as_path()), "whitelist")?);
    }

    let ctx = loader.create_context(Some(ticket))?;
    info!(event = %args.event, user = %args.user, "raising event");
    let result: Node = ctx.raise(&args.event, arguments)?;

    let summary = NodeSummary::of(&ctx, &result);
    let output = match args.format {
        OutputFormat::Text => render_tree_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

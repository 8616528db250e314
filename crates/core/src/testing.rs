//! Fixtures shared by tests of this crate and its dependents (`test-support` feature).

use std::sync::{Arc, Mutex, PoisonError};

use crate::dispatch::{Context, EventArgs, EventListener, ListenerHandler, Loader, Module, Ticket};
use crate::error::Result;
use crate::node::Node;
use crate::value::Value;

/// A context without static handlers.
pub fn context() -> Context {
    context_with(Vec::new(), None)
}

/// A context over a fresh loader holding `modules`.
///
/// # Panics
/// If a module fails to register or the context cannot be created.
pub fn context_with(modules: Vec<Module>, ticket: Option<Ticket>) -> Context {
    let loader = Loader::new();
    for module in modules {
        loader.register(module).expect("test module registers");
    }
    loader.create_context(ticket).expect("test context is created")
}

/// `root{a:1, b:2, c:3}`.
pub fn abc() -> Node {
    Node::new("root")
        .with_child(Node::with_value("a", 1))
        .with_child(Node::with_value("b", 2))
        .with_child(Node::with_value("c", 3))
}

/// Builds a whitelist node: one child per event, each holding `(kind, verifier)` conditions
/// where kind is `pre-condition` or `post-condition`.
pub fn whitelist(entries: &[(&str, &[(&str, &str)])]) -> Node {
    let whitelist = Node::new("whitelist");
    for (event, conditions) in entries {
        let declaration = whitelist.add_new(*event, Value::Null);
        for (kind, verifier) in *conditions {
            declaration.add_new(*kind, *verifier);
        }
    }
    whitelist
}

/// Records the name of every event raised on the contexts it is registered with.
#[derive(Debug, Default)]
pub struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, _ctx: &Context, args: &EventArgs) -> Result<()> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(args.name().to_owned());
        Ok(())
    }
}

impl EventListener for Recorder {
    fn handlers() -> &'static [ListenerHandler<Self>] {
        const HANDLERS: &[ListenerHandler<Recorder>] =
            &[ListenerHandler { events: &[""], handler: Recorder::record }];
        HANDLERS
    }
}

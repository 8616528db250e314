//! Name-addressed event dispatch.
//!
//! Static handlers are grouped in [`Module`]s, either built explicitly with [`ModuleBuilder`] or
//! submitted at link time with [`register_event_handler!`](crate::register_event_handler), and
//! registered with a [`Loader`]. A [`Context`] snapshots the loader's handlers, adds its own
//! instance bindings and raises events under a [`Ticket`].

mod context;
mod listener;
mod loader;
mod module;
mod registry;
mod ticket;

pub use context::{Context, EventArgs};
pub use listener::{EventListener, InstanceHandlerFn, InstanceId, ListenerHandler};
pub use loader::Loader;
pub use module::{HandlerRegistration, Module, ModuleBuilder, ModuleEntry, handler_registrations};
pub use ticket::Ticket;

use crate::error::Result;

/// Signature of a static event handler.
pub type HandlerFn = fn(&Context, &EventArgs) -> Result<()>;

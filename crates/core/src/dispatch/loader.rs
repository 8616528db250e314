use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, warn};

use super::module::{HandlerRegistration, Module, handler_registrations};
use super::registry::{Binding, HandlerTable};
use super::{Context, Ticket};
use crate::error::{Error, Result};
use crate::events;
use crate::lock::{read, write};

/// Holds the registered modules and the static handler table built from them.
///
/// Contexts snapshot the table when they are created; later registrations only affect
/// contexts created afterwards.
#[derive(Debug, Default)]
pub struct Loader {
    modules: RwLock<Vec<Module>>,
    table: RwLock<Arc<HandlerTable>>,
}

impl Loader {
    /// An empty loader without any static handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader holding every handler submitted through
    /// [`register_event_handler!`](crate::register_event_handler), one module per module path.
    pub fn discover() -> Self {
        let loader = Self::new();
        let mut grouped: BTreeMap<&str, Vec<&HandlerRegistration>> = BTreeMap::new();
        for registration in handler_registrations() {
            grouped.entry(registration.module).or_default().push(registration);
        }
        for (path, registrations) in grouped {
            if let Err(error) = loader.register(Module::from_registrations(path, registrations)) {
                warn!(module = path, %error, "skipping module");
            }
        }
        loader
    }

    /// Process-wide loader, discovered on first use.
    pub fn global() -> &'static Loader {
        static GLOBAL: OnceLock<Loader> = OnceLock::new();
        GLOBAL.get_or_init(Loader::discover)
    }

    pub fn register(&self, module: Module) -> Result<()> {
        let name = module.name().to_owned();
        if name.is_empty() {
            return Err(Error::registration("module name must not be empty"));
        }
        if module.entries().iter().any(|entry| entry.events.is_empty()) {
            return Err(Error::registration(format!(
                "module '{name}' declares a handler without event names"
            )));
        }

        let mut modules = write(&self.modules);
        if modules.iter().any(|existing| existing.name() == name) {
            return Err(Error::registration(format!("module '{name}' is already registered")));
        }
        debug!(module = %name, events = module.events().count(), "registering module");
        modules.push(module);
        self.rebuild(&modules);
        Ok(())
    }

    /// Registers the link-time handlers whose module path is `path` or lies below it, as a
    /// module called `name`.
    pub fn load(&self, path: &str, name: &str) -> Result<()> {
        let nested = format!("{path}::");
        let registrations: Vec<_> = handler_registrations()
            .filter(|registration| {
                registration.module == path || registration.module.starts_with(&nested)
            })
            .collect();
        if registrations.is_empty() {
            return Err(Error::registration(format!("no handlers registered under '{path}'")));
        }
        self.register(Module::from_registrations(name, registrations))
    }

    pub fn unregister(&self, name: &str) -> Result<Module> {
        let mut modules = write(&self.modules);
        let Some(position) = modules.iter().position(|module| module.name() == name) else {
            return Err(Error::registration(format!("module '{name}' is not registered")));
        };
        let module = modules.remove(position);
        debug!(module = name, "unregistered module");
        self.rebuild(&modules);
        Ok(module)
    }

    pub fn modules(&self) -> Vec<String> {
        read(&self.modules).iter().map(|module| module.name().to_owned()).collect()
    }

    /// Event names with at least one static binding, sorted.
    pub fn events(&self) -> Vec<String> {
        let table = self.snapshot();
        let mut names: Vec<String> = table.names().map(str::to_owned).collect();
        if table.contains(events::CATCH_ALL) {
            names.push(String::new());
        }
        names.sort();
        names
    }

    /// Creates a dispatch context over the current static handlers and raises
    /// [`CONTEXT_INITIALIZED`](events::CONTEXT_INITIALIZED) on it.
    pub fn create_context(&self, ticket: Option<Ticket>) -> Result<Context> {
        let context = Context::new(self.snapshot(), ticket.unwrap_or_else(Ticket::anonymous));
        context.raise(events::CONTEXT_INITIALIZED, None)?;
        Ok(context)
    }

    fn snapshot(&self) -> Arc<HandlerTable> {
        Arc::clone(&read(&self.table))
    }

    fn rebuild(&self, modules: &[Module]) {
        let mut table = HandlerTable::default();
        for module in modules {
            for entry in module.entries() {
                for event in &entry.events {
                    table.bind(event, Binding::from_fn(entry.handler));
                }
            }
        }
        *write(&self.table) = Arc::new(table);
    }
}

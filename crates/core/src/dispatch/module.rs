use super::HandlerFn;

/// Link-time handler registration, submitted with [`register_event_handler!`].
///
/// [`register_event_handler!`]: crate::register_event_handler
pub struct HandlerRegistration {
    /// Module path of the registering code (`module_path!()`).
    pub module: &'static str,
    pub events: &'static [&'static str],
    pub handler: HandlerFn,
}

inventory::collect!(HandlerRegistration);

pub fn handler_registrations() -> impl Iterator<Item = &'static HandlerRegistration> {
    inventory::iter::<HandlerRegistration>.into_iter()
}

/// Registers a static event handler for one or more event names.
///
/// ```ignore
/// fn ping(_ctx: &Context, args: &EventArgs) -> nodal_core::Result<()> {
///     args.args().set_value("pong");
///     Ok(())
/// }
/// nodal_core::register_event_handler!(["ping", "ping.alias"], ping);
/// ```
#[macro_export]
macro_rules! register_event_handler {
    ([$($event:expr),+ $(,)?], $handler:expr) => {
        $crate::inventory::submit! {
            $crate::dispatch::HandlerRegistration {
                module: module_path!(),
                events: &[$($event),+],
                handler: $handler,
            }
        }
    };
}

/// One handler of a module and the event names it listens to.
#[derive(Clone, Debug)]
pub struct ModuleEntry {
    pub events: Vec<String>,
    pub handler: HandlerFn,
}

/// A named set of static handlers, registered with a [`Loader`](super::Loader) as a unit.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    entries: Vec<ModuleEntry>,
}

impl Module {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    /// Event names handled by this module, in declaration order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().flat_map(|entry| entry.events.iter().map(String::as_str))
    }

    /// Collects link-time registrations into a module.
    pub fn from_registrations<'a>(
        name: impl Into<String>,
        registrations: impl IntoIterator<Item = &'a HandlerRegistration>,
    ) -> Self {
        let entries = registrations
            .into_iter()
            .map(|registration| ModuleEntry {
                events: registration.events.iter().map(|event| (*event).to_owned()).collect(),
                handler: registration.handler,
            })
            .collect();
        Self { name: name.into(), entries }
    }
}

/// Explicit module construction, as an alternative to link-time registration.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    entries: Vec<ModuleEntry>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: Vec::new() }
    }

    #[must_use]
    pub fn handler(mut self, event: impl Into<String>, handler: HandlerFn) -> Self {
        self.entries.push(ModuleEntry { events: vec![event.into()], handler });
        self
    }

    #[must_use]
    pub fn handler_for<I, S>(mut self, events: I, handler: HandlerFn) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .push(ModuleEntry { events: events.into_iter().map(Into::into).collect(), handler });
        self
    }

    pub fn build(self) -> Module {
        Module { name: self.name, entries: self.entries }
    }
}

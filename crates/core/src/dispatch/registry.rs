use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Context, EventArgs, HandlerFn, InstanceId};
use crate::error::Result;
use crate::events;

pub(crate) type Callable = Arc<dyn Fn(&Context, &EventArgs) -> Result<()> + Send + Sync>;

/// A handler bound to an event name, optionally against a listener instance.
///
/// Two bindings are the same binding when they share the handler identity (address of the
/// handler function) and the instance.
#[derive(Clone)]
pub(crate) struct Binding {
    handler: usize,
    instance: Option<InstanceId>,
    call: Callable,
}

impl Binding {
    pub(crate) fn new(handler: usize, instance: Option<InstanceId>, call: Callable) -> Self {
        Self { handler, instance, call }
    }

    /// Static binding of a plain handler function.
    pub(crate) fn from_fn(handler: HandlerFn) -> Self {
        let call: Callable = Arc::new(handler);
        Self::new(handler as usize, None, call)
    }

    pub(crate) fn same_as(&self, other: &Binding) -> bool {
        self.handler == other.handler && self.instance == other.instance
    }

    pub(crate) fn handler(&self) -> usize {
        self.handler
    }

    pub(crate) fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    pub(crate) fn invoke(&self, ctx: &Context, args: &EventArgs) -> Result<()> {
        (self.call)(ctx, args)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("handler", &format_args!("{:#x}", self.handler))
            .field("instance", &self.instance)
            .finish()
    }
}

/// Event name to ordered bindings. The catch-all bindings are kept apart from the named ones.
#[derive(Clone, Debug, Default)]
pub(crate) struct HandlerTable {
    named: HashMap<String, Vec<Binding>>,
    catch_all: Vec<Binding>,
}

impl HandlerTable {
    /// Appends `binding` unless an identical binding exists. Returns true if it was added.
    pub(crate) fn bind(&mut self, name: &str, binding: Binding) -> bool {
        let list = if name == events::CATCH_ALL {
            &mut self.catch_all
        } else {
            self.named.entry(name.to_owned()).or_default()
        };
        if list.iter().any(|existing| existing.same_as(&binding)) {
            return false;
        }
        list.push(binding);
        true
    }

    /// Removes the bindings for `name` matching `predicate`; empty entries are pruned.
    pub(crate) fn unbind<F>(&mut self, name: &str, predicate: F) -> usize
    where
        F: Fn(&Binding) -> bool,
    {
        if name == events::CATCH_ALL {
            let before = self.catch_all.len();
            self.catch_all.retain(|binding| !predicate(binding));
            return before - self.catch_all.len();
        }
        let Some(list) = self.named.get_mut(name) else {
            return 0;
        };
        let before = list.len();
        list.retain(|binding| !predicate(binding));
        let removed = before - list.len();
        if list.is_empty() {
            self.named.remove(name);
        }
        removed
    }

    /// Removes every binding of `instance`, under any name.
    pub(crate) fn unbind_instance(&mut self, instance: InstanceId) -> usize {
        let mut removed = 0;
        self.named.retain(|_, list| {
            let before = list.len();
            list.retain(|binding| binding.instance != Some(instance));
            removed += before - list.len();
            !list.is_empty()
        });
        let before = self.catch_all.len();
        self.catch_all.retain(|binding| binding.instance != Some(instance));
        removed + before - self.catch_all.len()
    }

    pub(crate) fn bindings(&self, name: &str) -> &[Binding] {
        self.named.get(name).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn catch_all(&self) -> &[Binding] {
        &self.catch_all
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        if name == events::CATCH_ALL {
            return !self.catch_all.is_empty();
        }
        self.named.contains_key(name)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

use std::fmt;
use std::sync::{Arc, RwLock};

use smallvec::SmallVec;
use tracing::{trace, warn};

use super::listener::{EventListener, InstanceHandlerFn, InstanceId};
use super::registry::{Binding, Callable, HandlerTable};
use super::{HandlerFn, Ticket};
use crate::convert;
use crate::error::{Error, Result};
use crate::events;
use crate::lock::{read, write};
use crate::node::Node;
use crate::value::Value;

const PRE_CONDITION: &str = "pre-condition";
const POST_CONDITION: &str = "post-condition";

/// The argument handed to every handler of a raised event.
#[derive(Debug)]
pub struct EventArgs {
    name: String,
    args: Node,
}

impl EventArgs {
    pub fn new(name: impl Into<String>, args: Node) -> Self {
        Self { name: name.into(), args }
    }

    /// Name the event was raised under. Catch-all handlers use this to tell events apart.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The argument node. Handlers report results by mutating it.
    pub fn args(&self) -> &Node {
        &self.args
    }

    pub fn into_args(self) -> Node {
        self.args
    }
}

struct ContextInner {
    statics: Arc<HandlerTable>,
    instances: RwLock<HandlerTable>,
    ticket: RwLock<Ticket>,
}

/// Session-scoped dispatch handle: the static handlers captured at creation, the instance
/// bindings made through this context, and the ticket events are raised under.
///
/// Cloning a context shares it.
#[derive(Clone)]
pub struct Context(Arc<ContextInner>);

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("ticket", &*read(&self.0.ticket))
            .field("statics", &self.0.statics.names().count())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub(crate) fn new(statics: Arc<HandlerTable>, ticket: Ticket) -> Self {
        Context(Arc::new(ContextInner {
            statics,
            instances: RwLock::new(HandlerTable::default()),
            ticket: RwLock::new(ticket),
        }))
    }

    pub fn ticket(&self) -> Ticket {
        read(&self.0.ticket).clone()
    }

    /// Replaces the ticket. Only native code holding the context can do this; there is no
    /// event for it.
    pub fn change_ticket(&self, ticket: Ticket) {
        *write(&self.0.ticket) = ticket;
    }

    /// Raises `name` with `args` (an empty node if `None`) and returns the argument node after
    /// every handler ran.
    ///
    /// Handlers run in registration order: static bindings, then instance bindings, then the
    /// catch-all bindings. If the ticket carries a whitelist and `name` is not privileged (see
    /// [`events::is_privileged`]), the event must be declared in the whitelist and its
    /// pre- and post-conditions must verify, otherwise a [`Error::Security`] is returned.
    pub fn raise(&self, name: &str, args: Option<Node>) -> Result<Node> {
        let args = args.unwrap_or_default();
        let whitelist = read(&self.0.ticket).whitelist.clone();
        match whitelist {
            Some(whitelist) if !events::is_privileged(name) => {
                self.raise_whitelisted(name, args, &whitelist)
            }
            _ => self.invoke(name, args),
        }
    }

    /// True if `name` has at least one name-specific binding. Catch-all bindings do not count.
    pub fn has_event(&self, name: &str) -> bool {
        name != events::CATCH_ALL
            && (self.0.statics.contains(name) || read(&self.0.instances).contains(name))
    }

    /// Every event name with a name-specific binding, sorted.
    pub fn events(&self) -> Vec<String> {
        let instances = read(&self.0.instances);
        let mut names: Vec<String> =
            self.0.statics.names().chain(instances.names()).map(str::to_owned).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Binds `handler` to `name` for this context. Returns false if it was already bound.
    pub fn bind(&self, name: &str, handler: HandlerFn) -> bool {
        write(&self.0.instances).bind(name, Binding::from_fn(handler))
    }

    pub fn unbind(&self, name: &str, handler: HandlerFn) -> bool {
        let id = handler as usize;
        write(&self.0.instances)
            .unbind(name, |binding| binding.instance().is_none() && binding.handler() == id)
            > 0
    }

    /// Binds a method of `instance` to `name`. Returns false if it was already bound.
    pub fn bind_instance<T>(&self, name: &str, instance: &Arc<T>, handler: InstanceHandlerFn<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        write(&self.0.instances).bind(name, instance_binding(instance, handler))
    }

    /// Removes the bindings of `instance` for `name`.
    pub fn unbind_instance(&self, name: &str, instance: InstanceId) -> usize {
        write(&self.0.instances).unbind(name, |binding| binding.instance() == Some(instance))
    }

    /// Binds every handler `T` declares against `instance`.
    pub fn register_listener<T: EventListener>(&self, instance: Arc<T>) -> Result<InstanceId> {
        let handlers = T::handlers();
        if handlers.is_empty() {
            return Err(Error::registration(format!(
                "{} declares no event handlers",
                std::any::type_name::<T>()
            )));
        }
        if handlers.iter().any(|entry| entry.events.is_empty()) {
            return Err(Error::registration(format!(
                "{} declares a handler without event names",
                std::any::type_name::<T>()
            )));
        }

        let mut table = write(&self.0.instances);
        for entry in handlers {
            for event in entry.events {
                table.bind(event, instance_binding(&instance, entry.handler));
            }
        }
        Ok(InstanceId::of(&instance))
    }

    /// Removes every binding of `instance`, under any name.
    pub fn unregister_listener(&self, instance: InstanceId) -> usize {
        write(&self.0.instances).unbind_instance(instance)
    }

    fn invoke(&self, name: &str, args: Node) -> Result<Node> {
        let bindings = self.bindings_for(name);
        trace!(event = name, handlers = bindings.len(), "raising event");
        let event = EventArgs::new(name, args);
        for binding in &bindings {
            binding.invoke(self, &event)?;
        }
        Ok(event.into_args())
    }

    /// Snapshot of the bindings to run, so handlers may bind and raise re-entrantly.
    fn bindings_for(&self, name: &str) -> SmallVec<[Binding; 4]> {
        let statics = &self.0.statics;
        let instances = read(&self.0.instances);
        let mut bindings = SmallVec::with_capacity(
            statics.bindings(name).len()
                + instances.bindings(name).len()
                + statics.catch_all().len()
                + instances.catch_all().len(),
        );
        bindings.extend(statics.bindings(name).iter().cloned());
        bindings.extend(instances.bindings(name).iter().cloned());
        bindings.extend(statics.catch_all().iter().cloned());
        bindings.extend(instances.catch_all().iter().cloned());
        bindings
    }

    fn raise_whitelisted(&self, name: &str, args: Node, whitelist: &Node) -> Result<Node> {
        let Some(declaration) = whitelist.find(|entry| entry.has_name(name)) else {
            warn!(event = name, "event not authorized by whitelist");
            return Err(Error::security(format!("event '{name}' is not authorized")));
        };
        for condition in declaration.children_named(PRE_CONDITION) {
            self.verify(events::PRE_CONDITION, name, &condition, &args)?;
        }
        let result = self.invoke(name, args)?;
        for condition in declaration.children_named(POST_CONDITION) {
            self.verify(events::POST_CONDITION, name, &condition, &result)?;
        }
        Ok(result)
    }

    /// Raises `<prefix><verifier>` with a node named after the verified event, holding the
    /// condition and the subject as node values. The verifier accepts by setting the node's
    /// value to `true`.
    fn verify(&self, prefix: &str, event: &str, condition: &Node, subject: &Node) -> Result<()> {
        let verifier = convert::to_string(self, &condition.value());
        let verification = format!("{prefix}{verifier}");
        if verifier.is_empty() || !self.has_event(&verification) {
            warn!(event, verifier = %verifier, "no verifier for whitelist condition");
            return Err(Error::security(format!(
                "condition '{verifier}' on event '{event}' has no verifier"
            )));
        }

        let payload = Node::new(event);
        payload.add_new("condition", Value::Node(condition.clone()));
        payload.add_new("args", Value::Node(subject.clone()));
        let verdict = self.raise(&verification, Some(payload))?;
        if convert::convert(self, &verdict.value(), false) {
            Ok(())
        } else {
            warn!(event, verifier = %verifier, "whitelist condition failed");
            Err(Error::security(format!("condition '{verifier}' rejected event '{event}'")))
        }
    }
}

fn instance_binding<T>(instance: &Arc<T>, handler: InstanceHandlerFn<T>) -> Binding
where
    T: Send + Sync + 'static,
{
    let target = Arc::clone(instance);
    let call: Callable =
        Arc::new(move |ctx: &Context, args: &EventArgs| handler(&target, ctx, args));
    Binding::new(handler as usize, Some(InstanceId::of(instance)), call)
}

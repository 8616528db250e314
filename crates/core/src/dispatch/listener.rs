use std::sync::Arc;

use super::{Context, EventArgs};
use crate::error::Result;

/// Identity of a listener instance bound into a [`Context`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) usize);

impl InstanceId {
    pub fn of<T: ?Sized>(instance: &Arc<T>) -> Self {
        InstanceId(Arc::as_ptr(instance).cast::<()>() as usize)
    }
}

pub type InstanceHandlerFn<T> = fn(&T, &Context, &EventArgs) -> Result<()>;

/// One instance handler and the events it listens to.
pub struct ListenerHandler<T: 'static> {
    pub events: &'static [&'static str],
    pub handler: InstanceHandlerFn<T>,
}

/// Types whose instances carry event handlers.
///
/// A listener that embeds another listener lists the embedded handlers in its own table,
/// forwarding to the embedded value.
///
/// ```ignore
/// struct Counter(AtomicUsize);
///
/// impl Counter {
///     fn on_tick(&self, _ctx: &Context, _args: &EventArgs) -> nodal_core::Result<()> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl EventListener for Counter {
///     fn handlers() -> &'static [ListenerHandler<Self>] {
///         const HANDLERS: &[ListenerHandler<Counter>] =
///             &[ListenerHandler { events: &["tick"], handler: Counter::on_tick }];
///         HANDLERS
///     }
/// }
///
/// let id = ctx.register_listener(Arc::new(Counter(AtomicUsize::new(0))))?;
/// ```
pub trait EventListener: Send + Sync + Sized + 'static {
    fn handlers() -> &'static [ListenerHandler<Self>];
}

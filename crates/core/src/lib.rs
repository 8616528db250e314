//! Core of Nodal: a generic labeled tree, name-addressed event dispatch with per-context
//! authorization, and a path expression language over the tree.

pub mod convert;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod expression;
mod lock;
pub mod node;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[doc(hidden)]
pub use inventory;

pub use convert::{Convertible, convert, convert_alias, to_string};
pub use dispatch::{
    Context, EventArgs, EventListener, HandlerFn, InstanceId, ListenerHandler, Loader, Module,
    ModuleBuilder, Ticket,
};
pub use error::{Error, ErrorKind, Result, SyntaxError};
pub use expression::{Expression, Match, MatchEntity, ResultType};
pub use node::Node;
pub use value::{Opaque, Value};

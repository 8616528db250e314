pub mod events;
pub mod query;
pub mod raise;

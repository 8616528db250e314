//! Well-known event names and reserved prefixes.

/// Events starting with this marker are plumbing used by the core itself; they bypass
/// whitelist checks.
pub const INTERNAL_PREFIX: &str = ".";

/// Events starting with this marker are meant to be raised from native code only; they
/// bypass whitelist checks as well.
pub const NATIVE_PREFIX: &str = "_";

/// Name of the catch-all binding, invoked after the name-specific bindings of every event.
pub const CATCH_ALL: &str = "";

/// Raised once on every freshly created [`Context`](crate::Context).
pub const CONTEXT_INITIALIZED: &str = ".context-initialized";

/// `<prefix><type-name>`: produce a string for a value of the given runtime type.
pub const GET_STRING_VALUE: &str = ".get-string-value.";

/// `<prefix><type-key>`: produce the short alias for a native type.
pub const GET_TYPE_NAME: &str = ".get-type-name.";

/// `<prefix><alias>`: materialize a value of the aliased type.
pub const GET_OBJECT_VALUE: &str = ".get-object-value.";

/// `<prefix><verifier>`: verify a whitelist pre-condition.
pub const PRE_CONDITION: &str = ".whitelist.pre-condition.";

/// `<prefix><verifier>`: verify a whitelist post-condition.
pub const POST_CONDITION: &str = ".whitelist.post-condition.";

/// Returns true if `name` is exempt from whitelist checks.
pub fn is_privileged(name: &str) -> bool {
    name.starts_with(INTERNAL_PREFIX) || name.starts_with(NATIVE_PREFIX)
}

use crate::node::Node;

/// Identity, role and optional whitelist a [`Context`](super::Context) raises events under.
///
/// Without a whitelist every event may be raised. With one, only events declared as children of
/// the whitelist node are permitted; see [`Context::raise`](super::Context::raise).
#[derive(Clone, Debug, Default)]
pub struct Ticket {
    pub username: String,
    pub role: String,
    /// True for the anonymous ticket a context starts with when none is supplied.
    pub is_default: bool,
    pub whitelist: Option<Node>,
}

impl Ticket {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self { username: username.into(), role: role.into(), is_default: false, whitelist: None }
    }

    pub fn anonymous() -> Self {
        Self { is_default: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_whitelist(mut self, whitelist: Node) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    pub fn in_role(&self, role: &str) -> bool {
        self.role.split(',').any(|candidate| candidate.trim() == role)
    }
}

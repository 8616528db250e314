use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of [`Error`] values.
///
/// Callers typically only need to tell authorization failures apart from genuine
/// failures; the kind makes that possible without matching on every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Syntax,
    Security,
    Registration,
    Handler,
}

/// Malformed expression text. Always carries the expression it was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error in expression '{expression}': {message}")]
pub struct SyntaxError {
    pub message: String,
    pub expression: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self { message: message.into(), expression: expression.into() }
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("security violation: {0}")]
    Security(String),
    #[error("registration failed: {0}")]
    Registration(String),
    #[error("{message}")]
    Handler {
        message: String,
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn syntax(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Error::Syntax(SyntaxError::new(message, expression))
    }

    pub fn security(message: impl Into<String>) -> Self {
        Error::Security(message.into())
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Error::Registration(message.into())
    }

    /// Error raised from inside an event handler.
    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler { message: message.into(), source: None }
    }

    /// Wraps an arbitrary error produced by handler code, keeping it as the source.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Handler { message: error.to_string(), source: Some(Arc::new(error)) }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Security(_) => ErrorKind::Security,
            Error::Registration(_) => ErrorKind::Registration,
            Error::Handler { .. } => ErrorKind::Handler,
        }
    }

    pub fn is_security(&self) -> bool {
        self.kind() == ErrorKind::Security
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Security => "security",
            ErrorKind::Registration => "registration",
            ErrorKind::Handler => "handler",
        };
        f.write_str(text)
    }
}

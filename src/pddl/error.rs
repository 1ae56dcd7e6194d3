use std::time::Duration;

/// Every failure the parsers, the model constructors and the grounding code can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The text does not have the expected structure.
    #[error("syntax error: {message} in `{fragment}`")]
    Syntax { message: String, fragment: String },

    /// A value was built with arguments that break its invariants.
    #[error("construction error: {0}")]
    Construction(String),

    /// A formula was grounded or evaluated in a position it does not support.
    #[error("unsupported use: {0}")]
    Usage(String),

    #[error("planning failed: {0}")]
    Planning(String),

    #[error("planning timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

const MAX_FRAGMENT: usize = 120;

impl Error {
    pub fn syntax(message: impl Into<String>, fragment: &str) -> Self {
        let fragment = fragment.trim();
        let fragment = match fragment.char_indices().nth(MAX_FRAGMENT) {
            Some((cut, _)) => format!("{}...", &fragment[..cut]),
            None => fragment.to_owned(),
        };
        Error::Syntax { message: message.into(), fragment }
    }

    pub fn construction(message: impl Into<String>) -> Self {
        Error::Construction(message.into())
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    /// Prefixes the message with the place the error surfaced in.
    pub fn context(self, place: impl std::fmt::Display) -> Self {
        match self {
            Error::Syntax { message, fragment } => Error::Syntax { message: format!("{}: {}", place, message), fragment },
            Error::Construction(m) => Error::Construction(format!("{}: {}", place, m)),
            Error::Usage(m) => Error::Usage(format!("{}: {}", place, m)),
            Error::Planning(m) => Error::Planning(format!("{}: {}", place, m)),
            other => other,
        }
    }
}

//! Non-fatal, accumulated errors produced during resolve phases.
//!
//! A `Diagnostic` never aborts parsing; it is appended to the owning
//! entity's list and the caller inspects `errors()` afterward to tell a
//! clean parse from a dirty one.

use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub offset: u64,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, offset: u64) -> Self {
        Diagnostic {
            message: message.into(),
            offset,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.offset)
    }
}

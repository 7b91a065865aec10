//! Logical resource identity.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Identifies a resource within a stack by its type token and logical name.
///
/// Providers may hand out any physical id (the operator providers always use
/// `"0"`), so the host keys all state by URN instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Urn {
    stack: String,
    type_token: String,
    name: String,
}

impl Urn {
    pub fn new(
        stack: impl Into<String>,
        type_token: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            type_token: type_token.into(),
            name: name.into(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn type_token(&self) -> &str {
        &self.type_token
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "urn:fixture:{}::{}::{}",
            self.stack, self.type_token, self.name
        )
    }
}

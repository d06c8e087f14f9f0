use std::fmt;

use crate::shared::constants::UNKNOWN_IDENTITY;

/// Who a detected face was resolved to.
///
/// All unrecognized faces share the single `Unknown` value, so they also
/// share one throttle bucket. A person enrolled under the literal name
/// "unknown" is still `Known` and keeps a bucket of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Known(String),
    Unknown,
}

impl Identity {
    pub fn known(name: impl Into<String>) -> Self {
        Identity::Known(name.into())
    }

    pub fn from_match(name: Option<String>) -> Self {
        name.map_or(Identity::Unknown, Identity::Known)
    }

    /// Name sent to notification consumers.
    pub fn wire_name(&self) -> &str {
        match self {
            Identity::Known(name) => name,
            Identity::Unknown => UNKNOWN_IDENTITY,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

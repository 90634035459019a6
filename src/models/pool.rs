//! Application pool model

use serde::{Deserialize, Serialize};

use super::ObjectState;

/// An application pool as enumerated from the server manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPool {
    pub name: String,
    pub state: ObjectState,
    /// Managed runtime, e.g. `v4.0`; empty for "No Managed Code"
    pub runtime_version: String,
}

impl AppPool {
    pub fn new(name: impl Into<String>, state: ObjectState) -> Self {
        Self {
            name: name.into(),
            state,
            runtime_version: String::new(),
        }
    }

    pub fn with_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = version.into();
        self
    }
}

/// Result of a start/stop request
///
/// A transition is only issued when the pool is in the expected prior state;
/// otherwise the request is skipped and the observed state is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Applied,
    Skipped { current: ObjectState },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Applied => write!(f, "applied"),
            Transition::Skipped { current } => write!(f, "skipped (pool is {})", current),
        }
    }
}

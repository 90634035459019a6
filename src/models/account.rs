//! Local account models

use serde::{Deserialize, Serialize};

/// A local account to create through the WinNT provider
#[derive(Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub description: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("description", &self.description)
            .finish()
    }
}

/// Outcome of account creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    /// ADsPath of the new account, e.g. `WinNT://HOST/alice`
    pub path: String,
    /// Group the account joined; `None` when the group does not exist
    pub group: Option<String>,
}

//! Local OS accounts

use tracing::info;

use super::{validate_name, IisAdmin};
use crate::models::{CreatedUser, NewUser};
use crate::{Error, Result};

impl IisAdmin {
    /// Create a local account and join it to the configured guest group if present
    pub fn create_user(&self, username: &str, password: &str, description: &str) -> Result<CreatedUser> {
        validate_name("user name", username)?;

        let path = self.accounts.create_user(&NewUser {
            username: username.to_string(),
            password: password.to_string(),
            description: description.to_string(),
        })?;
        info!(user = username, path = %path, "account created");

        let group = &self.config.guest_group;
        if !self.accounts.group_exists(group)? {
            info!(group = %group, "group not found; account left without membership");
            return Ok(CreatedUser { path, group: None });
        }

        self.accounts.add_group_member(group, &path)?;
        info!(user = username, group = %group, "account added to group");
        Ok(CreatedUser {
            path,
            group: Some(group.clone()),
        })
    }

    pub fn remove_user(&self, username: &str) -> Result<()> {
        validate_name("user name", username)?;
        self.accounts.remove_user(username)?;
        info!(user = username, "account removed");
        Ok(())
    }

    /// Add an existing local account to a local group
    pub fn add_user_to_group(&self, username: &str, group: &str) -> Result<()> {
        validate_name("user name", username)?;
        if !self.accounts.group_exists(group)? {
            return Err(Error::not_found("Group", group));
        }

        let member = format!("{}/{}", self.config.account_root(), username);
        self.accounts.add_group_member(group, &member)?;
        info!(user = username, group, "account added to group");
        Ok(())
    }
}

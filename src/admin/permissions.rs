//! File system permission grants

use tracing::{info, warn};

use super::IisAdmin;
use crate::{Error, Result};

/// Arguments granting `user` inherited, recursive modify rights on `dir`
pub fn modify_grant_args(dir: &str, user: &str) -> Vec<String> {
    vec![
        dir.to_string(),
        "/grant".to_string(),
        format!("{}:(OI)(CI)M", user),
        "/T".to_string(),
    ]
}

impl IisAdmin {
    /// Grant `user` modify rights on `dir` and everything below it
    ///
    /// Returns the tool's standard output on success.
    pub fn set_modify_web_permissions(&self, dir: &str, user: &str) -> Result<String> {
        if dir.trim().is_empty() || user.trim().is_empty() {
            return Err(Error::InvalidArgument("directory and user are required".into()));
        }

        let program = &self.config.permission_tool;
        let output = self.runner.run(program, &modify_grant_args(dir, user))?;
        if !output.success() {
            warn!(dir, user, code = ?output.code, stderr = %output.stderr.trim(), "permission grant failed");
            return Err(Error::CommandFailed {
                program: program.clone(),
                code: output.code,
                stderr: output.stderr,
            });
        }

        info!(dir, user, "modify permission granted");
        Ok(output.stdout)
    }
}

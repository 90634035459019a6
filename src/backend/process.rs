//! External program execution

use std::process::Command;

use super::{CommandOutput, CommandRunner};
use crate::Result;

/// Runs programs directly (no shell) and captures their output
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, "spawning");
        let output = Command::new(program).args(args).output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_io_error() {
        let err = SystemCommandRunner
            .run("iis-admin-no-such-program", &[])
            .unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}

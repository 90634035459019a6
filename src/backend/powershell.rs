//! PowerShell script execution

use std::process::Command;

use base64::Engine as _;
use serde::de::DeserializeOwned;

use crate::models::PropertyValue;
use crate::{Error, Result};

/// Every script fails fast so .NET exceptions surface as a non-zero exit.
/// Redirected output is UTF-8 rather than the OEM code page.
const PRELUDE: &str = "$ErrorActionPreference = 'Stop'\n\
$ProgressPreference = 'SilentlyContinue'\n\
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8\n";

/// Runs scripts through a PowerShell host
#[derive(Debug, Clone)]
pub struct PowerShell {
    program: String,
}

impl PowerShell {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Execute a script and return its stdout
    pub fn run(&self, script: &str) -> Result<String> {
        self.run_with_env(script, &[])
    }

    /// Execute a script with extra environment variables, so secrets never
    /// appear on the command line
    pub fn run_with_env(&self, script: &str, env: &[(&str, &str)]) -> Result<String> {
        let full = with_prelude(script);
        tracing::debug!(program = %self.program, "dispatching script:\n{}", script);

        let output = Command::new(&self.program)
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-EncodedCommand",
                &encode_script(&full),
            ])
            .envs(env.iter().copied())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(Error::PowerShell(format!(
                "Exit code: {:?}\nStderr: {}\nStdout: {}",
                output.status.code(),
                stderr.trim(),
                stdout.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Execute a script ending in `ConvertTo-Json` and decode a list of rows
    pub fn run_json<T: DeserializeOwned>(&self, script: &str) -> Result<Vec<T>> {
        parse_json_rows(&self.run(script)?)
    }
}

fn with_prelude(script: &str) -> String {
    format!("{}{}", PRELUDE, script)
}

/// `ConvertTo-Json` emits nothing for an empty pipeline and a bare object for
/// a single item
pub fn parse_json_rows<T: DeserializeOwned>(output: &str) -> Result<Vec<T>> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(vec![]);
    }

    if trimmed.starts_with('[') {
        Ok(serde_json::from_str(trimmed)?)
    } else {
        let single: T = serde_json::from_str(trimmed)?;
        Ok(vec![single])
    }
}

/// Base64 of the UTF-16LE script, as `-EncodedCommand` expects
pub fn encode_script(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Single-quoted PowerShell string literal
///
/// PowerShell also treats typographic single quotes as delimiters.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// PowerShell literal for a metabase property value
pub fn literal(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Bool(true) => "$true".to_string(),
        PropertyValue::Bool(false) => "$false".to_string(),
        PropertyValue::Int(n) => n.to_string(),
        PropertyValue::Text(s) => quote(s),
        PropertyValue::List(items) => {
            let items: Vec<String> = items.iter().map(|s| quote(s)).collect();
            format!("[object[]]@({})", items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("test"), "'test'");
        assert_eq!(quote("test's"), "'test''s'");
        assert_eq!(quote("it\u{2019}s"), "'it\u{2019}\u{2019}s'");
        assert_eq!(quote(r"C:\inetpub\wwwroot"), r"'C:\inetpub\wwwroot'");
    }

    #[test]
    fn test_literal() {
        assert_eq!(literal(&PropertyValue::Bool(true)), "$true");
        assert_eq!(literal(&PropertyValue::Int(2)), "2");
        assert_eq!(literal(&PropertyValue::from("a'b")), "'a''b'");
        assert_eq!(
            literal(&PropertyValue::List(vec![":80:".into(), ":81:x".into()])),
            "[object[]]@(':80:', ':81:x')"
        );
    }

    #[test]
    fn test_encode_script() {
        // "ls" as UTF-16LE is 6C 00 73 00
        assert_eq!(encode_script("ls"), "bABzAA==");
    }

    #[test]
    fn test_prelude_outputs_utf8() {
        let script = with_prelude("Get-Website");
        let mut lines = script.lines();
        assert_eq!(lines.next(), Some("$ErrorActionPreference = 'Stop'"));
        assert!(script.contains("[Console]::OutputEncoding = [System.Text.Encoding]::UTF8\n"));
        assert!(script.ends_with("\nGet-Website"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Row {
        #[serde(rename = "Name")]
        name: String,
    }

    #[test]
    fn test_parse_json_rows_shapes() {
        let rows: Vec<Row> = parse_json_rows("").unwrap();
        assert!(rows.is_empty());

        let rows: Vec<Row> = parse_json_rows("{\"Name\":\"a\"}\r\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "a");

        let rows: Vec<Row> = parse_json_rows("[{\"Name\":\"a\"},{\"Name\":\"b\"}]").unwrap();
        assert_eq!(rows.len(), 2);
    }
}

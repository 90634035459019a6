//! Error types for IIS administration

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Website with ID {0} not found")]
    SiteIdNotFound(u64),

    #[error("{path} is a {class} node; only site or virtual directory nodes can hold virtual directories")]
    InvalidSchemaClass { path: String, class: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid metabase path: {0}")]
    InvalidMetabasePath(String),

    #[error("Administration backend error: {0}")]
    Backend(String),

    #[error("PowerShell failed: {0}")]
    PowerShell(String),

    #[error("{program} exited with {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Error::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Check if this is any flavour of missing-entity error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::SiteIdNotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("Site", "Default");
        assert_eq!(err.to_string(), "Site not found: Default");
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_site_id_not_found_is_not_found() {
        assert!(Error::SiteIdNotFound(7).is_not_found());
    }
}

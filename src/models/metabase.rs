//! Legacy metabase addressing and property values

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const SCHEME: &str = "IIS://";

/// A value stored in a metabase property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::List(v)
    }
}

impl PropertyValue {
    /// Values as a list; a scalar becomes a one-element list
    pub fn into_list(self) -> Vec<String> {
        match self {
            PropertyValue::List(v) => v,
            PropertyValue::Text(s) => vec![s],
            PropertyValue::Bool(b) => vec![b.to_string()],
            PropertyValue::Int(n) => vec![n.to_string()],
        }
    }
}

/// Property bag committed to a metabase node in one call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Path of the form `IIS://<host>/<service>/<siteId>/Root[/<child>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetabasePath {
    host: String,
    segments: Vec<String>,
}

impl MetabasePath {
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .get(..SCHEME.len())
            .filter(|scheme| scheme.eq_ignore_ascii_case(SCHEME))
            .map(|_| &path[SCHEME.len()..])
            .ok_or_else(|| Error::InvalidMetabasePath(path.to_string()))?;

        let mut parts = rest.split('/').filter(|s| !s.is_empty());
        let host = parts
            .next()
            .ok_or_else(|| Error::InvalidMetabasePath(path.to_string()))?
            .to_string();
        let segments: Vec<String> = parts.map(str::to_string).collect();
        if segments.is_empty() {
            return Err(Error::InvalidMetabasePath(path.to_string()));
        }

        Ok(Self { host, segments })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Node name (last segment)
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.trim_matches('/').to_string());
        Self {
            host: self.host.clone(),
            segments,
        }
    }

    /// Application root key of this node, e.g. `/LM/W3SVC/1/Root/app`
    pub fn app_root(&self) -> String {
        format!("/LM/{}", self.segments.join("/"))
    }
}

impl std::fmt::Display for MetabasePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.host, self.segments.join("/"))
    }
}

/// Class of the virtual directory node that may be created under `class`
///
/// Sites (`IIsWebServer`, `IIsFtpServer`) and virtual directories hold
/// virtual directories; every other node class is rejected.
pub fn virtual_dir_class(class: &str) -> Option<String> {
    if let Some(prefix) = class.strip_suffix("Server") {
        Some(format!("{}VirtualDir", prefix))
    } else if class.ends_with("VirtualDir") {
        Some(class.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = MetabasePath::parse("IIS://localhost/W3SVC/1/Root").unwrap();
        assert_eq!(path.host(), "localhost");
        assert_eq!(path.name(), "Root");
        assert_eq!(path.to_string(), "IIS://localhost/W3SVC/1/Root");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let path = MetabasePath::parse("iis://Localhost/MSFTPSVC/1/Root/").unwrap();
        assert_eq!(path.to_string(), "IIS://Localhost/MSFTPSVC/1/Root");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(MetabasePath::parse("WinNT://HOST").is_err());
        assert!(MetabasePath::parse("IIS://localhost").is_err());
        assert!(MetabasePath::parse("").is_err());
    }

    #[test]
    fn test_app_root_of_child() {
        let root = MetabasePath::parse("IIS://localhost/W3SVC/1/Root").unwrap();
        let child = root.child("shop");
        assert_eq!(child.to_string(), "IIS://localhost/W3SVC/1/Root/shop");
        assert_eq!(child.app_root(), "/LM/W3SVC/1/Root/shop");
    }

    #[test]
    fn test_virtual_dir_class() {
        assert_eq!(virtual_dir_class("IIsWebServer").as_deref(), Some("IIsWebVirtualDir"));
        assert_eq!(virtual_dir_class("IIsFtpVirtualDir").as_deref(), Some("IIsFtpVirtualDir"));
        assert_eq!(virtual_dir_class("IIsWebService"), None);
        assert_eq!(virtual_dir_class("IIsWebDirectory"), None);
    }

    #[test]
    fn test_property_value_list() {
        assert_eq!(PropertyValue::from("a").into_list(), vec!["a".to_string()]);
        assert_eq!(PropertyValue::from(true).into_list(), vec!["true".to_string()]);
    }
}

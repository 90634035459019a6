//! Site model

use serde::{Deserialize, Serialize};

/// Run state reported by IIS for sites and application pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectState {
    Starting,
    Started,
    Stopping,
    Stopped,
    #[default]
    Unknown,
}

impl std::fmt::Display for ObjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectState::Starting => write!(f, "Starting"),
            ObjectState::Started => write!(f, "Started"),
            ObjectState::Stopping => write!(f, "Stopping"),
            ObjectState::Stopped => write!(f, "Stopped"),
            ObjectState::Unknown => write!(f, "Unknown"),
        }
    }
}

impl ObjectState {
    /// Map the `ObjectState` name IIS reports; anything unrecognised is `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "Starting" => ObjectState::Starting,
            "Started" => ObjectState::Started,
            "Stopping" => ObjectState::Stopping,
            "Stopped" => ObjectState::Stopped,
            _ => ObjectState::Unknown,
        }
    }
}

/// A configured site as enumerated from the server manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: u64,
    pub name: String,
    pub state: ObjectState,
}

/// A site binding, e.g. protocol `http` with information `*:80:example.com`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub protocol: String,
    pub binding_information: String,
}

impl Binding {
    pub fn new(protocol: impl Into<String>, binding_information: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            binding_information: binding_information.into(),
        }
    }

    pub fn http(binding_information: impl Into<String>) -> Self {
        Self::new("http", binding_information)
    }

    /// Split `address:port:host` from the right, so IPv6 addresses such as
    /// `[::1]` keep their colons
    fn segments(&self) -> Option<(&str, &str, &str)> {
        let mut parts = self.binding_information.rsplitn(3, ':');
        let host = parts.next()?;
        let port = parts.next()?;
        let address = parts.next()?;
        Some((address, port, host))
    }

    /// Port segment of `address:port:host`, if the binding uses that form
    pub fn port(&self) -> Option<u16> {
        self.segments()?.1.parse().ok()
    }

    /// Host header segment of `address:port:host` (empty when unset)
    pub fn host(&self) -> &str {
        self.segments().map(|(_, _, host)| host).unwrap_or("")
    }

    /// `protocol://host:port` rendering used by the site table
    pub fn display_url(&self) -> String {
        let port = self.port().map(|p| p.to_string()).unwrap_or_default();
        format!("{}://{}:{}", self.protocol, self.host(), port)
    }
}

/// A site with the outcome of its per-site lookups; `None` marks a failed lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    pub site: Site,
    pub bindings: Option<Vec<Binding>>,
    pub physical_path: Option<String>,
}

/// Parameters for a site created through the server manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSite {
    pub name: String,
    pub binding: Binding,
    pub physical_path: String,
    pub app_pool: String,
}

/// One row of the site information table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, tabled::Tabled)]
pub struct WebsiteRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "PhysicalPath")]
    pub physical_path: String,
    #[tabled(rename = "Bindings")]
    pub bindings: String,
}

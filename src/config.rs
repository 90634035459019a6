//! Administration configuration with builder pattern

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::MetabasePath;

/// Legacy web service node used by the metabase site operations
pub const DEFAULT_WEB_SERVICE_PATH: &str = "IIS://localhost/W3SVC";

/// Root of the default FTP site, under which per-user directories live
pub const DEFAULT_FTP_ROOT: &str = "IIS://localhost/MSFTPSVC/1/Root";

/// ASP.NET 4 mapping applied to `.htm` files in new metabase virtual directories
pub const DEFAULT_SCRIPT_MAP: &str =
    r".htm,C:\Windows\Microsoft.NET\Framework\v4.0.30319\aspnet_isapi.dll,5,GET, HEAD, POST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Machine addressed by `WinNT://` account paths
    pub host: String,
    pub web_service_path: String,
    pub ftp_root: String,
    /// Group every created account joins, if it exists
    pub guest_group: String,
    /// Recursive ACL tool used for permission grants
    pub permission_tool: String,
    pub powershell: String,
    pub script_map: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: crate::host::machine_name(),
            web_service_path: DEFAULT_WEB_SERVICE_PATH.to_string(),
            ftp_root: DEFAULT_FTP_ROOT.to_string(),
            guest_group: "Guests".to_string(),
            permission_tool: "icacls".to_string(),
            powershell: "powershell".to_string(),
            script_map: DEFAULT_SCRIPT_MAP.to_string(),
        }
    }
}

impl AdminConfig {
    pub fn builder() -> AdminConfigBuilder {
        AdminConfigBuilder::default()
    }

    /// Load a JSON config file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: AdminConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::Error::Config("host cannot be empty".into()));
        }
        if self.guest_group.trim().is_empty() {
            return Err(crate::Error::Config("guest_group cannot be empty".into()));
        }
        if self.permission_tool.trim().is_empty() {
            return Err(crate::Error::Config("permission_tool cannot be empty".into()));
        }
        if self.powershell.trim().is_empty() {
            return Err(crate::Error::Config("powershell cannot be empty".into()));
        }
        MetabasePath::parse(&self.web_service_path)
            .map_err(|e| crate::Error::Config(format!("web_service_path: {}", e)))?;
        MetabasePath::parse(&self.ftp_root)
            .map_err(|e| crate::Error::Config(format!("ftp_root: {}", e)))?;
        Ok(())
    }

    /// `WinNT://<host>` account container
    pub fn account_root(&self) -> String {
        format!("WinNT://{}", self.host)
    }
}

#[derive(Default)]
pub struct AdminConfigBuilder {
    config: AdminConfig,
}

impl AdminConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn web_service_path(mut self, path: impl Into<String>) -> Self {
        self.config.web_service_path = path.into();
        self
    }

    pub fn ftp_root(mut self, path: impl Into<String>) -> Self {
        self.config.ftp_root = path.into();
        self
    }

    pub fn guest_group(mut self, group: impl Into<String>) -> Self {
        self.config.guest_group = group.into();
        self
    }

    pub fn permission_tool(mut self, program: impl Into<String>) -> Self {
        self.config.permission_tool = program.into();
        self
    }

    pub fn powershell(mut self, program: impl Into<String>) -> Self {
        self.config.powershell = program.into();
        self
    }

    pub fn script_map(mut self, map: impl Into<String>) -> Self {
        self.config.script_map = map.into();
        self
    }

    pub fn build(self) -> AdminConfig {
        self.config
    }
}

//! Administrative backends
//!
//! [`IisAdmin`](crate::IisAdmin) talks to IIS and the local account store only
//! through these traits. The production implementations drive PowerShell
//! against `Microsoft.Web.Administration` and ADSI; [`MemoryBackend`] stands in
//! for all of them in tests.

pub mod adsi;
pub mod memory;
pub mod powershell;
pub mod process;
pub mod server_manager;

pub use adsi::{AdsiAccountStore, AdsiMetabase};
pub use memory::{Call, MemoryBackend, MEMORY_HOST};
pub use powershell::PowerShell;
pub use process::SystemCommandRunner;
pub use server_manager::PowerShellServerManager;

use crate::models::*;
use crate::Result;

/// Modern IIS configuration API (sites, applications, application pools)
#[cfg_attr(test, mockall::automock)]
pub trait ServerManager {
    fn sites(&self) -> Result<Vec<Site>>;

    /// Every site with its bindings and root physical path
    ///
    /// A failed lookup for one site yields `None` in that field and the
    /// remaining sites are still returned.
    fn site_summaries(&self) -> Result<Vec<SiteSummary>>;

    /// Applications of a site, the root application (`/`) included
    fn applications(&self, site_id: u64) -> Result<Vec<Application>>;

    /// Create a site and assign its root application pool in one commit
    fn create_site(&self, site: &NewSite) -> Result<u64>;

    fn remove_site(&self, site_id: u64) -> Result<()>;

    fn set_application_pool(&self, site_id: u64, app_path: &str, pool: &str) -> Result<()>;

    fn add_application(&self, site_id: u64, app: &Application) -> Result<()>;

    fn app_pools(&self) -> Result<Vec<AppPool>>;

    fn create_app_pool(&self, name: &str, runtime_version: &str) -> Result<()>;

    fn remove_app_pool(&self, name: &str) -> Result<()>;

    fn start_app_pool(&self, name: &str) -> Result<()>;

    fn stop_app_pool(&self, name: &str) -> Result<()>;
}

/// Legacy metabase reached through `IIS://` directory entries
#[cfg_attr(test, mockall::automock)]
pub trait Metabase {
    fn schema_class(&self, path: &str) -> Result<String>;

    /// Add a child node and commit all of `properties` with it
    fn create_child(&self, parent: &str, name: &str, class: &str, properties: &Properties) -> Result<()>;

    fn remove_child(&self, path: &str) -> Result<()>;

    fn get_property(&self, path: &str, name: &str) -> Result<Option<PropertyValue>>;

    fn set_properties(&self, path: &str, properties: &Properties) -> Result<()>;

    fn invoke(&self, path: &str, method: &str, args: &[PropertyValue]) -> Result<Option<PropertyValue>>;
}

/// Local accounts reached through the `WinNT://` provider
#[cfg_attr(test, mockall::automock)]
pub trait AccountStore {
    /// Create and commit an account, returning its ADsPath
    fn create_user(&self, user: &NewUser) -> Result<String>;

    fn group_exists(&self, group: &str) -> Result<bool>;

    fn add_group_member(&self, group: &str, member_path: &str) -> Result<()>;

    fn remove_user(&self, username: &str) -> Result<()>;
}

/// Captured result of an external program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

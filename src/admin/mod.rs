//! Administration session over injected backends

mod accounts;
mod applications;
mod ftp;
mod permissions;
mod pools;
mod sites;

pub use permissions::modify_grant_args;
pub use sites::DEFAULT_HOST_HEADER_PORT;

use crate::backend::{
    AccountStore, AdsiAccountStore, AdsiMetabase, CommandRunner, Metabase, PowerShell,
    PowerShellServerManager, ServerManager, SystemCommandRunner,
};
use crate::config::AdminConfig;
use crate::models::{AppPool, Site};
use crate::{Error, Result};

/// Entry point for every administrative operation
///
/// Holds no cached state: each operation re-queries the backends, so two
/// calls may observe different server state.
pub struct IisAdmin {
    config: AdminConfig,
    server: Box<dyn ServerManager>,
    metabase: Box<dyn Metabase>,
    accounts: Box<dyn AccountStore>,
    runner: Box<dyn CommandRunner>,
}

impl IisAdmin {
    /// Session against the local machine's IIS and account store
    pub fn local(config: AdminConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> IisAdminBuilder {
        IisAdminBuilder::default()
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    // ===== Shared lookups =====

    /// Find a site by name, falling back to a numeric ID
    pub(crate) fn find_site(&self, key: &str) -> Result<Site> {
        let all = self.server.sites()?;
        if let Some(site) = all.iter().find(|s| s.name.eq_ignore_ascii_case(key)) {
            return Ok(site.clone());
        }
        key.trim()
            .parse::<u64>()
            .ok()
            .and_then(|id| all.into_iter().find(|s| s.id == id))
            .ok_or_else(|| Error::not_found(sites::SITE, key))
    }

    pub(crate) fn find_site_by_name(&self, name: &str) -> Result<Option<Site>> {
        Ok(self
            .server
            .sites()?
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name)))
    }

    pub(crate) fn find_site_by_id(&self, id: u64) -> Result<Site> {
        self.server
            .sites()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(Error::SiteIdNotFound(id))
    }

    pub(crate) fn find_app_pool(&self, name: &str) -> Result<Option<AppPool>> {
        Ok(self
            .server
            .app_pools()?
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name)))
    }

    pub(crate) fn require_app_pool(&self, name: &str) -> Result<AppPool> {
        self.find_app_pool(name)?
            .ok_or_else(|| Error::not_found(pools::APP_POOL, name))
    }
}

/// Reject empty names and names that would address a different node
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} cannot be empty", kind)));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::InvalidArgument(format!(
            "{} cannot contain path separators: {}",
            kind, name
        )));
    }
    Ok(())
}

#[derive(Default)]
pub struct IisAdminBuilder {
    config: Option<AdminConfig>,
    server: Option<Box<dyn ServerManager>>,
    metabase: Option<Box<dyn Metabase>>,
    accounts: Option<Box<dyn AccountStore>>,
    runner: Option<Box<dyn CommandRunner>>,
}

impl IisAdminBuilder {
    pub fn config(mut self, config: AdminConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn server_manager(mut self, server: impl ServerManager + 'static) -> Self {
        self.server = Some(Box::new(server));
        self
    }

    pub fn metabase(mut self, metabase: impl Metabase + 'static) -> Self {
        self.metabase = Some(Box::new(metabase));
        self
    }

    pub fn account_store(mut self, accounts: impl AccountStore + 'static) -> Self {
        self.accounts = Some(Box::new(accounts));
        self
    }

    pub fn command_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Some(Box::new(runner));
        self
    }

    /// Validate the config and fill unset backends with the local implementations
    pub fn build(self) -> Result<IisAdmin> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let ps = PowerShell::new(&config.powershell);

        Ok(IisAdmin {
            server: self
                .server
                .unwrap_or_else(|| Box::new(PowerShellServerManager::new(ps.clone()))),
            metabase: self
                .metabase
                .unwrap_or_else(|| Box::new(AdsiMetabase::new(ps.clone()))),
            accounts: self
                .accounts
                .unwrap_or_else(|| Box::new(AdsiAccountStore::new(ps.clone(), config.account_root()))),
            runner: self.runner.unwrap_or_else(|| Box::new(SystemCommandRunner)),
            config,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::{MockAccountStore, MockCommandRunner, MockMetabase, MockServerManager};
    use crate::models::ObjectState;

    pub(crate) fn test_config() -> AdminConfig {
        AdminConfig::builder().host("WEB01").build()
    }

    /// Session where only the server manager is expected to be used
    pub(crate) fn with_server(server: MockServerManager) -> IisAdmin {
        IisAdmin::builder()
            .config(test_config())
            .server_manager(server)
            .metabase(MockMetabase::new())
            .account_store(MockAccountStore::new())
            .command_runner(MockCommandRunner::new())
            .build()
            .unwrap()
    }

    /// Session where only the metabase is expected to be used
    pub(crate) fn with_metabase(metabase: MockMetabase) -> IisAdmin {
        IisAdmin::builder()
            .config(test_config())
            .server_manager(MockServerManager::new())
            .metabase(metabase)
            .account_store(MockAccountStore::new())
            .command_runner(MockCommandRunner::new())
            .build()
            .unwrap()
    }

    pub(crate) fn with_accounts(accounts: MockAccountStore) -> IisAdmin {
        IisAdmin::builder()
            .config(test_config())
            .server_manager(MockServerManager::new())
            .metabase(MockMetabase::new())
            .account_store(accounts)
            .command_runner(MockCommandRunner::new())
            .build()
            .unwrap()
    }

    pub(crate) fn with_runner(runner: MockCommandRunner) -> IisAdmin {
        IisAdmin::builder()
            .config(test_config())
            .server_manager(MockServerManager::new())
            .metabase(MockMetabase::new())
            .account_store(MockAccountStore::new())
            .command_runner(runner)
            .build()
            .unwrap()
    }

    pub(crate) fn site(id: u64, name: &str) -> Site {
        Site {
            id,
            name: name.to_string(),
            state: ObjectState::Started,
        }
    }

    #[test]
    fn test_find_site_prefers_name_over_id() {
        let mut server = MockServerManager::new();
        server
            .expect_sites()
            .returning(|| Ok(vec![site(1, "2"), site(2, "Default")]));
        let admin = with_server(server);

        assert_eq!(admin.find_site("2").unwrap().id, 1);
        assert_eq!(admin.find_site("default").unwrap().id, 2);
        assert_eq!(admin.find_site("1").unwrap().name, "2");
        assert!(admin.find_site("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_site_by_id_is_typed() {
        let mut server = MockServerManager::new();
        server.expect_sites().returning(|| Ok(vec![site(1, "Default")]));
        let admin = with_server(server);

        assert!(matches!(admin.find_site_by_id(9), Err(Error::SiteIdNotFound(9))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = IisAdmin::builder()
            .config(AdminConfig::builder().host("").build())
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("FTP user", "alice").is_ok());
        assert!(validate_name("FTP user", " ").is_err());
        assert!(validate_name("FTP user", "../x").is_err());
    }
}

//! Application pool lifecycle

use tracing::{info, warn};

use super::IisAdmin;
use crate::models::{ObjectState, Transition};
use crate::{Error, Result};

pub(crate) const APP_POOL: &str = "Application pool";

impl IisAdmin {
    /// Create a pool running the given managed runtime (e.g. `v4.0`)
    pub fn create_app_pool(&self, name: &str, runtime_version: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("application pool name cannot be empty".into()));
        }
        if self.find_app_pool(name)?.is_some() {
            return Err(Error::already_exists(APP_POOL, name));
        }

        self.server.create_app_pool(name, runtime_version)?;
        info!(pool = name, runtime_version, "application pool created");
        Ok(())
    }

    pub fn remove_app_pool(&self, name: &str) -> Result<()> {
        let pool = self.require_app_pool(name)?;
        self.server.remove_app_pool(&pool.name)?;
        info!(pool = %pool.name, "application pool removed");
        Ok(())
    }

    /// Start a pool that is currently stopped
    pub fn start_app_pool(&self, name: &str) -> Result<Transition> {
        self.transition(name, ObjectState::Stopped, |pool| self.server.start_app_pool(pool))
    }

    /// Stop a pool that is currently started
    pub fn stop_app_pool(&self, name: &str) -> Result<Transition> {
        self.transition(name, ObjectState::Started, |pool| self.server.stop_app_pool(pool))
    }

    fn transition(
        &self,
        name: &str,
        expected: ObjectState,
        apply: impl FnOnce(&str) -> Result<()>,
    ) -> Result<Transition> {
        let pool = self.require_app_pool(name)?;
        if pool.state != expected {
            warn!(pool = %pool.name, state = %pool.state, "pool not {}; nothing to do", expected);
            return Ok(Transition::Skipped { current: pool.state });
        }

        apply(&pool.name)?;
        info!(pool = %pool.name, from = %expected, "application pool transition issued");
        Ok(Transition::Applied)
    }

    pub fn app_pool_names(&self) -> Result<Vec<String>> {
        Ok(self.server.app_pools()?.into_iter().map(|p| p.name).collect())
    }

    pub fn app_pool_status(&self, name: &str) -> Result<ObjectState> {
        Ok(self.require_app_pool(name)?.state)
    }

    /// Point a site's root application at `pool`
    pub fn assign_app_pool_to_site(&self, site_key: &str, pool: &str) -> Result<()> {
        let site = self.find_site(site_key)?;
        let pool = self.require_app_pool(pool)?;

        self.server.set_application_pool(site.id, "/", &pool.name)?;
        info!(site = %site.name, pool = %pool.name, "application pool assigned to site");
        Ok(())
    }
}

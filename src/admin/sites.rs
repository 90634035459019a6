//! Site lifecycle and site listings

use tracing::{info, warn};

use super::IisAdmin;
use crate::models::{Binding, MetabasePath, NewSite, Properties, PropertyValue, SiteSummary, WebsiteRow};
use crate::report;
use crate::{Error, Result};

pub(crate) const SITE: &str = "Site";

/// Port used by [`IisAdmin::add_host_header`] when none is given
pub const DEFAULT_HOST_HEADER_PORT: u16 = 80;

impl IisAdmin {
    /// Create a site with one HTTP binding and assign its root application pool
    ///
    /// Returns the new site ID. An existing site of the same name is left
    /// untouched and reported as [`Error::AlreadyExists`].
    pub fn create_website(
        &self,
        name: &str,
        binding_information: &str,
        physical_path: &str,
        app_pool: &str,
    ) -> Result<u64> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("site name cannot be empty".into()));
        }
        if let Some(existing) = self.find_site_by_name(name)? {
            warn!(site = %existing.name, id = existing.id, "site already exists");
            return Err(Error::already_exists(SITE, name));
        }

        let id = self.server.create_site(&NewSite {
            name: name.to_string(),
            binding: Binding::http(binding_information),
            physical_path: physical_path.to_string(),
            app_pool: app_pool.to_string(),
        })?;

        info!(site = name, id, binding = binding_information, "website created");
        Ok(id)
    }

    /// Remove a site by name or numeric ID
    pub fn remove_site(&self, key: &str) -> Result<()> {
        let site = self.find_site(key)?;
        self.server.remove_site(site.id)?;
        info!(site = %site.name, id = site.id, "website removed");
        Ok(())
    }

    /// Create and start a site through the legacy metabase
    ///
    /// `server_bindings` uses the metabase form `:port:hostname`. When
    /// `app_pool` is given it is assigned to the new site's `Root` node before
    /// the site starts. Returns the ID chosen by `CreateNewSite`.
    pub fn start_website(
        &self,
        server_comment: &str,
        server_bindings: &str,
        home_directory: &str,
        app_pool: Option<&str>,
    ) -> Result<u64> {
        let service = MetabasePath::parse(&self.config.web_service_path)?;
        let created = self.metabase.invoke(
            &service.to_string(),
            "CreateNewSite",
            &[
                PropertyValue::from(server_comment),
                PropertyValue::List(vec![server_bindings.to_string()]),
                PropertyValue::from(home_directory),
            ],
        )?;
        let id = site_id_from(created)?;

        let site_path = service.child(&id.to_string());
        if let Some(pool) = app_pool {
            self.metabase.set_properties(
                &site_path.child("Root").to_string(),
                &Properties::new().set("AppPoolId", pool),
            )?;
        }
        self.metabase.invoke(&site_path.to_string(), "Start", &[])?;

        info!(site = server_comment, id, "legacy website created and started");
        Ok(id)
    }

    /// Append a `:port:host` binding to a legacy site's `ServerBindings`
    ///
    /// Returns the binding list as committed.
    pub fn add_host_header(&self, host_header: &str, site_id: u64, port: u16) -> Result<Vec<String>> {
        let site_path = MetabasePath::parse(&self.config.web_service_path)?
            .child(&site_id.to_string())
            .to_string();

        let mut bindings = self
            .metabase
            .get_property(&site_path, "ServerBindings")?
            .map(PropertyValue::into_list)
            .unwrap_or_default();
        bindings.push(format!(":{}:{}", port, host_header));

        self.metabase.set_properties(
            &site_path,
            &Properties::new().set("ServerBindings", bindings.clone()),
        )?;

        info!(site_id, host_header, port, "host header added");
        Ok(bindings)
    }

    pub fn website_names(&self) -> Result<Vec<String>> {
        Ok(self.server.sites()?.into_iter().map(|s| s.name).collect())
    }

    /// `newDataSet` listing of every site
    pub fn website_list_xml(&self) -> Result<String> {
        report::site_list_xml(&self.summarize_sites()?)
    }

    pub fn websites_info(&self) -> Result<Vec<WebsiteRow>> {
        Ok(report::website_rows(&self.summarize_sites()?))
    }

    /// One server round trip for every site; per-site lookup failures
    /// surface as `None` fields
    fn summarize_sites(&self) -> Result<Vec<SiteSummary>> {
        self.server.site_summaries()
    }
}

fn site_id_from(value: Option<PropertyValue>) -> Result<u64> {
    match value {
        Some(PropertyValue::Int(id)) if id > 0 => Ok(id as u64),
        Some(PropertyValue::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("CreateNewSite returned a non-numeric site id: {}", text))),
        other => Err(Error::Backend(format!(
            "CreateNewSite returned no site id: {:?}",
            other
        ))),
    }
}

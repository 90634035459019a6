//! Virtual applications and virtual directories

use tracing::info;

use super::{validate_name, IisAdmin};
use crate::models::{virtual_dir_class, Application, MetabasePath, Properties, PropertyValue};
use crate::report;
use crate::{Error, Result};

/// `AppCreate3` application mode 0 (in-process). Worker process isolation
/// ignores the mode and runs the application in the named pool.
const APP_CREATE_MODE: i64 = 0;

/// `AppIsolated` value of an application running in a pool
const POOLED_PROCESS: i64 = 2;

/// `AppIsolated` value of new metabase virtual directories
const ISOLATED_PROCESS: i64 = 1;

impl IisAdmin {
    /// Add the application `/<dir_name>` to a site and assign its pool
    pub fn create_vapp(&self, site_key: &str, physical_path: &str, dir_name: &str, app_pool: &str) -> Result<()> {
        let dir_name = dir_name.trim_matches('/');
        validate_name("application name", dir_name)?;
        let site = self.find_site(site_key)?;

        let app = Application::new(format!("/{}", dir_name), physical_path, app_pool);
        self.server.add_application(site.id, &app)?;
        info!(site = %site.name, path = %app.path, pool = app_pool, "virtual application created");
        Ok(())
    }

    /// Create an application-enabled virtual directory under a metabase node
    ///
    /// `metabase_path` must name a site (`IIS://localhost/W3SVC/1/Root`) or
    /// another virtual directory. All properties are committed with the new
    /// node, so a failure leaves nothing half-configured.
    pub fn create_vdir(&self, metabase_path: &str, vdir_name: &str, physical_path: &str, app_pool: &str) -> Result<()> {
        validate_name("virtual directory name", vdir_name)?;
        let parent = MetabasePath::parse(metabase_path)?;
        let child_class = self.virtual_dir_class_of(&parent)?;
        let child = parent.child(vdir_name);

        let properties = Properties::new()
            .set("ScriptMaps", vec![self.config.script_map.clone()])
            .set("AppPoolId", app_pool)
            .set("Path", physical_path)
            .set("AccessScript", true)
            .set("AppFriendlyName", vdir_name)
            .set("AppIsolated", ISOLATED_PROCESS)
            .set("AppRoot", child.app_root());

        self.metabase
            .create_child(&parent.to_string(), vdir_name, &child_class, &properties)?;
        info!(path = %child, class = %child_class, pool = app_pool, "virtual directory created");
        Ok(())
    }

    /// Run a metabase virtual directory in the named pool
    pub fn assign_vdir_to_app_pool(&self, metabase_path: &str, app_pool: &str) -> Result<()> {
        let path = MetabasePath::parse(metabase_path)?;
        self.virtual_dir_class_of(&path)?;
        let path = path.to_string();

        self.metabase.invoke(
            &path,
            "AppCreate3",
            &[
                PropertyValue::Int(APP_CREATE_MODE),
                PropertyValue::from(app_pool),
                PropertyValue::Bool(true),
            ],
        )?;
        self.metabase
            .set_properties(&path, &Properties::new().set("AppIsolated", POOLED_PROCESS))?;

        info!(path = %path, pool = app_pool, "virtual directory assigned to application pool");
        Ok(())
    }

    /// `VirtualDirectories` document for the site with this ID
    pub fn virtual_directories_xml(&self, site_id: u64) -> Result<String> {
        let site = self.find_site_by_id(site_id)?;
        report::virtual_directories_xml(&self.server.applications(site.id)?)
    }

    /// `VirtualApplications` document for the site with this ID
    pub fn virtual_applications_xml(&self, site_id: u64) -> Result<String> {
        let site = self.find_site_by_id(site_id)?;
        report::virtual_applications_xml(&self.server.applications(site.id)?)
    }

    fn virtual_dir_class_of(&self, path: &MetabasePath) -> Result<String> {
        let class = self.metabase.schema_class(&path.to_string())?;
        virtual_dir_class(&class).ok_or_else(|| Error::InvalidSchemaClass {
            path: path.to_string(),
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{site, with_metabase, with_server};
    use super::*;
    use crate::backend::{MockMetabase, MockServerManager};

    const ROOT: &str = "IIS://localhost/W3SVC/1/Root";

    #[test]
    fn test_create_vapp_under_site() {
        let mut server = MockServerManager::new();
        server.expect_sites().returning(|| Ok(vec![site(1, "Default")]));
        server
            .expect_add_application()
            .withf(|id, app| {
                *id == 1
                    && app.path == "/shop"
                    && app.app_pool == "ShopPool"
                    && app.root_physical_path() == Some(r"C:\sites\shop")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let admin = with_server(server);

        admin.create_vapp("1", r"C:\sites\shop", "/shop", "ShopPool").unwrap();
    }

    #[test]
    fn test_create_vdir_commits_all_properties() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|_| Ok("IIsWebVirtualDir".to_string()));
        metabase
            .expect_create_child()
            .withf(|parent, name, class, props| {
                parent == ROOT
                    && name == "reports"
                    && class == "IIsWebVirtualDir"
                    && props.len() == 7
                    && props.get("AppRoot") == Some(&PropertyValue::from("/LM/W3SVC/1/Root/reports"))
                    && props.get("AppIsolated") == Some(&PropertyValue::Int(1))
                    && props.get("Path") == Some(&PropertyValue::from(r"D:\reports"))
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let admin = with_metabase(metabase);

        admin.create_vdir(ROOT, "reports", r"D:\reports", "ReportPool").unwrap();
    }

    #[test]
    fn test_create_vdir_under_server_node() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|_| Ok("IIsWebServer".to_string()));
        metabase
            .expect_create_child()
            .withf(|_, _, class, _| class == "IIsWebVirtualDir")
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        with_metabase(metabase)
            .create_vdir("IIS://localhost/W3SVC/1", "legacy", r"C:\legacy", "DefaultAppPool")
            .unwrap();
    }

    #[test]
    fn test_create_vdir_rejects_other_nodes() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|_| Ok("IIsWebService".to_string()));
        metabase.expect_create_child().never();
        let admin = with_metabase(metabase);

        let err = admin
            .create_vdir("IIS://localhost/W3SVC", "x", r"C:\x", "DefaultAppPool")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchemaClass { ref class, .. } if class == "IIsWebService"));
    }

    #[test]
    fn test_assign_vdir_to_pool() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|_| Ok("IIsWebVirtualDir".to_string()));
        metabase
            .expect_invoke()
            .withf(|path, method, args| {
                path == "IIS://localhost/W3SVC/1/Root/reports"
                    && method == "AppCreate3"
                    && args
                        == [
                            PropertyValue::Int(0),
                            PropertyValue::from("ReportPool"),
                            PropertyValue::Bool(true),
                        ]
            })
            .times(1)
            .returning(|_, _, _| Ok(None));
        metabase
            .expect_set_properties()
            .withf(|_, props| props.get("AppIsolated") == Some(&PropertyValue::Int(2)))
            .times(1)
            .returning(|_, _| Ok(()));

        with_metabase(metabase)
            .assign_vdir_to_app_pool("IIS://localhost/W3SVC/1/Root/reports", "ReportPool")
            .unwrap();
    }

    #[test]
    fn test_assign_vdir_rejects_other_nodes() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|_| Ok("IIsFilters".to_string()));
        metabase.expect_invoke().never();
        metabase.expect_set_properties().never();

        let err = with_metabase(metabase)
            .assign_vdir_to_app_pool("IIS://localhost/W3SVC/1/Filters", "ReportPool")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchemaClass { .. }));
    }

    #[test]
    fn test_directory_listing_for_unknown_site() {
        let mut server = MockServerManager::new();
        server.expect_sites().returning(|| Ok(vec![site(1, "Default")]));
        server.expect_applications().never();
        let admin = with_server(server);

        assert!(matches!(admin.virtual_directories_xml(4), Err(Error::SiteIdNotFound(4))));
        assert!(matches!(admin.virtual_applications_xml(4), Err(Error::SiteIdNotFound(4))));
    }

    #[test]
    fn test_virtual_applications_listing() {
        let mut server = MockServerManager::new();
        server.expect_sites().returning(|| Ok(vec![site(1, "Default")]));
        server.expect_applications().returning(|_| {
            Ok(vec![
                Application::new("/", r"C:\inetpub\wwwroot", "DefaultAppPool"),
                Application::new("/shop", r"C:\sites\shop", "ShopPool"),
            ])
        });
        let admin = with_server(server);

        let xml = admin.virtual_applications_xml(1).unwrap();
        assert_eq!(xml.matches("<Application>").count(), 2);
        assert!(xml.contains("<Path>/shop</Path>"));
    }
}

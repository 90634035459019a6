//! Per-user FTP virtual directories

use tracing::info;

use super::{validate_name, IisAdmin};
use crate::models::{virtual_dir_class, MetabasePath, Properties};
use crate::{Error, Result};

impl IisAdmin {
    /// Create a writable FTP directory for `user` under the configured FTP root
    pub fn create_ftp_dir(&self, user: &str, physical_path: &str) -> Result<()> {
        validate_name("FTP user", user)?;
        let root = MetabasePath::parse(&self.config.ftp_root)?;
        let root_path = root.to_string();

        let class = self.metabase.schema_class(&root_path)?;
        let child_class = virtual_dir_class(&class)
            .or_else(|| class.strip_suffix("Service").map(|p| format!("{}VirtualDir", p)))
            .ok_or_else(|| Error::InvalidSchemaClass {
                path: root_path.clone(),
                class: class.clone(),
            })?;

        let properties = Properties::new()
            .set("Path", physical_path)
            .set("AccessWrite", true);
        self.metabase
            .create_child(&root_path, user, &child_class, &properties)?;

        info!(user, path = physical_path, "FTP directory created");
        Ok(())
    }

    pub fn remove_ftp_dir(&self, user: &str) -> Result<()> {
        validate_name("FTP user", user)?;
        let path = MetabasePath::parse(&self.config.ftp_root)?.child(user);

        self.metabase.remove_child(&path.to_string())?;
        info!(user, "FTP directory removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::with_metabase;
    use super::*;
    use crate::backend::MockMetabase;
    use crate::models::PropertyValue;

    #[test]
    fn test_create_ftp_dir() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .withf(|path| path == "IIS://localhost/MSFTPSVC/1/Root")
            .returning(|_| Ok("IIsFtpVirtualDir".to_string()));
        metabase
            .expect_create_child()
            .withf(|parent, name, class, props| {
                parent == "IIS://localhost/MSFTPSVC/1/Root"
                    && name == "alice"
                    && class == "IIsFtpVirtualDir"
                    && props.get("AccessWrite") == Some(&PropertyValue::Bool(true))
                    && props.get("Path") == Some(&PropertyValue::from(r"D:\ftp\alice"))
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        with_metabase(metabase).create_ftp_dir("alice", r"D:\ftp\alice").unwrap();
    }

    #[test]
    fn test_ftp_service_node_maps_to_virtual_dir() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|_| Ok("IIsFtpService".to_string()));
        metabase
            .expect_create_child()
            .withf(|_, _, class, _| class == "IIsFtpVirtualDir")
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        with_metabase(metabase).create_ftp_dir("bob", r"D:\ftp\bob").unwrap();
    }

    #[test]
    fn test_remove_ftp_dir() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_remove_child()
            .withf(|path| path == "IIS://localhost/MSFTPSVC/1/Root/alice")
            .times(1)
            .returning(|_| Ok(()));

        with_metabase(metabase).remove_ftp_dir("alice").unwrap();
    }

    #[test]
    fn test_ftp_user_cannot_escape_root() {
        let mut metabase = MockMetabase::new();
        metabase.expect_remove_child().never();

        let err = with_metabase(metabase).remove_ftp_dir("../1").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_create_ftp_dir_propagates_backend_errors() {
        let mut metabase = MockMetabase::new();
        metabase
            .expect_schema_class()
            .returning(|path| Err(Error::not_found("Metabase node", path)));

        assert!(with_metabase(metabase)
            .create_ftp_dir("alice", r"D:\ftp\alice")
            .unwrap_err()
            .is_not_found());
    }
}

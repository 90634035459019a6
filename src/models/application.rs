//! Application and virtual directory models

use serde::{Deserialize, Serialize};

/// A physical path mapping inside an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDirectory {
    pub path: String,
    pub physical_path: String,
}

impl VirtualDirectory {
    pub fn new(path: impl Into<String>, physical_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            physical_path: physical_path.into(),
        }
    }
}

/// An application under a site; the site itself is the application at `/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub path: String,
    pub app_pool: String,
    pub virtual_directories: Vec<VirtualDirectory>,
}

impl Application {
    /// Application with a single root virtual directory
    pub fn new(path: impl Into<String>, physical_path: impl Into<String>, app_pool: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            app_pool: app_pool.into(),
            virtual_directories: vec![VirtualDirectory::new("/", physical_path)],
        }
    }

    /// Physical path of the application's own `/` virtual directory
    pub fn root_physical_path(&self) -> Option<&str> {
        self.virtual_directories
            .iter()
            .find(|v| v.path == "/")
            .map(|v| v.physical_path.as_str())
    }

    /// Physical path of the first virtual directory, whatever its path
    pub fn first_physical_path(&self) -> Option<&str> {
        self.virtual_directories.first().map(|v| v.physical_path.as_str())
    }
}

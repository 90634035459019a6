//! IIS Administration
//!
//! A Rust library for provisioning Windows IIS: websites, application pools,
//! virtual applications and directories, per-user FTP directories, local
//! accounts and file permissions.
//!
//! Every operation goes through an [`IisAdmin`] session holding injected
//! backends. On a Windows host the defaults drive PowerShell against
//! `Microsoft.Web.Administration` and ADSI; [`backend::MemoryBackend`]
//! replaces all of them in tests.
//!
//! # Example
//!
//! ```no_run
//! use iis_admin::{AdminConfig, IisAdmin};
//!
//! let admin = IisAdmin::local(AdminConfig::default())?;
//!
//! admin.create_app_pool("ShopPool", "v4.0")?;
//! let id = admin.create_website("shop", "*:8080:shop.example.com", r"C:\sites\shop", "ShopPool")?;
//! admin.set_modify_web_permissions(r"C:\sites\shop", r"IIS AppPool\ShopPool")?;
//!
//! println!("{}", admin.virtual_directories_xml(id)?);
//! # Ok::<(), iis_admin::Error>(())
//! ```

pub mod admin;
pub mod backend;
pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod report;

pub use admin::{IisAdmin, IisAdminBuilder};
pub use config::AdminConfig;
pub use error::{Error, Result};
pub use models::{CreatedUser, ObjectState, Transition, WebsiteRow};

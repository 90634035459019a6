//! Data models

mod account;
mod application;
mod metabase;
mod pool;
mod site;

pub use account::*;
pub use application::*;
pub use metabase::*;
pub use pool::*;
pub use site::*;

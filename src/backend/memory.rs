//! In-memory administrative backend
//!
//! Implements every backend trait over one shared state so a single value can
//! be injected as server manager, metabase, account store and command runner.
//! Every mutating call is recorded in order.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{AccountStore, CommandOutput, CommandRunner, Metabase, ServerManager};
use crate::models::*;
use crate::{Error, Result};

/// A mutating call observed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSite(String),
    RemoveSite(u64),
    SetApplicationPool { site_id: u64, app_path: String, pool: String },
    AddApplication { site_id: u64, path: String },
    CreateAppPool(String),
    RemoveAppPool(String),
    StartAppPool(String),
    StopAppPool(String),
    CreateNode(String),
    RemoveNode(String),
    SetProperties(String),
    Invoke { path: String, method: String },
    CreateUser(String),
    AddGroupMember { group: String, member: String },
    RemoveUser(String),
    RunCommand { program: String, args: Vec<String> },
}

#[derive(Debug, Clone)]
struct SiteEntry {
    site: Site,
    bindings: Vec<Binding>,
    applications: Vec<Application>,
}

/// A metabase node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub path: String,
    pub class: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone)]
struct UserEntry {
    path: String,
    description: String,
}

#[derive(Debug, Default)]
struct State {
    sites: Vec<SiteEntry>,
    pools: Vec<AppPool>,
    nodes: BTreeMap<String, Node>,
    users: BTreeMap<String, UserEntry>,
    groups: BTreeMap<String, BTreeSet<String>>,
    failing_bindings: HashSet<u64>,
    failing_applications: HashSet<u64>,
    command_output: CommandOutput,
    calls: Vec<Call>,
}

impl State {
    fn site_mut(&mut self, site_id: u64) -> Result<&mut SiteEntry> {
        self.sites
            .iter_mut()
            .find(|e| e.site.id == site_id)
            .ok_or(Error::SiteIdNotFound(site_id))
    }

    fn site(&self, site_id: u64) -> Result<&SiteEntry> {
        self.sites
            .iter()
            .find(|e| e.site.id == site_id)
            .ok_or(Error::SiteIdNotFound(site_id))
    }

    fn pool_mut(&mut self, name: &str) -> Result<&mut AppPool> {
        self.pools
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::not_found("Application pool", name))
    }

    fn next_site_id(&self) -> u64 {
        self.sites.iter().map(|e| e.site.id).max().unwrap_or(0) + 1
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(&node_key(path))
            .ok_or_else(|| Error::not_found("Metabase node", path))
    }

    fn insert_node(&mut self, path: &str, class: &str, properties: BTreeMap<String, PropertyValue>) {
        self.nodes.insert(
            node_key(path),
            Node {
                path: path.to_string(),
                class: class.to_string(),
                properties,
            },
        );
    }
}

/// Directory paths compare case-insensitively and ignore trailing slashes
fn node_key(path: &str) -> String {
    path.trim_end_matches('/').to_ascii_lowercase()
}

/// Machine name used in the `WinNT://` paths of in-memory accounts
pub const MEMORY_HOST: &str = "localhost";

fn account_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Seeding =====

    /// Add a site with a root application served from `physical_path`
    pub fn with_site(self, site: Site, bindings: Vec<Binding>, physical_path: &str) -> Self {
        let app = Application::new("/", physical_path, "DefaultAppPool");
        self.state.write().sites.push(SiteEntry {
            site,
            bindings,
            applications: vec![app],
        });
        self
    }

    /// Add a site with an explicit application list (possibly empty)
    pub fn with_site_applications(self, site: Site, bindings: Vec<Binding>, applications: Vec<Application>) -> Self {
        self.state.write().sites.push(SiteEntry {
            site,
            bindings,
            applications,
        });
        self
    }

    pub fn with_pool(self, pool: AppPool) -> Self {
        self.state.write().pools.push(pool);
        self
    }

    pub fn with_node(self, path: &str, class: &str) -> Self {
        self.state.write().insert_node(path, class, BTreeMap::new());
        self
    }

    pub fn with_node_property(self, path: &str, name: &str, value: impl Into<PropertyValue>) -> Self {
        if let Some(node) = self.state.write().nodes.get_mut(&node_key(path)) {
            node.properties.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn with_group(self, group: &str) -> Self {
        self.state.write().groups.entry(account_key(group)).or_default();
        self
    }

    pub fn with_user(self, username: &str) -> Self {
        self.state.write().users.insert(
            account_key(username),
            UserEntry {
                path: format!("WinNT://{}/{}", MEMORY_HOST, username),
                description: String::new(),
            },
        );
        self
    }

    /// Make binding lookups of `site_id` fail
    pub fn fail_bindings(self, site_id: u64) -> Self {
        self.state.write().failing_bindings.insert(site_id);
        self
    }

    /// Make application lookups of `site_id` fail
    pub fn fail_applications(self, site_id: u64) -> Self {
        self.state.write().failing_applications.insert(site_id);
        self
    }

    /// Output returned by every command the backend is asked to run
    pub fn with_command_output(self, output: CommandOutput) -> Self {
        self.state.write().command_output = output;
        self
    }

    // ===== Inspection =====

    pub fn calls(&self) -> Vec<Call> {
        self.state.read().calls.clone()
    }

    pub fn site_named(&self, name: &str) -> Option<Site> {
        self.state
            .read()
            .sites
            .iter()
            .find(|e| e.site.name.eq_ignore_ascii_case(name))
            .map(|e| e.site.clone())
    }

    pub fn site_applications(&self, site_id: u64) -> Vec<Application> {
        self.state
            .read()
            .site(site_id)
            .map(|e| e.applications.clone())
            .unwrap_or_default()
    }

    pub fn pool(&self, name: &str) -> Option<AppPool> {
        self.state
            .read()
            .pools
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn node(&self, path: &str) -> Option<Node> {
        self.state.read().nodes.get(&node_key(path)).cloned()
    }

    pub fn user_description(&self, username: &str) -> Option<String> {
        self.state
            .read()
            .users
            .get(&account_key(username))
            .map(|u| u.description.clone())
    }

    pub fn group_members(&self, group: &str) -> Vec<String> {
        self.state
            .read()
            .groups
            .get(&account_key(group))
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.write().calls.push(call);
    }
}

impl ServerManager for MemoryBackend {
    fn sites(&self) -> Result<Vec<Site>> {
        Ok(self.state.read().sites.iter().map(|e| e.site.clone()).collect())
    }

    fn site_summaries(&self) -> Result<Vec<SiteSummary>> {
        let state = self.state.read();
        Ok(state
            .sites
            .iter()
            .map(|e| {
                let bindings = (!state.failing_bindings.contains(&e.site.id)).then(|| e.bindings.clone());
                let physical_path = if state.failing_applications.contains(&e.site.id) {
                    None
                } else {
                    e.applications
                        .iter()
                        .find(|a| a.path == "/")
                        .and_then(Application::root_physical_path)
                        .map(str::to_string)
                };
                SiteSummary {
                    site: e.site.clone(),
                    bindings,
                    physical_path,
                }
            })
            .collect())
    }

    fn applications(&self, site_id: u64) -> Result<Vec<Application>> {
        let state = self.state.read();
        if state.failing_applications.contains(&site_id) {
            return Err(Error::Backend(format!("application lookup failed for site {}", site_id)));
        }
        Ok(state.site(site_id)?.applications.clone())
    }

    fn create_site(&self, site: &NewSite) -> Result<u64> {
        self.record(Call::CreateSite(site.name.clone()));
        let mut state = self.state.write();
        if state.sites.iter().any(|e| e.site.name.eq_ignore_ascii_case(&site.name)) {
            return Err(Error::already_exists("Site", &site.name));
        }

        let id = state.next_site_id();
        state.sites.push(SiteEntry {
            site: Site {
                id,
                name: site.name.clone(),
                state: ObjectState::Started,
            },
            bindings: vec![site.binding.clone()],
            applications: vec![Application::new("/", &site.physical_path, &site.app_pool)],
        });
        Ok(id)
    }

    fn remove_site(&self, site_id: u64) -> Result<()> {
        self.record(Call::RemoveSite(site_id));
        let mut state = self.state.write();
        state.site(site_id)?;
        state.sites.retain(|e| e.site.id != site_id);
        Ok(())
    }

    fn set_application_pool(&self, site_id: u64, app_path: &str, pool: &str) -> Result<()> {
        self.record(Call::SetApplicationPool {
            site_id,
            app_path: app_path.to_string(),
            pool: pool.to_string(),
        });
        let mut state = self.state.write();
        let entry = state.site_mut(site_id)?;
        let app = entry
            .applications
            .iter_mut()
            .find(|a| a.path.eq_ignore_ascii_case(app_path))
            .ok_or_else(|| Error::not_found("Application", app_path))?;
        app.app_pool = pool.to_string();
        Ok(())
    }

    fn add_application(&self, site_id: u64, app: &Application) -> Result<()> {
        self.record(Call::AddApplication {
            site_id,
            path: app.path.clone(),
        });
        let mut state = self.state.write();
        let entry = state.site_mut(site_id)?;
        if entry.applications.iter().any(|a| a.path.eq_ignore_ascii_case(&app.path)) {
            return Err(Error::already_exists("Application", &app.path));
        }
        entry.applications.push(app.clone());
        Ok(())
    }

    fn app_pools(&self) -> Result<Vec<AppPool>> {
        Ok(self.state.read().pools.clone())
    }

    fn create_app_pool(&self, name: &str, runtime_version: &str) -> Result<()> {
        self.record(Call::CreateAppPool(name.to_string()));
        let mut state = self.state.write();
        if state.pools.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
            return Err(Error::already_exists("Application pool", name));
        }
        state
            .pools
            .push(AppPool::new(name, ObjectState::Started).with_runtime_version(runtime_version));
        Ok(())
    }

    fn remove_app_pool(&self, name: &str) -> Result<()> {
        self.record(Call::RemoveAppPool(name.to_string()));
        let mut state = self.state.write();
        state.pool_mut(name)?;
        state.pools.retain(|p| !p.name.eq_ignore_ascii_case(name));
        Ok(())
    }

    fn start_app_pool(&self, name: &str) -> Result<()> {
        self.record(Call::StartAppPool(name.to_string()));
        self.state.write().pool_mut(name)?.state = ObjectState::Started;
        Ok(())
    }

    fn stop_app_pool(&self, name: &str) -> Result<()> {
        self.record(Call::StopAppPool(name.to_string()));
        self.state.write().pool_mut(name)?.state = ObjectState::Stopped;
        Ok(())
    }
}

impl Metabase for MemoryBackend {
    fn schema_class(&self, path: &str) -> Result<String> {
        self.state
            .read()
            .nodes
            .get(&node_key(path))
            .map(|n| n.class.clone())
            .ok_or_else(|| Error::not_found("Metabase node", path))
    }

    fn create_child(&self, parent: &str, name: &str, class: &str, properties: &Properties) -> Result<()> {
        let path = format!("{}/{}", parent.trim_end_matches('/'), name);
        self.record(Call::CreateNode(path.clone()));
        let mut state = self.state.write();
        state.node_mut(parent)?;
        if state.nodes.contains_key(&node_key(&path)) {
            return Err(Error::already_exists("Metabase node", path));
        }
        let properties = properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        state.insert_node(&path, class, properties);
        Ok(())
    }

    fn remove_child(&self, path: &str) -> Result<()> {
        self.record(Call::RemoveNode(path.to_string()));
        let mut state = self.state.write();
        state.node_mut(path)?;
        let key = node_key(path);
        let prefix = format!("{}/", key);
        state.nodes.retain(|k, _| *k != key && !k.starts_with(&prefix));
        Ok(())
    }

    fn get_property(&self, path: &str, name: &str) -> Result<Option<PropertyValue>> {
        let state = self.state.read();
        let node = state
            .nodes
            .get(&node_key(path))
            .ok_or_else(|| Error::not_found("Metabase node", path))?;
        Ok(node.properties.get(name).cloned())
    }

    fn set_properties(&self, path: &str, properties: &Properties) -> Result<()> {
        self.record(Call::SetProperties(path.to_string()));
        let mut state = self.state.write();
        let node = state.node_mut(path)?;
        for (name, value) in properties.iter() {
            node.properties.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn invoke(&self, path: &str, method: &str, args: &[PropertyValue]) -> Result<Option<PropertyValue>> {
        self.record(Call::Invoke {
            path: path.to_string(),
            method: method.to_string(),
        });
        let mut state = self.state.write();
        state.node_mut(path)?;

        match (method, args) {
            ("CreateNewSite", [PropertyValue::Text(comment), bindings, PropertyValue::Text(home)]) => {
                let bindings = bindings.clone().into_list();
                let id = state.next_site_id();
                let site_path = format!("{}/{}", path.trim_end_matches('/'), id);

                let mut site_props = BTreeMap::new();
                site_props.insert("ServerComment".to_string(), PropertyValue::Text(comment.clone()));
                site_props.insert("ServerBindings".to_string(), PropertyValue::List(bindings.clone()));
                state.insert_node(&site_path, "IIsWebServer", site_props);

                let mut root_props = BTreeMap::new();
                root_props.insert("Path".to_string(), PropertyValue::Text(home.clone()));
                state.insert_node(&format!("{}/Root", site_path), "IIsWebVirtualDir", root_props);

                state.sites.push(SiteEntry {
                    site: Site {
                        id,
                        name: comment.clone(),
                        state: ObjectState::Stopped,
                    },
                    bindings: bindings.into_iter().map(|b| Binding::http(format!("*{}", b))).collect(),
                    applications: vec![Application::new("/", home, "DefaultAppPool")],
                });
                Ok(Some(PropertyValue::Int(id as i64)))
            }
            ("Start", []) => {
                let id = path
                    .rsplit('/')
                    .next()
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or_else(|| Error::Backend(format!("{} is not a site node", path)))?;
                state.site_mut(id)?.site.state = ObjectState::Started;
                Ok(None)
            }
            ("AppCreate3", [PropertyValue::Int(mode), PropertyValue::Text(pool), PropertyValue::Bool(_)]) => {
                let node = state.node_mut(path)?;
                node.properties.insert("AppIsolated".to_string(), PropertyValue::Int(*mode));
                node.properties.insert("AppPoolId".to_string(), PropertyValue::Text(pool.clone()));
                Ok(None)
            }
            _ => Err(Error::Backend(format!(
                "unsupported directory method {} with {} argument(s)",
                method,
                args.len()
            ))),
        }
    }
}

impl AccountStore for MemoryBackend {
    fn create_user(&self, user: &NewUser) -> Result<String> {
        self.record(Call::CreateUser(user.username.clone()));
        let mut state = self.state.write();
        let key = account_key(&user.username);
        if state.users.contains_key(&key) {
            return Err(Error::already_exists("User", &user.username));
        }
        let path = format!("WinNT://{}/{}", MEMORY_HOST, user.username);
        state.users.insert(
            key,
            UserEntry {
                path: path.clone(),
                description: user.description.clone(),
            },
        );
        Ok(path)
    }

    fn group_exists(&self, group: &str) -> Result<bool> {
        Ok(self.state.read().groups.contains_key(&account_key(group)))
    }

    fn add_group_member(&self, group: &str, member_path: &str) -> Result<()> {
        self.record(Call::AddGroupMember {
            group: group.to_string(),
            member: member_path.to_string(),
        });
        let mut state = self.state.write();
        let members = state
            .groups
            .get_mut(&account_key(group))
            .ok_or_else(|| Error::not_found("Group", group))?;
        members.insert(member_path.to_string());
        Ok(())
    }

    fn remove_user(&self, username: &str) -> Result<()> {
        self.record(Call::RemoveUser(username.to_string()));
        let mut state = self.state.write();
        let user = state
            .users
            .remove(&account_key(username))
            .ok_or_else(|| Error::not_found("User", username))?;
        for members in state.groups.values_mut() {
            members.remove(&user.path);
        }
        Ok(())
    }
}

impl CommandRunner for MemoryBackend {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.record(Call::RunCommand {
            program: program.to_string(),
            args: args.to_vec(),
        });
        Ok(self.state.read().command_output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_site_assigns_next_id() {
        let backend = MemoryBackend::new().with_site(
            Site {
                id: 1,
                name: "Default".into(),
                state: ObjectState::Started,
            },
            vec![Binding::http("*:80:")],
            r"C:\inetpub\wwwroot",
        );

        let id = backend
            .create_site(&NewSite {
                name: "shop".into(),
                binding: Binding::http("*:8080:"),
                physical_path: r"C:\sites\shop".into(),
                app_pool: "ShopPool".into(),
            })
            .unwrap();

        assert_eq!(id, 2);
        assert_eq!(backend.site_applications(2)[0].app_pool, "ShopPool");
        assert_eq!(backend.calls(), vec![Call::CreateSite("shop".into())]);
    }

    #[test]
    fn test_remove_child_removes_subtree() {
        let backend = MemoryBackend::new()
            .with_node("IIS://localhost/MSFTPSVC/1/Root", "IIsFtpVirtualDir")
            .with_node("IIS://localhost/MSFTPSVC/1/Root/alice", "IIsFtpVirtualDir")
            .with_node("IIS://localhost/MSFTPSVC/1/Root/alice/docs", "IIsFtpVirtualDir");

        backend.remove_child("IIS://localhost/MSFTPSVC/1/Root/Alice").unwrap();

        assert!(backend.node("IIS://localhost/MSFTPSVC/1/Root/alice").is_none());
        assert!(backend.node("IIS://localhost/MSFTPSVC/1/Root/alice/docs").is_none());
        assert!(backend.node("IIS://localhost/MSFTPSVC/1/Root").is_some());
    }

    #[test]
    fn test_failing_lookups() {
        let backend = MemoryBackend::new()
            .with_site_applications(
                Site {
                    id: 4,
                    name: "broken".into(),
                    state: ObjectState::Unknown,
                },
                vec![],
                vec![],
            )
            .fail_bindings(4)
            .fail_applications(4);

        assert!(backend.applications(4).is_err());
        assert_eq!(backend.sites().unwrap().len(), 1);

        let summaries = backend.site_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].bindings, None);
        assert_eq!(summaries[0].physical_path, None);
    }

    #[test]
    fn test_unknown_method_is_backend_error() {
        let backend = MemoryBackend::new().with_node("IIS://localhost/W3SVC", "IIsWebService");
        let err = backend.invoke("IIS://localhost/W3SVC", "Explode", &[]).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}

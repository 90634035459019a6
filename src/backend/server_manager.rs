//! `ServerManager` over `Microsoft.Web.Administration`, scripted via PowerShell

use serde::Deserialize;

use tracing::warn;

use super::powershell::{quote, PowerShell};
use super::ServerManager;
use crate::models::*;
use crate::{Error, Result};

/// Opens a fresh `ServerManager` in every script; nothing is cached between calls
const LOAD_MANAGER: &str = r#"[void][System.Reflection.Assembly]::LoadWithPartialName('Microsoft.Web.Administration')
$sm = New-Object Microsoft.Web.Administration.ServerManager
"#;

pub struct PowerShellServerManager {
    ps: PowerShell,
}

impl PowerShellServerManager {
    pub fn new(ps: PowerShell) -> Self {
        Self { ps }
    }

    fn run(&self, body: &str) -> Result<String> {
        self.ps.run(&format!("{}{}", LOAD_MANAGER, body))
    }

    fn run_json<T: for<'de> Deserialize<'de>>(&self, body: &str) -> Result<Vec<T>> {
        self.ps.run_json(&format!("{}{}", LOAD_MANAGER, body))
    }
}

fn select_site(site_id: u64) -> String {
    format!(
        r#"$site = $sm.Sites | Where-Object {{ $_.Id -eq {id} }} | Select-Object -First 1
if (-not $site) {{ throw "Website with ID {id} not found." }}
"#,
        id = site_id
    )
}

fn select_pool(name: &str) -> String {
    format!(
        r#"$pool = $sm.ApplicationPools[{name}]
if (-not $pool) {{ throw "Application pool not found." }}
"#,
        name = quote(name)
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SiteRow {
    id: u64,
    name: String,
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BindingRow {
    protocol: String,
    binding_information: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SiteSummaryRow {
    id: u64,
    name: String,
    state: String,
    bindings: Option<Vec<BindingRow>>,
    bindings_error: Option<String>,
    physical_path: Option<String>,
    physical_path_error: Option<String>,
}

impl SiteSummaryRow {
    fn into_summary(self) -> SiteSummary {
        let bindings = match self.bindings_error {
            Some(e) => {
                warn!(site = %self.name, error = %e, "failed to read bindings");
                None
            }
            None => Some(
                self.bindings
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| Binding::new(r.protocol, r.binding_information))
                    .collect(),
            ),
        };

        let physical_path = match (self.physical_path_error, self.physical_path) {
            (Some(e), _) => {
                warn!(site = %self.name, error = %e, "failed to read physical path");
                None
            }
            (None, None) => {
                warn!(site = %self.name, "site has no root virtual directory");
                None
            }
            (None, path) => path,
        };

        SiteSummary {
            site: Site {
                id: self.id,
                name: self.name,
                state: ObjectState::from_name(&self.state),
            },
            bindings,
            physical_path,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VirtualDirectoryRow {
    path: String,
    physical_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationRow {
    path: String,
    application_pool_name: Option<String>,
    #[serde(default)]
    virtual_directories: Vec<VirtualDirectoryRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PoolRow {
    name: String,
    state: String,
    managed_runtime_version: Option<String>,
}

impl ServerManager for PowerShellServerManager {
    fn sites(&self) -> Result<Vec<Site>> {
        let rows: Vec<SiteRow> = self.run_json(
            r#"@($sm.Sites | ForEach-Object {
    $state = try { $_.State.ToString() } catch { 'Unknown' }
    [pscustomobject]@{ Id = $_.Id; Name = $_.Name; State = $state }
}) | ConvertTo-Json -Compress
"#,
        )?;

        Ok(rows
            .into_iter()
            .map(|r| Site {
                id: r.id,
                name: r.name,
                state: ObjectState::from_name(&r.state),
            })
            .collect())
    }

    fn site_summaries(&self) -> Result<Vec<SiteSummary>> {
        let rows: Vec<SiteSummaryRow> = self.run_json(
            r#"@($sm.Sites | ForEach-Object {
    $site = $_
    $state = try { $site.State.ToString() } catch { 'Unknown' }
    $bindings = $null; $bindingsError = $null
    try {
        $bindings = @($site.Bindings | ForEach-Object {
            [pscustomobject]@{ Protocol = $_.Protocol; BindingInformation = $_.BindingInformation }
        })
    } catch { $bindingsError = $_.Exception.Message }
    $path = $null; $pathError = $null
    try {
        $root = $site.Applications['/']
        if ($root -and $root.VirtualDirectories['/']) { $path = $root.VirtualDirectories['/'].PhysicalPath }
    } catch { $pathError = $_.Exception.Message }
    [pscustomobject]@{
        Id = $site.Id
        Name = $site.Name
        State = $state
        Bindings = $bindings
        BindingsError = $bindingsError
        PhysicalPath = $path
        PhysicalPathError = $pathError
    }
}) | ConvertTo-Json -Compress -Depth 4
"#,
        )?;

        Ok(rows.into_iter().map(SiteSummaryRow::into_summary).collect())
    }

    fn applications(&self, site_id: u64) -> Result<Vec<Application>> {
        let rows: Vec<ApplicationRow> = self.run_json(&format!(
            r#"{}@($site.Applications | ForEach-Object {{
    [pscustomobject]@{{
        Path = $_.Path
        ApplicationPoolName = $_.ApplicationPoolName
        VirtualDirectories = @($_.VirtualDirectories | ForEach-Object {{
            [pscustomobject]@{{ Path = $_.Path; PhysicalPath = $_.PhysicalPath }}
        }})
    }}
}}) | ConvertTo-Json -Compress -Depth 4
"#,
            select_site(site_id)
        ))?;

        Ok(rows
            .into_iter()
            .map(|r| Application {
                path: r.path,
                app_pool: r.application_pool_name.unwrap_or_default(),
                virtual_directories: r
                    .virtual_directories
                    .into_iter()
                    .map(|v| VirtualDirectory::new(v.path, v.physical_path.unwrap_or_default()))
                    .collect(),
            })
            .collect())
    }

    fn create_site(&self, site: &NewSite) -> Result<u64> {
        let output = self.run(&format!(
            r#"$site = $sm.Sites.Add({name}, {protocol}, {binding}, {path})
$site.Applications['/'].ApplicationPoolName = {pool}
$sm.CommitChanges()
$site.Id
"#,
            name = quote(&site.name),
            protocol = quote(&site.binding.protocol),
            binding = quote(&site.binding.binding_information),
            path = quote(&site.physical_path),
            pool = quote(&site.app_pool),
        ))?;

        output
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("Invalid site id from server manager: {:?}", output.trim())))
    }

    fn remove_site(&self, site_id: u64) -> Result<()> {
        self.run(&format!(
            "{}$sm.Sites.Remove($site)\n$sm.CommitChanges()\n",
            select_site(site_id)
        ))?;
        Ok(())
    }

    fn set_application_pool(&self, site_id: u64, app_path: &str, pool: &str) -> Result<()> {
        self.run(&format!(
            r#"{select}$app = $site.Applications[{path}]
if (-not $app) {{ throw "Application not found." }}
$app.ApplicationPoolName = {pool}
$sm.CommitChanges()
"#,
            select = select_site(site_id),
            path = quote(app_path),
            pool = quote(pool),
        ))?;
        Ok(())
    }

    fn add_application(&self, site_id: u64, app: &Application) -> Result<()> {
        let physical_path = app.first_physical_path().unwrap_or_default();
        self.run(&format!(
            r#"{select}$app = $site.Applications.Add({path}, {physical})
$app.ApplicationPoolName = {pool}
$sm.CommitChanges()
"#,
            select = select_site(site_id),
            path = quote(&app.path),
            physical = quote(physical_path),
            pool = quote(&app.app_pool),
        ))?;
        Ok(())
    }

    fn app_pools(&self) -> Result<Vec<AppPool>> {
        let rows: Vec<PoolRow> = self.run_json(
            r#"@($sm.ApplicationPools | ForEach-Object {
    $state = try { $_.State.ToString() } catch { 'Unknown' }
    [pscustomobject]@{ Name = $_.Name; State = $state; ManagedRuntimeVersion = $_.ManagedRuntimeVersion }
}) | ConvertTo-Json -Compress
"#,
        )?;

        Ok(rows
            .into_iter()
            .map(|r| {
                AppPool::new(r.name, ObjectState::from_name(&r.state))
                    .with_runtime_version(r.managed_runtime_version.unwrap_or_default())
            })
            .collect())
    }

    fn create_app_pool(&self, name: &str, runtime_version: &str) -> Result<()> {
        self.run(&format!(
            r#"$pool = $sm.ApplicationPools.Add({name})
$pool.ManagedRuntimeVersion = {version}
$sm.CommitChanges()
"#,
            name = quote(name),
            version = quote(runtime_version),
        ))?;
        Ok(())
    }

    fn remove_app_pool(&self, name: &str) -> Result<()> {
        self.run(&format!(
            "{}$sm.ApplicationPools.Remove($pool)\n$sm.CommitChanges()\n",
            select_pool(name)
        ))?;
        Ok(())
    }

    fn start_app_pool(&self, name: &str) -> Result<()> {
        self.run(&format!("{}[void]$pool.Start()\n", select_pool(name)))?;
        Ok(())
    }

    fn stop_app_pool(&self, name: &str) -> Result<()> {
        self.run(&format!("{}[void]$pool.Stop()\n", select_pool(name)))?;
        Ok(())
    }
}

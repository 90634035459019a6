//! iis-admin CLI - provision IIS sites, pools, directories and accounts

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use iis_admin::{AdminConfig, Error, IisAdmin, Result, Transition};
use tabled::Table;

#[derive(Parser)]
#[command(name = "iis-admin")]
#[command(about = "Administer IIS websites, application pools, FTP directories and local accounts")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Website management
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },
    /// Application pool management
    Pool {
        #[command(subcommand)]
        action: PoolAction,
    },
    /// Virtual applications and directories
    App {
        #[command(subcommand)]
        action: AppAction,
    },
    /// Per-user FTP directories
    Ftp {
        #[command(subcommand)]
        action: FtpAction,
    },
    /// Local accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// File system permissions
    Permission {
        #[command(subcommand)]
        action: PermissionAction,
    },
}

#[derive(Subcommand)]
enum SiteAction {
    /// Create a website with an HTTP binding
    Create {
        /// Site name
        #[arg(short, long)]
        name: String,
        /// Binding information, e.g. "*:80:www.example.com"
        #[arg(short, long)]
        binding: String,
        /// Physical path of the site root
        #[arg(short, long)]
        path: String,
        /// Application pool of the root application
        #[arg(long, default_value = "DefaultAppPool")]
        pool: String,
    },
    /// Remove a website
    Remove {
        /// Site name or ID
        site: String,
    },
    /// Create and start a website through the legacy metabase
    StartLegacy {
        /// Site description
        #[arg(short, long)]
        comment: String,
        /// Metabase bindings, e.g. ":80:www.example.com"
        #[arg(short, long)]
        bindings: String,
        /// Home directory
        #[arg(short, long)]
        path: String,
        /// Application pool of the Root node
        #[arg(long)]
        pool: Option<String>,
    },
    /// Add a host header binding to a legacy site
    AddHostHeader {
        /// Site ID
        id: u64,
        /// Host name
        host: String,
        /// Port
        #[arg(short, long, default_value_t = iis_admin::admin::DEFAULT_HOST_HEADER_PORT)]
        port: u16,
    },
    /// List website names
    List,
    /// Print the website listing as XML
    Xml,
    /// Show websites as a table
    Info,
    /// Assign an application pool to a site's root application
    AssignPool {
        /// Site name or ID
        site: String,
        /// Pool name
        pool: String,
    },
}

#[derive(Subcommand)]
enum PoolAction {
    /// Create an application pool
    Create {
        /// Pool name
        name: String,
        /// Managed runtime version
        #[arg(short, long, default_value = "v4.0")]
        runtime: String,
    },
    /// Remove an application pool
    Remove {
        /// Pool name
        name: String,
    },
    /// Start a stopped pool
    Start {
        /// Pool name
        name: String,
    },
    /// Stop a started pool
    Stop {
        /// Pool name
        name: String,
    },
    /// List pool names
    List,
    /// Show pool state
    Status {
        /// Pool name
        name: String,
    },
}

#[derive(Subcommand)]
enum AppAction {
    /// Create a virtual application under a site
    Create {
        /// Site name or ID
        #[arg(short, long)]
        site: String,
        /// Application name (path under the site root)
        #[arg(short, long)]
        name: String,
        /// Physical path
        #[arg(short, long)]
        path: String,
        /// Application pool
        #[arg(long, default_value = "DefaultAppPool")]
        pool: String,
    },
    /// Create a metabase virtual directory
    Vdir {
        /// Parent node, e.g. IIS://localhost/W3SVC/1/Root
        #[arg(short, long)]
        metabase_path: String,
        /// Directory name
        #[arg(short, long)]
        name: String,
        /// Physical path
        #[arg(short, long)]
        path: String,
        /// Application pool
        #[arg(long, default_value = "DefaultAppPool")]
        pool: String,
    },
    /// Run a metabase virtual directory in a pool
    AssignVdir {
        /// Virtual directory node
        metabase_path: String,
        /// Pool name
        pool: String,
    },
    /// Print a site's virtual directories as XML
    ListDirs {
        /// Site ID
        id: u64,
    },
    /// Print a site's applications as XML
    ListApps {
        /// Site ID
        id: u64,
    },
}

#[derive(Subcommand)]
enum FtpAction {
    /// Create a writable FTP directory for a user
    Create {
        /// FTP user
        user: String,
        /// Physical path
        path: String,
    },
    /// Remove a user's FTP directory
    Remove {
        /// FTP user
        user: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a local account
    Create {
        /// User name
        name: String,
        /// Password
        #[arg(short, long)]
        password: String,
        /// Description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Remove a local account
    Remove {
        /// User name
        name: String,
    },
    /// Add a local account to a group
    AddToGroup {
        /// User name
        name: String,
        /// Group name
        group: String,
    },
}

#[derive(Subcommand)]
enum PermissionAction {
    /// Grant recursive modify rights on a directory
    Grant {
        /// Directory
        dir: String,
        /// User or group
        user: String,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let directive: tracing_subscriber::filter::Directive = "iis_admin=info"
        .parse()
        .map_err(|e| Error::Config(format!("log directive: {}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AdminConfig::load(path)?,
        None => AdminConfig::default(),
    };
    let admin = IisAdmin::local(config)?;

    match cli.command {
        Commands::Site { action } => handle_site(&admin, action)?,
        Commands::Pool { action } => handle_pool(&admin, action)?,
        Commands::App { action } => handle_app(&admin, action)?,
        Commands::Ftp { action } => handle_ftp(&admin, action)?,
        Commands::User { action } => handle_user(&admin, action)?,
        Commands::Permission { action } => handle_permission(&admin, action)?,
    }

    Ok(())
}

fn handle_site(admin: &IisAdmin, action: SiteAction) -> Result<()> {
    match action {
        SiteAction::Create {
            name,
            binding,
            path,
            pool,
        } => {
            let id = admin.create_website(&name, &binding, &path, &pool)?;
            println!("Website created: {} ({})", name, id);
        }
        SiteAction::Remove { site } => {
            admin.remove_site(&site)?;
            println!("Website removed: {}", site);
        }
        SiteAction::StartLegacy {
            comment,
            bindings,
            path,
            pool,
        } => {
            let id = admin.start_website(&comment, &bindings, &path, pool.as_deref())?;
            println!("Website started: {} ({})", comment, id);
        }
        SiteAction::AddHostHeader { id, host, port } => {
            let bindings = admin.add_host_header(&host, id, port)?;
            println!("Bindings of site {}: {}", id, bindings.join(", "));
        }
        SiteAction::List => {
            println!("{}", admin.website_names()?.join(","));
        }
        SiteAction::Xml => {
            println!("{}", admin.website_list_xml()?);
        }
        SiteAction::Info => {
            let rows = admin.websites_info()?;
            if rows.is_empty() {
                println!("No websites configured.");
                return Ok(());
            }
            println!("{}", Table::new(rows));
        }
        SiteAction::AssignPool { site, pool } => {
            admin.assign_app_pool_to_site(&site, &pool)?;
            println!("Site {} now runs in {}", site, pool);
        }
    }
    Ok(())
}

fn handle_pool(admin: &IisAdmin, action: PoolAction) -> Result<()> {
    match action {
        PoolAction::Create { name, runtime } => {
            admin.create_app_pool(&name, &runtime)?;
            println!("Application pool created: {} ({})", name, runtime);
        }
        PoolAction::Remove { name } => {
            admin.remove_app_pool(&name)?;
            println!("Application pool removed: {}", name);
        }
        PoolAction::Start { name } => print_transition(&name, admin.start_app_pool(&name)?),
        PoolAction::Stop { name } => print_transition(&name, admin.stop_app_pool(&name)?),
        PoolAction::List => {
            println!("{}", admin.app_pool_names()?.join(","));
        }
        PoolAction::Status { name } => match admin.app_pool_status(&name) {
            Ok(state) => println!("{}", state),
            Err(e) if e.is_not_found() => println!("App Pool Name Not Found"),
            Err(e) => return Err(e),
        },
    }
    Ok(())
}

fn print_transition(name: &str, transition: Transition) {
    match transition {
        Transition::Applied => println!("{}: done", name),
        Transition::Skipped { current } => println!("{}: nothing to do (pool is {})", name, current),
    }
}

fn handle_app(admin: &IisAdmin, action: AppAction) -> Result<()> {
    match action {
        AppAction::Create {
            site,
            name,
            path,
            pool,
        } => {
            admin.create_vapp(&site, &path, &name, &pool)?;
            println!("Application created: {}/{}", site, name.trim_matches('/'));
        }
        AppAction::Vdir {
            metabase_path,
            name,
            path,
            pool,
        } => {
            admin.create_vdir(&metabase_path, &name, &path, &pool)?;
            println!("Virtual directory created: {}/{}", metabase_path.trim_end_matches('/'), name);
        }
        AppAction::AssignVdir { metabase_path, pool } => {
            admin.assign_vdir_to_app_pool(&metabase_path, &pool)?;
            println!("{} now runs in {}", metabase_path, pool);
        }
        AppAction::ListDirs { id } => {
            println!("{}", admin.virtual_directories_xml(id)?);
        }
        AppAction::ListApps { id } => {
            println!("{}", admin.virtual_applications_xml(id)?);
        }
    }
    Ok(())
}

fn handle_ftp(admin: &IisAdmin, action: FtpAction) -> Result<()> {
    match action {
        FtpAction::Create { user, path } => {
            admin.create_ftp_dir(&user, &path)?;
            println!("FTP directory created for {}", user);
        }
        FtpAction::Remove { user } => {
            admin.remove_ftp_dir(&user)?;
            println!("FTP directory removed for {}", user);
        }
    }
    Ok(())
}

fn handle_user(admin: &IisAdmin, action: UserAction) -> Result<()> {
    match action {
        UserAction::Create {
            name,
            password,
            description,
        } => {
            let created = admin.create_user(&name, &password, &description)?;
            match created.group {
                Some(group) => println!("Account created: {} (member of {})", created.path, group),
                None => println!("Account created: {}", created.path),
            }
        }
        UserAction::Remove { name } => {
            admin.remove_user(&name)?;
            println!("Account removed: {}", name);
        }
        UserAction::AddToGroup { name, group } => {
            admin.add_user_to_group(&name, &group)?;
            println!("{} added to {}", name, group);
        }
    }
    Ok(())
}

fn handle_permission(admin: &IisAdmin, action: PermissionAction) -> Result<()> {
    match action {
        PermissionAction::Grant { dir, user } => {
            let output = admin.set_modify_web_permissions(&dir, &user)?;
            println!("Permissions set successfully:\n{}", output.trim_end());
        }
    }
    Ok(())
}

//! appdeck - command line interface for the appdeck application platform

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use warp::Filter;

use appdeck_cli::api::{self, ServerCtx};
use appdeck_cli::client::AppsClient;
use appdeck_cli::config::Config;
use appdeck_cli::session::Session;
use appdeck_cli::workflow::{CreateOutcome, CreateRequest, CreateWorkflow};
use appdeck_core::{AppConfig, ModelFile, TopologyLoader};
use appdeck_runtime::users::UserStore;
use appdeck_runtime::{shared_registry, shared_registry_with_store, AppStorage, FileStore};

#[derive(Parser)]
#[command(name = "appdeck")]
#[command(author = "Appdeck Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Appdeck - create and host model-backed applications", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, global = true, env = "APPDECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the apps service
    Serve {
        /// Server port
        #[arg(short, long, default_value = "7600")]
        port: u16,

        /// Bind address (default: 127.0.0.1 for security)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Root directory for uploaded application files
        #[arg(long)]
        storage: Option<PathBuf>,

        /// API key of the default user (generated if not set)
        #[arg(long, env = "APPDECK_API_KEY")]
        api_key: Option<String>,

        /// Username of the default user
        #[arg(long, default_value = "owner")]
        username: String,

        /// Directory for persistent state (enables recovery on restart)
        #[arg(long, env = "APPDECK_STATE_DIR")]
        state_dir: Option<PathBuf>,
    },

    /// Create a new application from a model
    Create {
        /// Server URL (e.g. http://localhost:7600)
        #[arg(long, env = "APPDECK_SERVER")]
        server: Option<String>,

        /// API key
        #[arg(long, env = "APPDECK_API_KEY")]
        api_key: Option<String>,

        /// Application identifier
        #[arg(short, long)]
        id: String,

        /// Application title
        #[arg(short, long)]
        title: Option<String>,

        /// Application description
        #[arg(short, long)]
        description: Option<String>,

        /// Path to the model topology file (must be named model.json)
        #[arg(short, long)]
        model: PathBuf,

        /// Paths to the weight shard files
        #[arg(short, long, num_args = 1..)]
        weights: Vec<PathBuf>,
    },

    /// Show an application configuration
    Show {
        /// Server URL (e.g. http://localhost:7600)
        #[arg(long, env = "APPDECK_SERVER")]
        server: Option<String>,

        /// API key
        #[arg(long, env = "APPDECK_API_KEY")]
        api_key: Option<String>,

        /// Application identifier
        #[arg(short, long)]
        id: String,
    },

    /// Delete an application
    Delete {
        /// Server URL (e.g. http://localhost:7600)
        #[arg(long, env = "APPDECK_SERVER")]
        server: Option<String>,

        /// API key
        #[arg(long, env = "APPDECK_API_KEY")]
        api_key: Option<String>,

        /// Application identifier
        #[arg(short, long)]
        id: String,
    },

    /// Show the authenticated user's profile
    User {
        /// Server URL (e.g. http://localhost:7600)
        #[arg(long, env = "APPDECK_SERVER")]
        server: Option<String>,

        /// API key
        #[arg(long, env = "APPDECK_API_KEY")]
        api_key: Option<String>,
    },

    /// Generate example configuration file
    ConfigGen {
        /// Output format (yaml, toml)
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    // Load config file if specified
    let config = match cli.config {
        Some(ref path) => Config::load(path).map_err(|e| anyhow::anyhow!("{}", e))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve {
            port,
            bind,
            storage,
            api_key,
            username,
            state_dir,
        } => {
            let storage_dir = storage.unwrap_or_else(|| config.server.storage_dir.clone());
            let state_dir = state_dir.or_else(|| config.server.state_dir.clone());
            run_server(port, &bind, storage_dir, api_key, &username, state_dir).await?;
        }

        Commands::Create {
            server,
            api_key,
            id,
            title,
            description,
            model,
            weights,
        } => {
            let (server, api_key) = resolve_connection(server, api_key, &config)?;
            run_create(
                &server,
                &api_key,
                &config.client.session_file,
                id,
                title,
                description,
                &model,
                &weights,
            )
            .await?;
        }

        Commands::Show {
            server,
            api_key,
            id,
        } => {
            let (server, api_key) = resolve_connection(server, api_key, &config)?;
            let client = AppsClient::new(&server, &api_key);
            let app = client
                .get_app(&id)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to fetch application: {}", e))?;
            println!("Application {}", app.id);
            println!("  Title:       {}", app.title);
            println!("  Description: {}", app.description);
            println!("  Categories:  {}", app.categories.len());
            println!("  Align:       {}", app.style.align);
            println!("  Font:        {}", app.style.font);
            println!("  Published:   {}", app.published);
        }

        Commands::Delete {
            server,
            api_key,
            id,
        } => {
            let (server, api_key) = resolve_connection(server, api_key, &config)?;
            let client = AppsClient::new(&server, &api_key);
            client
                .delete_app(&id)
                .await
                .map_err(|e| anyhow::anyhow!("Delete failed: {}", e))?;
            println!("Application {} deleted.", id);
        }

        Commands::User { server, api_key } => {
            let (server, api_key) = resolve_connection(server, api_key, &config)?;
            let client = AppsClient::new(&server, &api_key);
            let profile = client
                .fetch_user()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to fetch user: {}", e))?;
            println!("User: {}", profile.username);
            println!("Applications ({} total):", profile.apps.len());
            if profile.apps.is_empty() {
                println!("  (none)");
            }
            for id in &profile.apps {
                println!("  {}", id);
            }
        }

        Commands::ConfigGen { format, output } => {
            let content = match format.to_lowercase().as_str() {
                "yaml" | "yml" => Config::example_yaml(),
                "toml" => Config::example_toml(),
                _ => anyhow::bail!("Unsupported format: {}. Use 'yaml' or 'toml'", format),
            };

            if let Some(path) = output {
                std::fs::write(&path, &content)?;
                println!("Configuration written to: {}", path.display());
            } else {
                println!("{}", content);
            }
        }
    }

    Ok(())
}

/// Pick server URL and api key from CLI arguments, falling back to the
/// config file.
fn resolve_connection(
    server: Option<String>,
    api_key: Option<String>,
    config: &Config,
) -> Result<(String, String)> {
    let server = server
        .or_else(|| config.client.server_url.clone())
        .ok_or_else(|| anyhow::anyhow!("No server URL: pass --server or set client.server_url"))?;
    let api_key = api_key
        .or_else(|| config.client.api_key.clone())
        .ok_or_else(|| anyhow::anyhow!("No API key: pass --api-key or set client.api_key"))?;
    Ok((server, api_key))
}

async fn run_server(
    port: u16,
    bind: &str,
    storage_dir: PathBuf,
    api_key: Option<String>,
    username: &str,
    state_dir: Option<PathBuf>,
) -> Result<()> {
    println!("Appdeck Server");
    println!("==============");
    println!("REST API: http://{}:{}/api/v1/", bind, port);
    println!("Storage:  {}", storage_dir.display());
    println!(
        "State:    {}",
        match &state_dir {
            Some(dir) => format!("{}", dir.display()),
            None => "in-memory (no persistence)".to_string(),
        }
    );
    println!();

    let registry = match state_dir {
        Some(dir) => {
            let store = Arc::new(FileStore::open(dir).map_err(|e| anyhow::anyhow!("{}", e))?);
            shared_registry_with_store(store)
        }
        None => shared_registry(),
    };

    let storage = AppStorage::open(storage_dir).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Provision the default user; generate a key when none is configured.
    let api_key = api_key.unwrap_or_else(|| {
        let key = uuid::Uuid::new_v4().to_string();
        println!("Generated API key for '{}': {}", username, key);
        key
    });
    let mut users = UserStore::new();
    users
        .register(username, &api_key)
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!("Provisioned default user '{}'", username);

    let ctx = ServerCtx {
        registry,
        storage: Arc::new(storage),
        users: Arc::new(RwLock::new(users)),
    };

    // Liveness probe, no auth required
    let health_route = warp::path("health").and(warp::get()).and_then(|| async {
        let response = serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        });
        Ok::<_, warp::Rejection>(warp::reply::json(&response))
    });

    let routes = health_route
        .or(api::api_routes(ctx))
        .recover(api::handle_rejection);

    let bind_addr: std::net::IpAddr = bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind, e))?;

    info!("Server listening on {}:{}", bind, port);
    warp::serve(routes).run((bind_addr, port)).await;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_create(
    server: &str,
    api_key: &str,
    session_file: &PathBuf,
    id: String,
    title: Option<String>,
    description: Option<String>,
    model: &PathBuf,
    weights: &[PathBuf],
) -> Result<()> {
    let topology = ModelFile::from_path(model)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", model.display(), e))?;
    let mut weight_files = Vec::with_capacity(weights.len());
    for path in weights {
        let file = ModelFile::from_path(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        weight_files.push(file);
    }

    let mut app = AppConfig::draft();
    app.id = id;
    if let Some(title) = title {
        app.title = title;
    }
    if let Some(description) = description {
        app.description = description;
    }

    let request = CreateRequest {
        config: app,
        topology,
        weights: weight_files,
    };

    let client = AppsClient::new(server, api_key);
    let workflow = CreateWorkflow::new(client, TopologyLoader);

    match workflow.run(&request).await {
        CreateOutcome::Created { id, user } => {
            let mut session = Session::new(server, api_key);
            session.user = Some(user.clone());
            session.save(session_file)?;

            println!("Application created!");
            println!("  ID:   {}", id);
            println!("  Apps: {}", user.apps.len());
            println!("Edit it at {}/edit?id={}", server, id);
            Ok(())
        }
        CreateOutcome::SessionExpired => {
            // The application was created, but the session is gone: log out.
            Session::clear(session_file)?;
            anyhow::bail!("your session has expired; you have been logged out, please sign in again");
        }
        CreateOutcome::Failed(e) => {
            anyhow::bail!("{}", e);
        }
    }
}

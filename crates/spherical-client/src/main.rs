//! spherical - Spherical gateway client
//!
//! Connects to a node's gateway, keeps the session alive and reports what a
//! front end would display.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spherical_client::{
    Bootstrap, ClientConfig, FileTokenStore, GatewayConnection, GatewayHandle, MemoryTokenStore,
    TokenStore, View, WsConnector,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "spherical")]
#[command(about = "Spherical gateway client")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the gateway and stay connected
    Connect {
        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base URL of the node
        #[arg(long, env = "SPHERICAL_URL")]
        url: Option<String>,

        /// Session token to use instead of the stored one
        #[arg(long, env = "SPHERICAL_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Path the session is opened for, used in login redirects
        #[arg(long, default_value = "/")]
        path: String,
    },

    /// Manage the stored session token
    Token {
        /// Token file (defaults to the per-user config directory)
        #[arg(long, global = true)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        action: TokenAction,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "spherical.toml")]
        output: PathBuf,

        /// Base URL of the node
        #[arg(long, default_value = "https://localhost:8080")]
        url: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a session token
    Set {
        /// The token
        token: String,
    },
    /// Forget the stored token
    Clear,
    /// Show whether a token is stored
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive("spherical=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Connect {
            config,
            url,
            token,
            path,
        } => {
            connect(config, url, token, &path).await?;
        }

        Commands::Token { file, action } => {
            token_cmd(file, action)?;
        }

        Commands::InitConfig { output, url } => {
            init_config(&output, url)?;
        }
    }

    Ok(())
}

fn load_config(config: Option<PathBuf>, url: Option<String>) -> anyhow::Result<ClientConfig> {
    match (config, url) {
        (Some(path), _) => ClientConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display())),
        (None, Some(url)) => {
            let config = ClientConfig::new(url);
            config.validate()?;
            Ok(config)
        }
        (None, None) => anyhow::bail!("either --config or --url is required"),
    }
}

fn token_store(file: Option<PathBuf>) -> anyhow::Result<FileTokenStore> {
    let path = match file {
        Some(path) => path,
        None => FileTokenStore::default_path()?,
    };
    Ok(FileTokenStore::new(path))
}

async fn connect(
    config: Option<PathBuf>,
    url: Option<String>,
    token: Option<String>,
    path: &str,
) -> anyhow::Result<()> {
    let config = load_config(config, url)?;
    let gateway_url = config.gateway_url()?;
    info!(url = %gateway_url, "starting spherical client");

    let tokens: Arc<dyn TokenStore> = match token {
        Some(token) => Arc::new(MemoryTokenStore::with_token(token)),
        None => Arc::new(token_store(config.token_path.clone())?),
    };

    let connector = WsConnector::new(gateway_url);
    let (connection, events) =
        GatewayConnection::new(connector, Arc::clone(&tokens), config.gateway_options());
    let gateway = GatewayHandle::spawn(connection, events);

    let bootstrap = Bootstrap::mount(gateway.clone(), tokens.as_ref(), path).await?;
    let mut views = bootstrap.subscribe();

    loop {
        let view = views.borrow_and_update().clone();
        match view {
            View::RedirectToLogin { location } => {
                warn!(%location, "session rejected, log in and store a token with `spherical token set`");
                break;
            }
            View::Loading => info!(state = %gateway.state(), "waiting for gateway session"),
            View::Connected => info!("connected to gateway"),
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    bootstrap.unmount();
    gateway.shutdown()?;
    Ok(())
}

fn token_cmd(file: Option<PathBuf>, action: TokenAction) -> anyhow::Result<()> {
    let store = token_store(file)?;

    match action {
        TokenAction::Set { token } => {
            if token.trim().is_empty() {
                anyhow::bail!("token cannot be empty");
            }
            store.set(&token)?;
            println!("Token stored in {}", store.path().display());
        }
        TokenAction::Clear => {
            store.remove()?;
            println!("Token removed from {}", store.path().display());
        }
        TokenAction::Show => match store.get() {
            Some(token) => {
                let shown: String = token.chars().take(4).collect();
                println!("{}: {shown}... ({} chars)", store.path().display(), token.len());
            }
            None => println!("{}: no token stored", store.path().display()),
        },
    }

    Ok(())
}

fn init_config(output: &Path, url: String) -> anyhow::Result<()> {
    let config = ClientConfig::new(url);
    config.validate()?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, config.to_toml()?)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("Config written to {}", output.display());
    Ok(())
}

//! campus-server binary.
//!
//! Reads `campus.toml` (or the path given with `--config`) overlaid with
//! `CAMPUS_*` environment variables, opens the SQLite store and media
//! directory, and serves the API over HTTP.
//!
//! # Bootstrapping
//!
//! The first administrator has to be created from the command line:
//!
//! ```text
//! campus-server create-admin --code ADM001 --full-name "Site Admin" --username admin
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use campus_api::{ApiState, auth::hash_password};
use campus_core::{
  provision,
  user::{NewUser, UserDetails},
};
use campus_server::{FsMediaStore, ServerConfig};
use campus_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Campus student-affairs server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "campus.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,

  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,

  /// Create an administrator account. The password is read from stdin.
  CreateAdmin {
    #[arg(long)]
    code:      String,
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    username:  String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Some(Command::HashPassword) = cli.command {
    let password = read_password()?;
    println!("{}", hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?);
    return Ok(());
  }

  let config = load_config(&cli.config)?;
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Some(Command::CreateAdmin { code, full_name, username }) => {
      create_admin(&store, code, full_name, username).await
    }
    _ => serve(store, config).await,
  }
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("CAMPUS"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn serve(store: SqliteStore, config: ServerConfig) -> anyhow::Result<()> {
  let media_dir = expand_tilde(&config.media_dir);
  tokio::fs::create_dir_all(&media_dir)
    .await
    .with_context(|| format!("failed to create media directory {media_dir:?}"))?;

  let state = ApiState {
    store:     Arc::new(store),
    media:     Arc::new(FsMediaStore::new(media_dir)),
    paginator: config.paginator(),
  };
  let app = campus_server::app(state, &config);
  let address = format!("{}:{}", config.host, config.port);

  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_admin(
  store: &SqliteStore,
  code: String,
  full_name: String,
  username: String,
) -> anyhow::Result<()> {
  let password = read_password()?;
  if password.is_empty() {
    anyhow::bail!("password must not be empty");
  }
  let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?;

  let user = NewUser { code, full_name, email: None, details: UserDetails::Administrator };
  let (user, account) = provision::register_account(store, user, username, hash)
    .await
    .context("failed to create administrator")?;

  tracing::info!(code = %user.code, username = %account.username, "administrator created");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

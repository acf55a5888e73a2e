use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use backend_lib::{
    auth::{AuthService, PasswordVerifier},
    config::{LogFormat, Settings},
    router,
    storage::FlatFileCredentialStore,
    AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::Zeroizing;

const LIMITER_CLEANUP_PERIOD: Duration = Duration::from_secs(10 * 60);

#[derive(Parser)]
#[command(name = "keygate", version, about = "Credential verification and token issuance service")]
struct Cli {
    /// TOML configuration file, instead of config/default.toml and config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the login endpoint (default)
    Serve,
    /// Read a password from stdin and print its hash
    HashPassword,
    /// Read a password from stdin and add or replace an account in the users file
    AddUser {
        username: String,
        /// Users file, defaults to `store.users_file`
        #[arg(long)]
        users_file: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    settings.context("failed to load configuration")
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_ascii_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn read_password() -> anyhow::Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string());
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let store = Arc::new(FlatFileCredentialStore::new(&settings.store.users_file));
    let bind_addr = settings.bind_addr;
    let users_file = settings.store.users_file.clone();

    let state = AppState::from_settings(store, settings)?;
    // refuse to serve logins that could never be signed
    state
        .auth
        .health()
        .context("token signing self-check failed")?;

    if let Some(limiter) = &state.rate_limiter {
        Arc::clone(limiter).spawn_cleanup(LIMITER_CLEANUP_PERIOD);
    }

    let app = router::create_router(Arc::new(state));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, users_file = %users_file.display(), "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref())?;
    init_tracing(&settings);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::HashPassword => {
            let verifier = PasswordVerifier::new(&settings.kdf)?;
            let password = read_password()?;
            println!("{}", verifier.hash(&password)?);
            Ok(())
        },
        Command::AddUser {
            username,
            users_file,
        } => {
            backend_lib::validation::validate_username(&username)?;
            let verifier = PasswordVerifier::new(&settings.kdf)?;
            let password = read_password()?;
            backend_lib::validation::validate_password(&password)?;

            let hash = verifier.hash(&password)?;
            let store = FlatFileCredentialStore::new(
                users_file.unwrap_or_else(|| settings.store.users_file.clone()),
            );
            store.upsert(&username, &hash).await?;
            tracing::info!(%username, users_file = %store.path().display(), "account saved");
            Ok(())
        },
    }
}

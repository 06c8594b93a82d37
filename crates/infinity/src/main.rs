use anyhow::{bail, Result};
use clap::Parser;
use listenfd::ListenFd;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infinity::{app::create_app, config::Config, password::hash_password, state::AppState};
use infinity_core::migration::MigrationReport;
use infinity_core::query::Record;

/// Infinity CMS - a small content-management system
#[derive(Parser, Debug)]
#[command(name = "infinity")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Apply or roll back database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// List registered routes
    Routes,

    /// Manage back-office users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct ServeArgs {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "8000", env = "PORT")]
    port: u16,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum MigrateAction {
    /// Run all pending migrations
    Run,
    /// Roll back the last batch
    Rollback,
    /// Roll back every batch
    Reset,
    /// Show every migration and its batch
    Status,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum UserAction {
    /// Create a user that can log in to the back-office
    Create {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "INFINITY_PASSWORD")]
        password: String,

        #[arg(long, default_value = "admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "infinity=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let state = AppState::open(config).await?;

    match cli.command {
        None | Some(Commands::Serve) => serve(state, cli.serve).await,
        Some(Commands::Migrate { action }) => migrate(&state, action).await,
        Some(Commands::Routes) => {
            for route in state.router.routes() {
                println!(
                    "{:<7} {:<32} {}",
                    route.method.as_str(),
                    route.uri,
                    route.middleware.join(", ")
                );
            }
            Ok(())
        }
        Some(Commands::User { action }) => user(&state, action).await,
    }
}

async fn serve(state: AppState, args: ServeArgs) -> Result<()> {
    if state.db.table_exists("users").await? && state.db.table("users").count().await? == 0 {
        tracing::warn!("no users yet; create one with `infinity user create`");
    }
    if state.migrator.has_pending().await? {
        tracing::warn!("there are pending migrations; run `infinity migrate run`");
    }

    let app = create_app(state);

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        None => {
            let addr = format!("{}:{}", args.host, args.port);
            TcpListener::bind(&addr).await?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn migrate(state: &AppState, action: MigrateAction) -> Result<()> {
    let report = match action {
        MigrateAction::Run => state.migrator.run().await?,
        MigrateAction::Rollback => state.migrator.rollback().await?,
        MigrateAction::Reset => state.migrator.reset().await?,
        MigrateAction::Status => {
            for status in state.migrator.status().await? {
                let batch = status.batch.map_or_else(|| "-".to_string(), |b| b.to_string());
                println!("{:<9} {:>5}  {}", status.state.to_string(), batch, status.migration);
            }
            return Ok(());
        }
    };

    print_report(&report);
    if report.has_failures() {
        bail!("some migrations failed");
    }
    Ok(())
}

fn print_report(report: &MigrationReport) {
    for line in report.lines() {
        println!("{line}");
    }
}

async fn user(state: &AppState, action: UserAction) -> Result<()> {
    match action {
        UserAction::Create {
            username,
            email,
            password,
            role,
        } => {
            if password.len() < 8 {
                bail!("password must be at least 8 characters");
            }
            let taken = state
                .db
                .table("users")
                .where_eq("username", username.as_str())
                .or_where_eq("email", email.as_str())
                .count()
                .await?;
            if taken > 0 {
                bail!("a user with that username or email already exists");
            }

            let id = state
                .db
                .table("users")
                .insert(
                    &Record::new()
                        .set("username", username.as_str())
                        .set("email", email.as_str())
                        .set("password", hash_password(&password)?)
                        .set("role", role.as_str()),
                )
                .await?;

            tracing::info!(user_id = id, username = %username, "user created");
            println!("Created user {username} (id {id})");
            Ok(())
        }
    }
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

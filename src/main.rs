use std::sync::Arc;

use anyhow::{Context, Result};
use awesome_blog::{
    blog::{self, AppState, Blog, Comment, User},
    config::AppConfig,
    db::ConnectionPool,
    orm::{EntitySchema, Model},
    web::FileTemplates,
};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "awesome-blog")]
#[command(about = "Awesome blog web application")]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the table DDL of every model
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Schema => print_schema(),
        Command::Serve => {
            init_tracing();
            serve(cli.config).await
        }
    }
}

fn print_schema() -> Result<()> {
    let schemas = [
        EntitySchema::build(User::TABLE, User::fields()),
        EntitySchema::build(Blog::TABLE, Blog::fields()),
        EntitySchema::build(Comment::TABLE, Comment::fields()),
    ];
    for schema in schemas {
        let schema = schema.context("invalid model schema")?;
        println!("{}\n", schema.create_table());
    }
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    let pool = ConnectionPool::connect(config.pool_config())
        .await
        .with_context(|| format!("failed to connect to {}", config.database_url))?;
    let db = blog::register_models(pool).context("failed to register models")?;
    db.create_tables()
        .await
        .context("failed to initialize blog schema")?;

    let templates = FileTemplates::load(&config.templates_dir).with_context(|| {
        format!(
            "failed to load templates from {}",
            config.templates_dir.display()
        )
    })?;

    let state = AppState::new(db.clone(), Arc::new(templates), config.settings());
    let app = blog::build_router(state).context("invalid route table")?;

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "awesome blog started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.pool().close().await;
    info!("server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("awesome_blog=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Inquirydesk CLI entry point.
//!
//! Provides `serve`, `product add`, `stats`, and `check-config` subcommands.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use inquirydesk::catalog::{ProductCatalog, SqliteCatalog};
use inquirydesk::config::Config;
use inquirydesk::http::session::TokenSessions;
use inquirydesk::http::{self, AppState};
use inquirydesk::inquiry::service::InquiryService;
use inquirydesk::inquiry::sqlite::SqliteInquiryStore;
use inquirydesk::inquiry::store::InquiryStore;
use inquirydesk::{db, logging, stats};

/// Inquirydesk: B2B catalog inquiry service.
#[derive(Parser)]
#[command(name = "inquirydesk", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve,
    /// Manage the local product catalog.
    Product {
        /// Product action.
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Print dashboard counts as JSON and exit.
    Stats,
    /// Load and validate configuration, then exit.
    CheckConfig,
}

/// Product catalog actions.
#[derive(Subcommand)]
enum ProductAction {
    /// Insert a product, or rename an existing one.
    Add {
        /// Product id referenced by inquiries.
        #[arg(long)]
        id: String,
        /// Display name.
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    match cli.command {
        Command::Serve => handle_serve().await,
        Command::Product {
            action: ProductAction::Add { id, name },
        } => handle_product_add(&id, &name).await,
        Command::Stats => handle_stats().await,
        Command::CheckConfig => handle_check_config(),
    }
}

/// Run the HTTP API until Ctrl-C.
async fn handle_serve() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let logs_dir = config.logs_dir()?;
    let _logging_guard = logging::init_server(&logs_dir, &config.logging.level)?;

    let db_path = config.database_path()?;
    let pool = db::open(&db_path).await?;

    let store = Arc::new(SqliteInquiryStore::new(pool.clone()));
    let catalog = Arc::new(SqliteCatalog::new(pool));
    if catalog.count().await? == 0 {
        warn!("product catalog is empty; add products with `inquirydesk product add`");
    }

    let service = InquiryService::new(
        Arc::clone(&store) as Arc<dyn InquiryStore>,
        catalog,
        config.inquiries.terminal_policy,
    );
    let sessions = Arc::new(TokenSessions::from_config(&config.auth));
    let state = AppState::new(service, sessions, config.server.page_size);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        database = %db_path.display(),
        terminal_policy = ?config.inquiries.terminal_policy,
        "inquirydesk started"
    );

    http::serve(listener, http::router(state))
        .await
        .context("http server failed")?;

    if let Ok(store) = Arc::try_unwrap(store) {
        store.shutdown().await;
    }
    info!("inquirydesk stopped");
    Ok(())
}

/// Insert or rename a catalog product.
async fn handle_product_add(id: &str, name: &str) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    logging::init_cli(&config.logging.level);

    let pool = db::open(&config.database_path()?).await?;
    let product = SqliteCatalog::new(pool)
        .upsert(id, name)
        .await
        .context("failed to save product")?;
    println!("{} {}", product.id, product.name);
    Ok(())
}

/// Print dashboard counts.
async fn handle_stats() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    logging::init_cli(&config.logging.level);

    let pool = db::open(&config.database_path()?).await?;
    let store = SqliteInquiryStore::new(pool.clone());
    let catalog = SqliteCatalog::new(pool);
    let counts = stats::collect(&store, &catalog)
        .await
        .context("failed to collect stats")?;
    println!("{}", serde_json::to_string_pretty(&counts)?);
    store.shutdown().await;
    Ok(())
}

/// Validate configuration without starting anything.
fn handle_check_config() -> anyhow::Result<()> {
    logging::init_cli("info");
    let config = Config::load().context("configuration is invalid")?;
    println!("bind: {}", config.bind_addr()?);
    println!("database: {}", config.database_path()?.display());
    println!("page_size: {}", config.server.page_size);
    println!("terminal_policy: {:?}", config.inquiries.terminal_policy);
    println!(
        "tokens: {} admin, {} customer",
        config.auth.admin_tokens.len(),
        config.auth.customer_tokens.len()
    );
    Ok(())
}

//! CLI administration tool for url-pulse.
//!
//! Creates and inspects short links directly against the database, without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Create a short link (prompts for the URL when omitted)
//! cargo run --bin admin -- link create https://example.com
//!
//! # Show a link and its redirect counter
//! cargo run --bin admin -- link show aB3xY9
//!
//! # Totals across all links
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `BASE_URL` (optional): prefix for printed short URLs

use url_pulse::application::services::LinkService;
use url_pulse::config::mask_connection_string;
use url_pulse::error::AppError;
use url_pulse::infrastructure::persistence::PgLinkRepository;
use url_pulse::live::{Broadcaster, ConnectionRegistry, EventSource};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input};
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing url-pulse.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage short links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Show totals across all links
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Create a new short link
    Create {
        /// URL to shorten (prompted for when omitted)
        url: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show a link and its redirect counter
    Show {
        /// Short code
        code: String,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to database at {}",
                mask_connection_string(&database_url)
            )
        })?;

    match cli.command {
        Commands::Link { action } => handle_link_action(action, pool).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Builds a link service with no live viewers attached.
fn link_service(pool: PgPool) -> LinkService {
    let base_url =
        std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());
    let repository = Arc::new(PgLinkRepository::new(Arc::new(pool)));
    let events = EventSource::new(Broadcaster::new(Arc::new(ConnectionRegistry::new())));

    LinkService::new(repository, events, base_url)
}

async fn handle_link_action(action: LinkAction, pool: PgPool) -> Result<()> {
    let service = link_service(pool);

    match action {
        LinkAction::Create { url, yes } => create_link(&service, url, yes).await,
        LinkAction::Show { code } => show_link(&service, &code).await,
    }
}

/// Creates a short link with interactive prompts.
///
/// # Flow
///
/// 1. Prompt for the URL (or use provided)
/// 2. Confirm creation (unless `--yes` flag)
/// 3. Store with a generated code
/// 4. Print the short URL
async fn create_link(service: &LinkService, url: Option<String>, skip_confirm: bool) -> Result<()> {
    println!("{}", "🔗 Create Short Link".bright_blue().bold());
    println!();

    let long_url = match url {
        Some(u) => u,
        None => Input::new()
            .with_prompt("URL to shorten")
            .with_initial_text("https://")
            .interact_text()?,
    };

    println!("  URL: {}", long_url.cyan());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this link?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let link = service
        .shorten(&long_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create link: {}", e))?;

    println!();
    println!("{}", "✅ Link created successfully!".green().bold());
    println!();
    println!("  Code:      {}", link.code.bright_yellow().bold());
    println!(
        "  Short URL: {}",
        service.short_url(&link.code).bright_cyan()
    );
    println!();

    Ok(())
}

/// Prints one link.
///
/// # Output Format
///
/// ```text
/// 🔎 Link aB3xY9
///
///   URL:       https://example.com/
///   Created:   2025-05-21 10:30
///   Redirects: 42
/// ```
async fn show_link(service: &LinkService, code: &str) -> Result<()> {
    let link = match service.get_link(code).await {
        Ok(link) => link,
        Err(AppError::NotFound { .. }) => {
            println!("{}", format!("⚠️  No link with code '{}'", code).yellow());
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!("Database error: {}", e)),
    };

    println!("{} {}", "🔎 Link".bright_blue().bold(), link.code.bright_yellow());
    println!();
    println!("  URL:       {}", link.long_url.cyan());
    println!(
        "  Created:   {}",
        link.created_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );
    println!(
        "  Redirects: {}",
        link.redirect_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Displays link and redirect totals.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let (links_count, redirects_count): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(redirect_count), 0)::BIGINT FROM short_urls",
    )
    .fetch_one(pool)
    .await?;

    println!(
        "  Links:     {}",
        links_count.to_string().bright_green().bold()
    );
    println!(
        "  Redirects: {}",
        redirects_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
    }

    Ok(())
}

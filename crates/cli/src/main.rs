//! ecomm CLI - storefront and admin console for the ecomm backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from ECOMM_PASSWORD or prompted on stdin)
//! ecomm login alice
//!
//! # Browse and fill the cart
//! ecomm products list --search lamp --sort asc
//! ecomm cart add 3f1c9a52-... --quantity 2
//!
//! # Check prices and stock, then place the order
//! ecomm checkout --reconcile
//!
//! # Admin
//! ecomm admin orders status ORDER-1700000000000 approved
//! ```
//!
//! Session and cart are kept in `ECOMM_STATE_DIR` (default `.ecomm`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use ecomm_storefront::{Storefront, StorefrontConfig};

mod commands;
mod error;

use commands::{AdminCommand, CartCommand, CategoryCommand, OrderCommand, ProductCommand};
use error::CliError;

#[derive(Parser)]
#[command(name = "ecomm")]
#[command(author, version, about = "ecomm storefront console")]
struct Cli {
    /// Backend API base URL
    #[arg(long, global = true, env = "ECOMM_API_URL")]
    api_url: Option<Url>,

    /// Directory for persisted session and cart
    #[arg(long, global = true, env = "ECOMM_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        username: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "ECOMM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Register a new account
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "ECOMM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductCommand,
    },
    /// Browse categories
    Categories {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
    /// Place an order for the cart contents
    Checkout {
        /// Refresh prices and stock before ordering
        #[arg(long)]
        reconcile: bool,
    },
    /// Your purchase orders
    Orders {
        #[command(subcommand)]
        action: OrderCommand,
    },
    /// Catalog and order administration
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e.user_message());
        tracing::debug!(error = ?e, "Command failed");
        std::process::exit(1);
    }
}

/// Initialize tracing with `EnvFilter`, switching to JSON output when
/// `ECOMM_LOG_FORMAT=json`.
fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecomm_storefront=info,ecomm_cli=info".into());

    let json = std::env::var("ECOMM_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<StorefrontConfig, CliError> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let shop = Storefront::open(load_config(&cli)?)?;

    // Tokens can lapse between invocations.
    shop.session().revalidate()?;

    let result = match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&shop, &username, password).await
        }
        Commands::Logout => commands::auth::logout(&shop),
        Commands::Whoami => {
            commands::auth::whoami(&shop);
            Ok(())
        }
        Commands::Signup {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            commands::auth::signup(&shop, username, email, first_name, last_name, password).await
        }
        Commands::Products { action } => commands::catalog::products(&shop, action).await,
        Commands::Categories { action } => commands::catalog::categories(&shop, action).await,
        Commands::Cart { action } => commands::cart::run(&shop, action).await,
        Commands::Checkout { reconcile } => commands::cart::checkout(&shop, reconcile).await,
        Commands::Orders { action } => commands::orders::run(&shop, action).await,
        Commands::Admin { action } => commands::admin::run(&shop, action).await,
    };

    commands::print_alerts(&shop);
    result
}

//! # Stockline CLI
//!
//! Command-line boundary for the checkout workspace.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stockline <command> --user <id>                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AppConfig::load ──► Database::new ──► CheckoutService                  │
//! │                                             │                           │
//! │                       stdout ◄── JSON ◄─────┤                           │
//! │                       stderr ◄── {"code","message"} (exit 1)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logs go to stderr so stdout stays machine-readable.

mod commands;
mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::ApiError;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "stockline", version, about = "Cart checkout against a local inventory")]
pub struct Cli {
    /// Config file (TOML).
    #[arg(long, global = true, env = "STOCKLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file; overrides config and STOCKLINE_DB_PATH.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the catalog.
    Products {
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// Inspect or edit a cart.
    #[command(subcommand)]
    Cart(CartCommand),

    /// Turn a cart into an order.
    #[command(subcommand)]
    Checkout(CheckoutCommand),

    /// Read placed orders.
    #[command(subcommand)]
    Orders(OrdersCommand),
}

#[derive(Debug, Args)]
pub struct UserArg {
    #[arg(long)]
    pub user: String,
}

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    Show(UserArg),

    /// Add units, merging with an existing line.
    Add {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        product: String,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
    },

    /// Replace a line's quantity.
    Set {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        product: String,
        #[arg(long)]
        quantity: i64,
    },

    Remove {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        product: String,
    },

    Clear(UserArg),
}

#[derive(Debug, Subcommand)]
pub enum CheckoutCommand {
    /// Open a payment intent for the cart total.
    Start {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        email: String,
    },

    /// Confirm payment and complete the order.
    Verify {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        reference: String,
    },

    /// Complete the order without a payment step.
    Now(UserArg),
}

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    List(UserArg),

    Show {
        #[command(flatten)]
        user: UserArg,
        #[arg(long)]
        id: String,
    },
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let api = match err.downcast::<ApiError>() {
                Ok(api) => api,
                Err(other) => ApiError::internal(format!("{other:#}")),
            };
            eprintln!("{}", api.to_json());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockline=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_add_defaults_quantity() {
        let cli = Cli::try_parse_from(["stockline", "cart", "add", "--user", "u1", "--product", "p1"]).unwrap();

        match cli.command {
            Command::Cart(CartCommand::Add { user, product, quantity }) => {
                assert_eq!(user.user, "u1");
                assert_eq!(product, "p1");
                assert_eq!(quantity, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_checkout_verify() {
        let cli = Cli::try_parse_from([
            "stockline",
            "--db",
            "/tmp/s.db",
            "checkout",
            "verify",
            "--user",
            "u1",
            "--reference",
            "order_1_abc_00",
        ])
        .unwrap();

        assert_eq!(cli.db, Some(PathBuf::from("/tmp/s.db")));
        assert!(matches!(
            cli.command,
            Command::Checkout(CheckoutCommand::Verify { ref reference, .. }) if reference == "order_1_abc_00"
        ));
    }

    #[test]
    fn test_user_is_required() {
        assert!(Cli::try_parse_from(["stockline", "orders", "list"]).is_err());
    }
}

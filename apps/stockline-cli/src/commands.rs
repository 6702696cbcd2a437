//! # Command Handlers
//!
//! One function per subcommand. Each validates its input, calls the
//! checkout service or a repository, and prints the result as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use stockline_checkout::CheckoutService;
use stockline_core::validation::validate_user_id;
use stockline_core::{ErrorCode, Money, SnapshotLine};
use stockline_db::{Database, DbConfig};
use stockline_payments::{
    GatewayError, GatewayResult, InitiateRequest, PaymentGateway, PaymentIntent, PaymentVerification,
    PaystackGateway,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::{CartCommand, CheckoutCommand, Cli, Command, OrdersCommand};

type CommandResult = anyhow::Result<()>;

// =============================================================================
// Context
// =============================================================================

struct AppContext {
    config: AppConfig,
    db: Database,
}

impl AppContext {
    async fn open(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = AppConfig::load(cli.config.clone()).map_err(ApiError::from)?;
        if let Some(path) = &cli.db {
            config.database.path = Some(path.clone());
        }

        let path = config.database_path().map_err(ApiError::from)?;
        debug!(?path, "Opening database");

        let db_config = DbConfig::new(path)
            .max_connections(config.database.max_connections)
            .busy_timeout(Duration::from_secs(config.database.busy_timeout_secs));
        let db = Database::new(db_config).await.map_err(ApiError::from)?;
        if !db.health_check().await {
            return Err(ApiError::new(ErrorCode::StorageError, "Database is not answering queries").into());
        }

        Ok(AppContext { config, db })
    }

    /// Service backed by the configured payment provider.
    fn paid_service(&self) -> anyhow::Result<CheckoutService> {
        let gateway_config = self.config.gateway_config().map_err(ApiError::from)?;
        let gateway = PaystackGateway::new(gateway_config).map_err(ApiError::from)?;
        Ok(self.service(Arc::new(gateway)))
    }

    /// Service for commands that never reach the provider.
    fn local_service(&self) -> CheckoutService {
        self.service(Arc::new(NoGateway))
    }

    fn service(&self, gateway: Arc<dyn PaymentGateway>) -> CheckoutService {
        CheckoutService::new(self.db.clone(), gateway).with_settings(self.config.checkout_settings())
    }
}

/// Stand-in for commands that run without gateway credentials.
struct NoGateway;

#[async_trait]
impl PaymentGateway for NoGateway {
    async fn initiate(&self, _request: &InitiateRequest) -> GatewayResult<PaymentIntent> {
        Err(GatewayError::Configuration("payment gateway not configured".into()))
    }

    async fn verify(&self, _reference: &str) -> GatewayResult<PaymentVerification> {
        Err(GatewayError::Configuration("payment gateway not configured".into()))
    }
}

// =============================================================================
// Dispatch
// =============================================================================

pub async fn run(cli: Cli) -> CommandResult {
    let ctx = AppContext::open(&cli).await?;

    let outcome = match cli.command {
        Command::Products { limit } => products(&ctx, limit).await,
        Command::Cart(command) => cart(&ctx, command).await,
        Command::Checkout(command) => checkout(&ctx, command).await,
        Command::Orders(command) => orders(&ctx, command).await,
    };

    ctx.db.close().await;
    outcome
}

async fn products(ctx: &AppContext, limit: u32) -> CommandResult {
    let products = ctx.db.products().list(limit).await.map_err(ApiError::from)?;
    print_json(&products)
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
struct CartView {
    user_id: String,
    lines: Vec<SnapshotLine>,
    /// None if the total does not fit in an i64.
    total_amount: Option<i64>,
}

impl CartView {
    fn new(user_id: &str, lines: Vec<SnapshotLine>) -> Self {
        let total = lines.iter().map(SnapshotLine::line_total).sum::<Option<Money>>();
        CartView {
            user_id: user_id.to_string(),
            total_amount: total.map(|money| money.minor()),
            lines,
        }
    }
}

async fn cart(ctx: &AppContext, command: CartCommand) -> CommandResult {
    let carts = ctx.db.carts();

    // Repository calls validate user ids and quantities themselves.
    let user_id = match command {
        CartCommand::Show(user) => {
            validate_user_id(&user.user).map_err(ApiError::from)?;
            user.user
        }
        CartCommand::Add { user, product, quantity } => {
            carts.add_line(&user.user, &product, quantity).await.map_err(ApiError::from)?;
            user.user
        }
        CartCommand::Set { user, product, quantity } => {
            carts
                .update_quantity(&user.user, &product, quantity)
                .await
                .map_err(ApiError::from)?;
            user.user
        }
        CartCommand::Remove { user, product } => {
            carts.remove_line(&user.user, &product).await.map_err(ApiError::from)?;
            user.user
        }
        CartCommand::Clear(user) => {
            carts.clear(&user.user).await.map_err(ApiError::from)?;
            user.user
        }
    };

    let lines = carts.snapshot(&user_id).await.map_err(ApiError::from)?;
    print_json(&CartView::new(&user_id, lines))
}

// =============================================================================
// Checkout & Orders
// =============================================================================

async fn checkout(ctx: &AppContext, command: CheckoutCommand) -> CommandResult {
    match command {
        CheckoutCommand::Start { user, email } => {
            let session = ctx
                .paid_service()?
                .initiate_checkout(&user.user, &email)
                .await
                .map_err(ApiError::from)?;
            print_json(&session)
        }
        CheckoutCommand::Verify { user, reference } => {
            let order = ctx
                .paid_service()?
                .verify_and_complete(&user.user, &reference)
                .await
                .map_err(ApiError::from)?;
            print_json(&order)
        }
        CheckoutCommand::Now(user) => {
            let order = ctx.local_service().checkout_now(&user.user).await.map_err(ApiError::from)?;
            print_json(&order)
        }
    }
}

async fn orders(ctx: &AppContext, command: OrdersCommand) -> CommandResult {
    let service = ctx.local_service();

    match command {
        OrdersCommand::List(user) => {
            let orders = service.orders(&user.user).await.map_err(ApiError::from)?;
            print_json(&orders)
        }
        OrdersCommand::Show { user, id } => {
            let order = service.order(&user.user, &id).await.map_err(ApiError::from)?;
            print_json(&order)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> CommandResult {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i64, unit_price: i64) -> SnapshotLine {
        SnapshotLine {
            product_id: "p1".to_string(),
            product_name: "Widget".to_string(),
            quantity,
            unit_price,
            stock: 10,
        }
    }

    #[test]
    fn test_cart_view_total() {
        let view = CartView::new("u1", vec![line(2, 100), line(1, 250)]);
        assert_eq!(view.total_amount, Some(450));
    }

    #[test]
    fn test_cart_view_overflow() {
        let view = CartView::new("u1", vec![line(2, i64::MAX)]);
        assert_eq!(view.total_amount, None);
    }

    #[tokio::test]
    async fn test_no_gateway_refuses() {
        let err = NoGateway.verify("order_1_abc_00").await.unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unusable_gateway_secret_is_validation_error() {
        let config = AppConfig::from_toml("[gateway]\nsecret_key = \"sk_test\\nbroken\"\n").unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ctx = AppContext { config, db };

        let err = match ctx.paid_service() {
            Ok(_) => panic!("secret with a line break must not build a gateway"),
            Err(err) => err.downcast::<ApiError>().unwrap(),
        };
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}

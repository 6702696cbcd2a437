//! Shared fixtures for the orchestrator tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use stockline_checkout::CheckoutService;
use stockline_core::Product;
use stockline_db::{Database, DbConfig};
use stockline_payments::{
    GatewayError, GatewayResult, InitiateRequest, PaymentGateway, PaymentIntent, PaymentVerification,
};

/// What the next `verify` call should answer.
#[derive(Debug, Clone)]
pub enum VerifyScript {
    /// `"success"` with the given reported amount.
    Paid(Option<i64>),
    /// Any non-success status string.
    Status(String),
    Unavailable,
    /// HTTP error with this status.
    Refused(u16),
    /// Sleeps this long, then reports success.
    Hang(Duration),
}

/// In-process gateway that counts calls and replays a script.
pub struct ScriptedGateway {
    verify_script: Mutex<VerifyScript>,
    initiate_fails: bool,
    initiate_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    last_initiate: Mutex<Option<InitiateRequest>>,
}

impl ScriptedGateway {
    /// Verifies every reference as paid, without a reported amount.
    pub fn paid() -> Arc<Self> {
        Arc::new(Self::with_script(VerifyScript::Paid(None)))
    }

    pub fn scripted(script: VerifyScript) -> Arc<Self> {
        Arc::new(Self::with_script(script))
    }

    pub fn initiate_down() -> Arc<Self> {
        let mut gateway = Self::with_script(VerifyScript::Unavailable);
        gateway.initiate_fails = true;
        Arc::new(gateway)
    }

    fn with_script(script: VerifyScript) -> Self {
        ScriptedGateway {
            verify_script: Mutex::new(script),
            initiate_fails: false,
            initiate_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            last_initiate: Mutex::new(None),
        }
    }

    pub fn set_script(&self, script: VerifyScript) {
        *self.verify_script.lock().unwrap() = script;
    }

    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn last_initiate(&self) -> Option<InitiateRequest> {
        self.last_initiate.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initiate(&self, request: &InitiateRequest) -> GatewayResult<PaymentIntent> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_initiate.lock().unwrap() = Some(request.clone());

        if self.initiate_fails {
            return Err(GatewayError::Unavailable("connection refused".to_string()));
        }

        Ok(PaymentIntent {
            authorization_url: format!("https://pay.test/{}", request.reference),
            access_code: "ac_test".to_string(),
            reference: request.reference.clone(),
        })
    }

    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.verify_script.lock().unwrap().clone();

        let paid = |amount| PaymentVerification {
            succeeded: true,
            raw_status: "success".to_string(),
            reference: reference.to_string(),
            amount,
            currency: Some("NGN".to_string()),
        };

        match script {
            VerifyScript::Paid(amount) => Ok(paid(amount)),
            VerifyScript::Status(status) => Ok(PaymentVerification {
                succeeded: false,
                raw_status: status,
                reference: reference.to_string(),
                amount: None,
                currency: None,
            }),
            VerifyScript::Unavailable => Err(GatewayError::Unavailable("connection reset".to_string())),
            VerifyScript::Refused(status) => Err(GatewayError::Rejected {
                status,
                message: "Transaction reference not found".to_string(),
            }),
            VerifyScript::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(paid(None))
            }
        }
    }
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database with several connections, for concurrency tests.
pub async fn file_db(dir: &Path) -> Database {
    let config = DbConfig::new(dir.join("stockline.db"))
        .max_connections(8)
        .busy_timeout(Duration::from_secs(30));
    Database::new(config).await.unwrap()
}

pub fn service(db: &Database, gateway: Arc<ScriptedGateway>) -> CheckoutService {
    CheckoutService::new(db.clone(), gateway)
}

pub async fn product(db: &Database, name: &str, price: i64, stock: i64) -> Product {
    db.products().create(name, None, price, stock).await.unwrap()
}

pub async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products().get(product_id).await.unwrap().stock
}

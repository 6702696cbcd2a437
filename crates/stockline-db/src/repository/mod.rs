//! # Repository Module
//!
//! Database repository implementations for Stockline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and What They Own                       │
//! │                                                                         │
//! │  ProductRepository   catalog lookup, inventory ledger                  │
//! │  ├── get / get_by_id / list / insert / update / count                  │
//! │  └── reduce_stock (conditional) / update_stock / restock               │
//! │                                                                         │
//! │  CartRepository      cart lines, snapshot provider                     │
//! │  ├── add_line / update_quantity / remove_line / clear                  │
//! │  └── snapshot / lines                                                  │
//! │                                                                         │
//! │  OrderRepository     order ledger (append-only)                        │
//! │  └── insert / find_by_reference / find_by_user / find_by_id / count    │
//! │                                                                         │
//! │  CheckoutRepository  the atomic section                                │
//! │  └── commit: insert order + reduce stock per line + clear cart,        │
//! │      one SQLite transaction                                            │
//! │                                                                         │
//! │  The statements the atomic section needs are written once, against    │
//! │  `&mut SqliteConnection`, and shared by the pool-level methods.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

//! Immediate checkout and order reads.

mod common;

use common::{memory_db, product, service, stock_of, ScriptedGateway};
use stockline_core::{CheckoutError, ErrorCode, OrderStatus};

#[tokio::test]
async fn test_checkout_now_skips_gateway() {
    let db = memory_db().await;
    let gateway = ScriptedGateway::paid();
    let svc = service(&db, gateway.clone());

    let a = product(&db, "A", 100, 5).await;
    let b = product(&db, "B", 30, 10).await;
    db.carts().add_line("user01", &a.id, 2).await.unwrap();
    db.carts().add_line("user01", &b.id, 3).await.unwrap();

    let order = svc.checkout_now("user01").await.unwrap();

    assert_eq!(order.total_amount, 290);
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.payment_reference.starts_with("order_"));
    // Lines keep cart order.
    assert_eq!(order.items[0].product_id, a.id);
    assert_eq!(order.items[1].product_id, b.id);

    assert_eq!(stock_of(&db, &a.id).await, 3);
    assert_eq!(stock_of(&db, &b.id).await, 7);
    assert_eq!(gateway.verify_calls(), 0);
    assert_eq!(gateway.initiate_calls(), 0);
}

#[tokio::test]
async fn test_checkout_now_empty_cart() {
    let db = memory_db().await;
    let svc = service(&db, ScriptedGateway::paid());

    let err = svc.checkout_now("user01").await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn test_checkout_now_short_line_aborts_everything() {
    let db = memory_db().await;
    let svc = service(&db, ScriptedGateway::paid());

    let a = product(&db, "A", 100, 5).await;
    let b = product(&db, "B", 50, 3).await;
    db.carts().add_line("user01", &a.id, 2).await.unwrap();
    db.carts().add_line("user01", &b.id, 3).await.unwrap();
    db.products().update_stock(&b.id, 1).await.unwrap();

    let err = svc.checkout_now("user01").await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientStock);
    assert_eq!(err.to_string(), r#"Insufficient stock for "B". Available: 1"#);
    assert_eq!(stock_of(&db, &a.id).await, 5);
    assert_eq!(db.orders().count().await.unwrap(), 0);
    assert_eq!(db.carts().snapshot("user01").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_orders_newest_first_and_scoped_to_owner() {
    let db = memory_db().await;
    let svc = service(&db, ScriptedGateway::paid());

    let a = product(&db, "A", 100, 10).await;

    db.carts().add_line("user01", &a.id, 1).await.unwrap();
    let older = svc.checkout_now("user01").await.unwrap();
    db.carts().add_line("user01", &a.id, 2).await.unwrap();
    let newer = svc.checkout_now("user01").await.unwrap();

    let orders = svc.orders("user01").await.unwrap();
    let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);

    assert!(svc.orders("user02").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_lookup_hides_other_users() {
    let db = memory_db().await;
    let svc = service(&db, ScriptedGateway::paid());

    let a = product(&db, "A", 100, 10).await;
    db.carts().add_line("user01", &a.id, 1).await.unwrap();
    let order = svc.checkout_now("user01").await.unwrap();

    let mine = svc.order("user01", &order.id).await.unwrap();
    assert_eq!(mine.id, order.id);

    let err = svc.order("user02", &order.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = svc.order("user01", "no-such-order").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_blank_user_rejected() {
    let db = memory_db().await;
    let svc = service(&db, ScriptedGateway::paid());

    let err = svc.orders("   ").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

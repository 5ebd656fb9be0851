//! Cart, reconciliation and order submission against the mock backend.

use std::sync::Arc;

use secrecy::SecretString;

use ecomm_core::{Price, ProductId};
use ecomm_integration_tests::MockBackend;
use ecomm_storefront::Storefront;
use ecomm_storefront::alerts::AlertKind;
use ecomm_storefront::cart::CartProduct;
use ecomm_storefront::checkout::{CheckoutError, CheckoutState, Discrepancy};
use ecomm_storefront::storage::MemoryStore;

const LAMP: &str = "8d0f6c1e-3c44-4b7a-9a35-0c6f1d0d4a11";
const DESK: &str = "2b7e9f40-51d2-4c8e-8f0b-6a2f3e9c7d22";
const CHAIR: &str = "f3a1c2d4-7e6b-4a59-b1c0-9d8e7f6a5b33";

async fn backend() -> MockBackend {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "wonderland", false).await;
    backend.add_category("furniture", "Furniture").await;
    backend.add_product(LAMP, "Lamp", 10.0, 10, "furniture").await;
    backend.add_product(DESK, "Desk", 120.5, 3, "furniture").await;
    backend.add_product(CHAIR, "Chair", 45.25, 6, "furniture").await;
    backend
}

async fn signed_in(backend: &MockBackend) -> Storefront {
    let shop = backend.client();
    shop.auth()
        .login("alice", SecretString::from("wonderland".to_owned()))
        .await
        .expect("login should succeed");
    shop
}

async fn add(shop: &Storefront, id: &str, quantity: u32) {
    let product = shop
        .api()
        .product(&ProductId::new(id))
        .await
        .expect("product should load");
    shop.cart()
        .add(&CartProduct::from(&product), quantity)
        .expect("cart should persist");
}

#[tokio::test]
async fn test_checkout_submits_cart_and_clears_it() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;
    add(&shop, LAMP, 2).await;
    add(&shop, DESK, 1).await;
    assert_eq!(shop.cart().snapshot().total(), Price::from_cents(14050));

    let order_id = shop
        .checkout()
        .checkout(shop.api())
        .await
        .expect("checkout should succeed");

    assert!(order_id.as_str().starts_with("ORDER-"));
    assert!(shop.cart().snapshot().is_empty());
    assert_eq!(shop.checkout().state(), CheckoutState::Completed { order_id: order_id.clone() });

    let orders = backend.orders().await;
    assert_eq!(orders.len(), 1);
    let order = orders.first().expect("order stored");
    assert_eq!(order["id"], order_id.as_str());
    assert_eq!(order["total"].as_f64(), Some(140.5));
    assert_eq!(order["lines"][0]["product"]["productId"], LAMP);
    assert_eq!(order["lines"][0]["quantity"], 2);
    assert_eq!(order["lines"][1]["product"]["productId"], DESK);

    let alerts = shop.alerts().snapshot();
    assert!(
        alerts
            .iter()
            .any(|a| a.kind == AlertKind::Success && a.message == "Created successfully")
    );
}

#[tokio::test]
async fn test_rejected_order_keeps_cart() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;
    add(&shop, CHAIR, 4).await;
    backend.fail_orders(409, Some("Insufficient stock for Chair")).await;
    let before = shop.cart().snapshot();

    let err = shop
        .checkout()
        .checkout(shop.api())
        .await
        .expect_err("order should be refused");

    let CheckoutError::SubmissionFailed { message, source } = &err else {
        panic!("expected submission failure, got {err:?}");
    };
    assert_eq!(message, "Insufficient stock for Chair");
    assert_eq!(source.status(), 409);
    assert_eq!(shop.cart().snapshot(), before);
    assert_eq!(
        shop.checkout().state(),
        CheckoutState::Failed {
            message: "Insufficient stock for Chair".to_owned()
        }
    );
    assert!(backend.orders().await.is_empty());

    let alerts = shop.alerts().snapshot();
    assert!(
        alerts
            .iter()
            .any(|a| a.kind == AlertKind::Error && a.message == "Insufficient stock for Chair")
    );
}

#[tokio::test]
async fn test_rejected_order_without_message_uses_generic_text() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;
    add(&shop, LAMP, 1).await;
    backend.fail_orders(500, None).await;

    let err = shop
        .checkout()
        .checkout(shop.api())
        .await
        .expect_err("order should be refused");

    assert_eq!(
        err.to_string(),
        "Failed to create purchase order. Please try again."
    );
    assert_eq!(shop.cart().snapshot().len(), 1);
}

#[tokio::test]
async fn test_retry_after_failure_uses_new_order_id() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;
    add(&shop, LAMP, 1).await;

    backend.fail_orders(503, Some("Try later")).await;
    let first = shop.checkout().build().expect("order should build");
    shop.checkout()
        .submit(shop.api(), &first)
        .await
        .expect_err("order should be refused");

    backend.accept_orders().await;
    let placed = shop
        .checkout()
        .checkout(shop.api())
        .await
        .expect("retry should succeed");

    assert_ne!(placed, first.id);
    assert_eq!(backend.orders().await.len(), 1);
}

#[tokio::test]
async fn test_completed_order_is_not_resent() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;
    add(&shop, LAMP, 1).await;

    let order = shop.checkout().build().expect("order should build");
    shop.checkout()
        .submit(shop.api(), &order)
        .await
        .expect("order should be accepted");
    add(&shop, LAMP, 1).await;

    let err = shop
        .checkout()
        .submit(shop.api(), &order)
        .await
        .expect_err("a completed order is not sent again");

    assert!(matches!(err, CheckoutError::NotBuilt));
    assert_eq!(backend.orders().await.len(), 1);
    assert_eq!(shop.cart().snapshot().len(), 1);
}

#[tokio::test]
async fn test_empty_cart_sends_nothing() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;
    let sent_before = backend.requests().await.len();

    let err = shop
        .checkout()
        .checkout(shop.api())
        .await
        .expect_err("empty cart");

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(shop.checkout().state(), CheckoutState::Idle);
    assert_eq!(backend.requests().await.len(), sent_before);
}

#[tokio::test]
async fn test_reconcile_applies_live_catalog() {
    let backend = backend().await;
    let shop = signed_in(&backend).await;

    // Lines captured earlier, before the catalog changed.
    let captured = |id: &str, name: &str, cents: u32, stock: u32| CartProduct {
        id: ProductId::new(id),
        name: name.to_owned(),
        price: Price::from_cents(cents),
        stock,
    };
    shop.cart().add(&captured(LAMP, "Lamp", 800, 10), 2).expect("persist");
    shop.cart().add(&captured(DESK, "Desk", 12050, 5), 5).expect("persist");
    shop.cart().add(&captured(CHAIR, "Chair", 4525, 6), 1).expect("persist");
    backend.remove_product(CHAIR).await;

    let changes = shop
        .checkout()
        .reconcile(shop.api())
        .await
        .expect("reconcile should succeed");

    assert_eq!(
        changes,
        vec![
            Discrepancy::PriceChanged {
                product_id: ProductId::new(LAMP),
                name: "Lamp".to_owned(),
                was: Price::from_cents(800),
                now: Price::from_cents(1000),
            },
            Discrepancy::StockReduced {
                product_id: ProductId::new(DESK),
                name: "Desk".to_owned(),
                requested: 5,
                available: 3,
            },
            Discrepancy::Unavailable {
                product_id: ProductId::new(CHAIR),
                name: "Chair".to_owned(),
            },
        ]
    );

    let cart = shop.cart().snapshot();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.get(&ProductId::new(DESK)).map(|i| i.quantity), Some(3));
    assert_eq!(cart.total(), Price::from_cents(2 * 1000 + 3 * 12050));

    let order = shop.checkout().build().expect("order should build");
    assert_eq!(order.total, cart.total());
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let backend = backend().await;
    let store = Arc::new(MemoryStore::new());

    let shop = backend.client_with_store(store.clone());
    add(&shop, DESK, 2).await;
    add(&shop, LAMP, 1).await;
    let before = shop.cart().snapshot();

    let restarted = backend.client_with_store(store);
    assert_eq!(restarted.cart().snapshot(), before);
}

#[tokio::test]
async fn test_add_caps_quantity_at_stock() {
    let backend = backend().await;
    let shop = backend.client();

    add(&shop, DESK, 2).await;
    add(&shop, DESK, 5).await;

    let line = shop
        .cart()
        .snapshot()
        .get(&ProductId::new(DESK))
        .cloned()
        .expect("desk line");
    assert_eq!(line.quantity, 3);
}

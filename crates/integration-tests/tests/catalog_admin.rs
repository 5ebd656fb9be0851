//! Catalog browsing and admin mutations against the mock backend.

use secrecy::SecretString;
use serde_json::json;

use ecomm_core::{
    CategoryId, OrderStatus, PageRequest, Price, ProductId, ProductQuery, SortDirection,
};
use ecomm_integration_tests::MockBackend;
use ecomm_storefront::Storefront;
use ecomm_storefront::alerts::AlertKind;
use ecomm_storefront::api::{ApiError, CategoryUpdate, NewCategory, NewProduct, ProductUpdate};
use ecomm_storefront::cart::CartProduct;

const LAMP: &str = "8d0f6c1e-3c44-4b7a-9a35-0c6f1d0d4a11";
const DESK: &str = "2b7e9f40-51d2-4c8e-8f0b-6a2f3e9c7d22";
const MUG: &str = "5c4b3a29-1817-4615-a413-121110090807";

async fn backend() -> MockBackend {
    let backend = MockBackend::start().await;
    backend.add_user("alice", "wonderland", false).await;
    backend.add_user("root", "hunter22", true).await;
    backend.add_category("furniture", "Furniture").await;
    backend.add_category("kitchen", "Kitchen").await;
    backend.add_product(LAMP, "Desk Lamp", 10.0, 10, "furniture").await;
    backend.add_product(DESK, "Standing Desk", 120.5, 3, "furniture").await;
    backend.add_product(MUG, "Mug", 4.25, 40, "kitchen").await;
    backend
}

async fn login(backend: &MockBackend, username: &str, password: &str) -> Storefront {
    let shop = backend.client();
    shop.auth()
        .login(username, SecretString::from(password.to_owned()))
        .await
        .expect("login should succeed");
    shop
}

#[tokio::test]
async fn test_product_listing_filters_and_sorts() {
    let backend = backend().await;
    let shop = backend.client();

    let query = ProductQuery {
        page: PageRequest::first(10),
        category_id: Some(CategoryId::new("furniture")),
        query: Some("desk".to_owned()),
        sort_by_price: Some(SortDirection::Desc),
    };
    let page = shop
        .api()
        .list_products(&query)
        .await
        .expect("listing should succeed");

    let names: Vec<&str> = page.content.iter().map(|p| p.product_name.as_str()).collect();
    assert_eq!(names, vec!["Standing Desk", "Desk Lamp"]);
    assert_eq!(page.total_elements, 2);
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_product_listing_pages() {
    let backend = backend().await;
    let shop = backend.client();

    let first = shop
        .api()
        .list_products(&ProductQuery::page(PageRequest::new(0, 2)))
        .await
        .expect("listing should succeed");
    let second = shop
        .api()
        .list_products(&ProductQuery::page(PageRequest::new(1, 2)))
        .await
        .expect("listing should succeed");

    assert_eq!(first.content.len(), 2);
    assert!(first.has_next());
    assert_eq!(second.content.len(), 1);
    assert_eq!(second.total_pages, 2);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let backend = backend().await;
    let shop = backend.client();

    let err = shop
        .api()
        .product(&ProductId::new("nope"))
        .await
        .expect_err("unknown product");

    assert!(err.is_not_found());
    let ApiError::Status(body) = &err else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(body.path.as_deref(), Some("/api/product/nope"));
}

#[tokio::test]
async fn test_admin_creates_product() {
    let backend = backend().await;
    let shop = login(&backend, "root", "hunter22").await;

    let product = NewProduct {
        product_id: ProductId::new("0f9e8d7c-6b5a-4948-8372-615049382716"),
        product_name: "Teapot".to_owned(),
        product_description: "Cast iron".to_owned(),
        stock: 7,
        price: Price::from_cents(3950),
        small_image_url: "https://cdn.example.com/teapot-s.jpg".to_owned(),
        big_image_url: "https://cdn.example.com/teapot.jpg".to_owned(),
        category_id: CategoryId::new("kitchen"),
    };
    shop.api()
        .create_product(&product)
        .await
        .expect("create should succeed");

    let stored = shop
        .api()
        .product(&product.product_id)
        .await
        .expect("product should load");
    assert_eq!(stored.product_name, "Teapot");
    assert_eq!(stored.price, Price::from_cents(3950));
    assert_eq!(
        stored.category.map(|c| c.id),
        Some(CategoryId::new("kitchen"))
    );
}

#[tokio::test]
async fn test_invalid_product_is_rejected_locally() {
    let backend = backend().await;
    let shop = login(&backend, "root", "hunter22").await;
    let sent_before = backend.requests().await.len();

    let product = NewProduct {
        product_id: ProductId::new("P-001"),
        product_name: String::new(),
        product_description: "Cast iron".to_owned(),
        stock: 7,
        price: Price::from_cents(3950),
        small_image_url: "https://cdn.example.com/teapot-s.jpg".to_owned(),
        big_image_url: "https://cdn.example.com/teapot.jpg".to_owned(),
        category_id: CategoryId::new("kitchen"),
    };
    let err = shop
        .api()
        .create_product(&product)
        .await
        .expect_err("invalid product");

    let errors = err.field_errors();
    assert_eq!(errors.get("productId"), Some("must be a valid UUID v4"));
    assert!(errors.get("productName").is_some());
    assert_eq!(backend.requests().await.len(), sent_before);
}

#[tokio::test]
async fn test_update_refreshes_cached_product() {
    let backend = backend().await;
    let shop = login(&backend, "root", "hunter22").await;
    let id = ProductId::new(MUG);

    let cached = shop.api().product(&id).await.expect("product should load");
    let mut update = ProductUpdate::from(&cached);
    update.price = Price::from_cents(500);
    update.stock = 12;
    shop.api()
        .update_product(&id, &update)
        .await
        .expect("update should succeed");

    let fresh = shop.api().product(&id).await.expect("product should load");
    assert_eq!(fresh.price, Price::from_cents(500));
    assert_eq!(fresh.stock, 12);

    let line = CartProduct::from(&fresh);
    assert_eq!(line.price, Price::from_cents(500));
}

#[tokio::test]
async fn test_cached_product_served_without_request() {
    let backend = backend().await;
    let shop = backend.client();
    let id = ProductId::new(LAMP);

    shop.api().product(&id).await.expect("product should load");
    backend.patch_product(LAMP, "price", json!(99.0)).await;
    let again = shop.api().product(&id).await.expect("product should load");

    assert_eq!(again.price, Price::from_cents(1000));
    let fetches = backend
        .requests()
        .await
        .iter()
        .filter(|r| r.path == format!("/api/product/{LAMP}"))
        .count();
    assert_eq!(fetches, 1);
}

#[tokio::test]
async fn test_admin_deletes_product() {
    let backend = backend().await;
    let shop = login(&backend, "root", "hunter22").await;
    let id = ProductId::new(DESK);

    shop.api().product(&id).await.expect("product should load");
    shop.api()
        .delete_product(&id)
        .await
        .expect("delete should succeed");

    assert!(backend.product(DESK).await.is_none());
    let err = shop.api().product(&id).await.expect_err("deleted product");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_customer_cannot_mutate_catalog() {
    let backend = backend().await;
    let shop = login(&backend, "alice", "wonderland").await;

    let update = CategoryUpdate {
        name: "Home".to_owned(),
        description: "Home goods".to_owned(),
    };
    let err = shop
        .api()
        .update_category(&CategoryId::new("furniture"), &update)
        .await
        .expect_err("customers may not edit categories");

    assert!(matches!(&err, ApiError::Status(body) if body.status == 403));
    // A 403 keeps the session.
    assert!(shop.session().current().is_authenticated());
    assert!(
        shop.alerts()
            .snapshot()
            .iter()
            .any(|a| a.kind == AlertKind::Error && a.message == "Access is denied")
    );
}

#[tokio::test]
async fn test_admin_manages_categories() {
    let backend = backend().await;
    let shop = login(&backend, "root", "hunter22").await;

    let category = NewCategory {
        id: CategoryId::new("garden"),
        name: "Garden".to_owned(),
        description: "Outdoor".to_owned(),
    };
    shop.api()
        .create_category(&category)
        .await
        .expect("create should succeed");
    shop.api()
        .update_category(
            &category.id,
            &CategoryUpdate {
                name: "Garden & Patio".to_owned(),
                description: "Outdoor living".to_owned(),
            },
        )
        .await
        .expect("update should succeed");

    let all = shop.api().all_categories().await.expect("list should succeed");
    let garden = all
        .iter()
        .find(|c| c.id == category.id)
        .expect("garden listed");
    assert_eq!(garden.name, "Garden & Patio");

    shop.api()
        .delete_category(&category.id)
        .await
        .expect("delete should succeed");
    let err = shop
        .api()
        .category(&category.id)
        .await
        .expect_err("deleted category");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_admin_changes_order_status() {
    let backend = backend().await;

    let customer = login(&backend, "alice", "wonderland").await;
    let lamp = customer
        .api()
        .product(&ProductId::new(LAMP))
        .await
        .expect("product should load");
    customer
        .cart()
        .add(&CartProduct::from(&lamp), 1)
        .expect("cart should persist");
    let order_id = customer
        .checkout()
        .checkout(customer.api())
        .await
        .expect("checkout should succeed");

    let admin = login(&backend, "root", "hunter22").await;
    admin
        .api()
        .update_order_status(&order_id, OrderStatus::Approved)
        .await
        .expect("status change should succeed");

    let order = admin.api().order(&order_id).await.expect("order should load");
    assert_eq!(order.status, OrderStatus::Approved);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.total, Price::from_cents(1000));

    let listed = customer
        .api()
        .list_orders(PageRequest::first(10))
        .await
        .expect("orders should list");
    assert_eq!(listed.content.len(), 1);
    assert_eq!(
        listed.content.first().map(|o| o.status),
        Some(OrderStatus::Approved)
    );
}

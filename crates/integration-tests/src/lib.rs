//! Integration tests for the ecomm client.
//!
//! The tests in `tests/` drive a real [`Storefront`] over HTTP against
//! [`MockBackend`], an in-process axum server that speaks the backend's REST
//! dialect: form login returning a bare token, Spring-style page envelopes,
//! and `{status, error, message, errors, path}` error bodies.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ecomm-integration-tests
//! ```
//!
//! No external services are needed; each test binds its own ephemeral port.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::extract::{Form, OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

use ecomm_storefront::auth::token::encode_unsigned;
use ecomm_storefront::clock::SystemClock;
use ecomm_storefront::storage::{KeyValueStore, MemoryStore};
use ecomm_storefront::{Storefront, StorefrontConfig};

/// Lifetime of tokens issued by the mock login endpoint.
const TOKEN_TTL_SECS: i64 = 3600;

/// A request seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
struct MockUser {
    username: String,
    password: String,
    email: String,
    admin: bool,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, MockUser>,
    /// Issued token -> username.
    tokens: HashMap<String, String>,
    products: BTreeMap<String, Value>,
    categories: BTreeMap<String, Value>,
    orders: Vec<Value>,
    order_failure: Option<(StatusCode, Value)>,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<BackendState>>;

/// In-process stand-in for the backend REST API, mounted under `/api`.
pub struct MockBackend {
    base_url: Url,
    state: Shared,
    server: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");

        let app = Router::new().nest("/api", routes()).with_state(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = Url::parse(&format!("http://{addr}/api")).expect("Invalid mock backend URL");
        Self {
            base_url,
            state,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Client configuration pointed at this backend.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::new(self.base_url.clone())
    }

    /// A client over a fresh in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> Storefront {
        self.client_with_store(Arc::new(MemoryStore::new()))
    }

    /// A client over `store`, to simulate restarts sharing persisted state.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client_with_store(&self, store: Arc<dyn KeyValueStore>) -> Storefront {
        Storefront::with_parts(self.config(), store, Arc::new(SystemClock))
            .expect("Failed to build storefront client")
    }

    pub async fn add_user(&self, username: &str, password: &str, admin: bool) {
        self.state.lock().await.users.insert(
            username.to_owned(),
            MockUser {
                username: username.to_owned(),
                password: password.to_owned(),
                email: format!("{username}@example.com"),
                admin,
            },
        );
    }

    pub async fn add_category(&self, id: &str, name: &str) {
        self.state.lock().await.categories.insert(
            id.to_owned(),
            json!({"id": id, "name": name, "description": format!("All {name}")}),
        );
    }

    pub async fn add_product(&self, id: &str, name: &str, price: f64, stock: u32, category_id: &str) {
        let mut state = self.state.lock().await;
        let category = state.categories.get(category_id).cloned();
        state.products.insert(
            id.to_owned(),
            json!({
                "productId": id,
                "productName": name,
                "productDescription": format!("{name} description"),
                "stock": stock,
                "price": price,
                "smallImageUrl": format!("https://cdn.example.com/{id}-s.jpg"),
                "bigImageUrl": format!("https://cdn.example.com/{id}.jpg"),
                "category": category,
            }),
        );
    }

    /// Overwrite one field of a stored product.
    pub async fn patch_product(&self, id: &str, field: &str, value: Value) {
        if let Some(product) = self.state.lock().await.products.get_mut(id) {
            product[field] = value;
        }
    }

    pub async fn remove_product(&self, id: &str) {
        self.state.lock().await.products.remove(id);
    }

    /// The stored product, if present.
    pub async fn product(&self, id: &str) -> Option<Value> {
        self.state.lock().await.products.get(id).cloned()
    }

    /// Reject order submissions with `status`, with an optional message body.
    pub async fn fail_orders(&self, status: u16, message: Option<&str>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = message.map_or_else(
            || json!({"status": status.as_u16()}),
            |m| error_body(status, m, "/api/purchase-order"),
        );
        self.state.lock().await.order_failure = Some((status, body));
    }

    pub async fn accept_orders(&self) {
        self.state.lock().await.order_failure = None;
    }

    /// Forget every issued token so authenticated requests get 401.
    pub async fn revoke_tokens(&self) {
        self.state.lock().await.tokens.clear();
    }

    /// Orders accepted so far, as stored.
    pub async fn orders(&self) -> Vec<Value> {
        self.state.lock().await.orders.clone()
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }
}

fn routes() -> Router<Shared> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/product", post(create_product))
        .route("/product/page", get(list_products))
        .route(
            "/product/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/category", post(create_category))
        .route("/category/page", get(list_categories))
        .route(
            "/category/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/purchase-order", post(create_order))
        .route("/purchase-order/page", get(list_orders))
        .route("/purchase-order/{id}", get(get_order).patch(update_order))
}

// =============================================================================
// Helpers
// =============================================================================

fn error_body(status: StatusCode, message: &str, path: &str) -> Value {
    json!({
        "status": status.as_u16(),
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": message,
        "path": path,
    })
}

fn error(status: StatusCode, message: &str, uri: &Uri) -> Response {
    (status, Json(error_body(status, message, uri.path()))).into_response()
}

fn page_of(items: Vec<Value>, params: &HashMap<String, String>) -> Value {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size: usize = params
        .get("size")
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .unwrap_or(10);
    let total = items.len();
    let content: Vec<Value> = items.into_iter().skip(page * size).take(size).collect();
    json!({
        "content": content,
        "totalElements": total,
        "totalPages": total.div_ceil(size),
        "number": page,
    })
}

/// Record the request and resolve the caller from its bearer token.
///
/// `uri` must be the original request URI so recorded paths keep the `/api`
/// prefix the router is nested under.
async fn caller(state: &Shared, method: &Method, uri: &Uri, headers: &HeaderMap) -> Option<MockUser> {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut state = state.lock().await;
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_owned(),
        authorization: authorization.clone(),
    });

    authorization
        .as_deref()
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.tokens.get(token))
        .and_then(|username| state.users.get(username))
        .cloned()
}

/// Like [`caller`], answering 401 when there is no valid token.
async fn require_user(
    state: &Shared,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<MockUser, Response> {
    caller(state, method, uri, headers)
        .await
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Full authentication is required", uri))
}

async fn require_admin(
    state: &Shared,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<MockUser, Response> {
    let user = require_user(state, method, uri, headers).await?;
    if user.admin {
        Ok(user)
    } else {
        Err(error(StatusCode::FORBIDDEN, "Access is denied", uri))
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    caller(&state, &method, &uri, &headers).await;

    let mut state = state.lock().await;
    let Some(user) = state
        .users
        .get(&form.username)
        .filter(|u| u.password == form.password)
        .cloned()
    else {
        return error(StatusCode::UNAUTHORIZED, "Bad credentials", &uri);
    };

    let roles = if user.admin {
        json!(["ADMIN", "USER"])
    } else {
        json!(["USER"])
    };
    let token = encode_unsigned(&json!({
        "sub": form.username,
        "email": user.email,
        "roles": roles,
        "exp": chrono::Utc::now().timestamp() + TOKEN_TTL_SECS,
    }));
    state.tokens.insert(token.clone(), form.username);
    token.into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupBody {
    username: String,
    password: String,
    email: String,
}

async fn signup(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<SignupBody>,
) -> Response {
    caller(&state, &method, &uri, &headers).await;

    let mut state = state.lock().await;
    if state.users.contains_key(&body.username) {
        let mut response = error_body(StatusCode::BAD_REQUEST, "Validation failed", uri.path());
        response["errors"] = json!([{"field": "username", "defaultMessage": "already taken"}]);
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }
    state.users.insert(
        body.username.clone(),
        MockUser {
            username: body.username,
            password: body.password,
            email: body.email,
            admin: false,
        },
    );
    StatusCode::CREATED.into_response()
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    caller(&state, &method, &uri, &headers).await;

    let category = params.get("pageRequest.categoryId");
    let text = params
        .get("pageRequest.queryString")
        .map(|q| q.to_lowercase());

    let state = state.lock().await;
    let mut items: Vec<Value> = state
        .products
        .values()
        .filter(|p| category.is_none_or(|c| p["category"]["id"].as_str() == Some(c.as_str())))
        .filter(|p| {
            text.as_ref().is_none_or(|t| {
                p["productName"]
                    .as_str()
                    .is_some_and(|n| n.to_lowercase().contains(t))
            })
        })
        .cloned()
        .collect();

    let price = |p: &Value| p["price"].as_f64().unwrap_or_default();
    match params.get("pageRequest.sortByPrice").map(String::as_str) {
        Some("ASC") => items.sort_by(|a, b| price(a).total_cmp(&price(b))),
        Some("DESC") => items.sort_by(|a, b| price(b).total_cmp(&price(a))),
        _ => {}
    }

    Json(page_of(items, &params)).into_response()
}

async fn get_product(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    caller(&state, &method, &uri, &headers).await;

    match state.lock().await.products.get(&id) {
        Some(product) => Json(product.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, &format!("Product {id} not found"), &uri),
    }
}

async fn create_product(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    let mut state = state.lock().await;
    let Some(id) = body["productId"].as_str().map(str::to_owned) else {
        return error(StatusCode::BAD_REQUEST, "productId is required", &uri);
    };
    if state.products.contains_key(&id) {
        return error(StatusCode::CONFLICT, &format!("Product {id} already exists"), &uri);
    }
    let category = body["categoryId"]
        .as_str()
        .and_then(|c| state.categories.get(c))
        .cloned();
    body["category"] = category.unwrap_or(Value::Null);
    state.products.insert(id, body);
    StatusCode::CREATED.into_response()
}

async fn update_product(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    let mut state = state.lock().await;
    let category = body["categoryId"]
        .as_str()
        .and_then(|c| state.categories.get(c))
        .cloned();
    let Some(product) = state.products.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, &format!("Product {id} not found"), &uri);
    };
    if let (Some(product), Some(fields)) = (product.as_object_mut(), body.as_object()) {
        for (key, value) in fields {
            product.insert(key.clone(), value.clone());
        }
        product.insert("category".to_owned(), category.unwrap_or(Value::Null));
    }
    StatusCode::OK.into_response()
}

async fn delete_product(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    match state.lock().await.products.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, &format!("Product {id} not found"), &uri),
    }
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    caller(&state, &method, &uri, &headers).await;
    let items = state.lock().await.categories.values().cloned().collect();
    Json(page_of(items, &params)).into_response()
}

async fn get_category(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    caller(&state, &method, &uri, &headers).await;

    match state.lock().await.categories.get(&id) {
        Some(category) => Json(category.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, &format!("Category {id} not found"), &uri),
    }
}

async fn create_category(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    let Some(id) = body["id"].as_str().map(str::to_owned) else {
        return error(StatusCode::BAD_REQUEST, "id is required", &uri);
    };
    state.lock().await.categories.insert(id, body);
    StatusCode::CREATED.into_response()
}

async fn update_category(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    let mut state = state.lock().await;
    let Some(category) = state.categories.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, &format!("Category {id} not found"), &uri);
    };
    category["name"] = body["name"].clone();
    category["description"] = body["description"].clone();
    StatusCode::OK.into_response()
}

async fn delete_category(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    match state.lock().await.categories.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, &format!("Category {id} not found"), &uri),
    }
}

// =============================================================================
// Purchase orders
// =============================================================================

async fn create_order(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user = match require_user(&state, &method, &uri, &headers).await {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };

    let mut state = state.lock().await;
    if let Some((status, failure)) = &state.order_failure {
        return (*status, Json(failure.clone())).into_response();
    }

    let lines: Vec<Value> = body["lines"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|line| {
            let product = line["idProduct"]
                .as_str()
                .and_then(|id| state.products.get(id))
                .cloned()
                .unwrap_or(Value::Null);
            json!({"quantity": line["quantity"], "product": product})
        })
        .collect();

    let order = json!({
        "id": body["id"],
        "lines": lines,
        "total": body["total"],
        "status": "PENDING",
        "createdAt": chrono::Utc::now().to_rfc3339(),
        "user": {"username": user.username, "email": user.email},
    });
    state.orders.push(order);
    StatusCode::CREATED.into_response()
}

async fn list_orders(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let user = match require_user(&state, &method, &uri, &headers).await {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };

    let state = state.lock().await;
    let items = state
        .orders
        .iter()
        .filter(|o| user.admin || o["user"]["username"].as_str() == Some(user.username.as_str()))
        .map(|o| {
            json!({
                "id": o["id"],
                "total": o["total"],
                "status": o["status"],
                "createdAt": o["createdAt"],
                "username": o["user"]["username"],
                "email": o["user"]["email"],
            })
        })
        .collect();
    Json(page_of(items, &params)).into_response()
}

async fn get_order(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(rejection) = require_user(&state, &method, &uri, &headers).await {
        return rejection;
    }

    let state = state.lock().await;
    match state.orders.iter().find(|o| o["id"].as_str() == Some(id.as_str())) {
        Some(order) => Json(order.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, &format!("Order {id} not found"), &uri),
    }
}

async fn update_order(
    State(state): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = require_admin(&state, &method, &uri, &headers).await {
        return rejection;
    }

    let mut state = state.lock().await;
    let Some(order) = state
        .orders
        .iter_mut()
        .find(|o| o["id"].as_str() == Some(id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, &format!("Order {id} not found"), &uri);
    };
    order["status"] = body["status"].clone();
    StatusCode::OK.into_response()
}

//! Request and response bodies exchanged with the backend.
//!
//! Field names follow the backend's camelCase JSON.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use ecomm_core::{CategoryId, OrderStatus, Price, ProductId, PurchaseOrderId, ValidationErrors};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

// =============================================================================
// Auth
// =============================================================================

/// Form body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// Body of a successful login.
///
/// The backend answers with the bare token as text; some deployments wrap it
/// as `{"token": "..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Wrapped { token: String },
    Raw(String),
}

impl LoginResponse {
    /// Interpret a response body.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self::Raw(body.trim().to_owned()))
    }

    /// The token string.
    #[must_use]
    pub fn into_token(self) -> String {
        match self {
            Self::Wrapped { token } | Self::Raw(token) => token,
        }
    }
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl RegisterUser {
    /// Client-side checks run before the request is sent.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .require("username", &self.username)
            .require("password", self.password.expose_secret())
            .require_email("email", &self.email)
            .require("firstName", &self.first_name)
            .require("lastName", &self.last_name);
        errors.into_result()
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /category`. The id is chosen by the client.
#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

impl NewCategory {
    /// # Errors
    ///
    /// Returns every blank field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors
            .require("id", self.id.as_str())
            .require("name", &self.name)
            .require("description", &self.description);
        errors.into_result()
    }
}

/// Body of `PUT /category/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryUpdate {
    pub name: String,
    pub description: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_description: String,
    pub stock: u32,
    pub price: Price,
    #[serde(default)]
    pub small_image_url: String,
    #[serde(default)]
    pub big_image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryDto>,
}

/// Body of `POST /product`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_description: String,
    pub stock: u32,
    pub price: Price,
    pub small_image_url: String,
    pub big_image_url: String,
    pub category_id: CategoryId,
}

impl NewProduct {
    /// Product ids must be version 4 UUIDs; every other text field is
    /// required.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match uuid::Uuid::parse_str(self.product_id.as_str()) {
            Ok(id) if id.get_version_num() == 4 => {}
            _ => errors.push("productId", "must be a valid UUID v4"),
        }
        errors
            .require("productName", &self.product_name)
            .require("productDescription", &self.product_description)
            .require("smallImageUrl", &self.small_image_url)
            .require("bigImageUrl", &self.big_image_url)
            .require("categoryId", self.category_id.as_str());
        errors.into_result()
    }
}

/// Body of `PUT /product/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub product_name: String,
    pub product_description: String,
    pub stock: u32,
    pub price: Price,
    pub small_image_url: String,
    pub big_image_url: String,
    pub category_id: CategoryId,
}

impl From<&ProductDto> for ProductUpdate {
    fn from(product: &ProductDto) -> Self {
        Self {
            product_name: product.product_name.clone(),
            product_description: product.product_description.clone(),
            stock: product.stock,
            price: product.price,
            small_image_url: product.small_image_url.clone(),
            big_image_url: product.big_image_url.clone(),
            category_id: product
                .category
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_else(|| CategoryId::new("")),
        }
    }
}

// =============================================================================
// Purchase orders
// =============================================================================

/// Customer details attached to an order by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineDto {
    pub quantity: u32,
    pub product: ProductDto,
}

/// Full order as returned by `GET /purchase-order/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDto {
    pub id: PurchaseOrderId,
    pub lines: Vec<PurchaseOrderLineDto>,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<OrderCustomer>,
}

/// Row of `GET /purchase-order/page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderSummary {
    pub id: PurchaseOrderId,
    #[serde(default)]
    pub id_user: String,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Body of `PATCH /purchase-order/{id}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

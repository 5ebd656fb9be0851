//! ecomm storefront client library.
//!
//! The client-side half of the ecomm shop: who is signed in, what is in the
//! cart, and how the cart becomes a purchase order.
//!
//! # Architecture
//!
//! - [`auth`] decodes bearer tokens, owns the persisted session and answers
//!   guard questions. Client-side checks only decide what to show; the
//!   backend enforces access.
//! - [`cart`] is the persisted cart ledger.
//! - [`checkout`] assembles and submits orders and reconciles the cart with
//!   live product data.
//! - [`api`] is the typed HTTP client for the backend.
//! - [`alerts`] keeps toast notifications for API outcomes.
//! - [`storage`] persists state as key-value strings.
//!
//! Stores publish snapshots on `tokio::sync::watch` channels; views subscribe
//! instead of polling. [`Storefront`] wires everything together.
//!
//! # Example
//!
//! ```rust,ignore
//! use ecomm_storefront::{Storefront, StorefrontConfig};
//!
//! let shop = Storefront::open(StorefrontConfig::from_env()?)?;
//! shop.auth().login("alice", password).await?;
//!
//! let product = shop.api().product(&id).await?;
//! shop.cart().add(&(&product).into(), 1)?;
//!
//! let order_id = shop.checkout().checkout(shop.api()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod alerts;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::{Result, StorefrontError};
pub use state::Storefront;

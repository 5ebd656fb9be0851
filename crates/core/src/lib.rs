//! Ecomm Core - Shared domain types.
//!
//! This crate provides the types used across the ecomm client workspace:
//! - `storefront` - Session, cart, checkout and backend API client library
//! - `cli` - Command-line front end for shoppers and admins
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no
//! persistence, no HTTP clients. This keeps it lightweight and usable from
//! any layer.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, order statuses and paging
//! - [`validation`] - Field-level validation errors shared with the backend's error shape

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{FieldError, ValidationErrors};

//! Core types for the ecomm client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod page;
pub mod price;
pub mod status;

pub use id::*;
pub use page::{Page, PageRequest, ProductQuery};
pub use price::{Price, PriceError};
pub use status::*;

//! Catalog and order administration.
//!
//! Every command requires an admin session. The backend enforces the same
//! rule; the local check only saves a round trip.
//!
//! # Usage
//!
//! ```bash
//! ecomm admin products create --name Lamp --description "Desk lamp" \
//!     --price 19.99 --stock 4 --category lighting \
//!     --small-image https://cdn/lamp-s.jpg --big-image https://cdn/lamp.jpg
//! ecomm admin products update 3f1c9a52-... --price 17.50
//! ecomm admin orders status ORDER-1700000000000 delivered
//! ```

use clap::Subcommand;
use rust_decimal::Decimal;

use ecomm_core::{CategoryId, OrderStatus, PageRequest, Price, ProductId, PurchaseOrderId};
use ecomm_storefront::Storefront;
use ecomm_storefront::api::{CategoryUpdate, NewCategory, NewProduct, ProductUpdate};
use ecomm_storefront::auth::Access;

use super::orders::{print_order, print_summaries};
use super::require;
use crate::error::CliError;

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Manage products
    Products {
        #[command(subcommand)]
        action: AdminProductCommand,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: AdminCategoryCommand,
    },
    /// Review all orders and change their status
    Orders {
        #[command(subcommand)]
        action: AdminOrderCommand,
    },
}

#[derive(Subcommand)]
pub enum AdminProductCommand {
    /// Create a product
    Create {
        /// Product id (a new UUID v4 when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        stock: u32,
        #[arg(long)]
        category: String,
        #[arg(long)]
        small_image: String,
        #[arg(long)]
        big_image: String,
    },
    /// Change fields of an existing product
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        stock: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        small_image: Option<String>,
        #[arg(long)]
        big_image: Option<String>,
    },
    /// Delete a product
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum AdminCategoryCommand {
    /// Create a category
    Create {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
    },
    /// Rename or redescribe a category
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a category
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum AdminOrderCommand {
    /// List every customer's orders
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Show one order
    Show { id: String },
    /// Request a status change (pending, approved, rejected, cancelled, delivered)
    Status { id: String, status: OrderStatus },
}

pub async fn run(shop: &Storefront, command: AdminCommand) -> Result<(), CliError> {
    require(shop, Access::Admin)?;
    match command {
        AdminCommand::Products { action } => products(shop, action).await,
        AdminCommand::Categories { action } => categories(shop, action).await,
        AdminCommand::Orders { action } => orders(shop, action).await,
    }
}

fn price(amount: Decimal) -> Result<Price, CliError> {
    Price::new(amount).map_err(|e| CliError::Input(e.to_string()))
}

#[allow(clippy::print_stdout)]
async fn products(shop: &Storefront, command: AdminProductCommand) -> Result<(), CliError> {
    let api = shop.api();
    match command {
        AdminProductCommand::Create {
            id,
            name,
            description,
            price: amount,
            stock,
            category,
            small_image,
            big_image,
        } => {
            let product = NewProduct {
                product_id: ProductId::new(id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string())),
                product_name: name,
                product_description: description,
                stock,
                price: price(amount)?,
                small_image_url: small_image,
                big_image_url: big_image,
                category_id: CategoryId::new(category),
            };
            api.create_product(&product).await?;
            println!("Created product {}", product.product_id);
        }
        AdminProductCommand::Update {
            id,
            name,
            description,
            price: amount,
            stock,
            category,
            small_image,
            big_image,
        } => {
            let id = ProductId::new(id);
            let mut update = ProductUpdate::from(&api.product(&id).await?);
            if let Some(name) = name {
                update.product_name = name;
            }
            if let Some(description) = description {
                update.product_description = description;
            }
            if let Some(amount) = amount {
                update.price = price(amount)?;
            }
            if let Some(stock) = stock {
                update.stock = stock;
            }
            if let Some(category) = category {
                update.category_id = CategoryId::new(category);
            }
            if let Some(url) = small_image {
                update.small_image_url = url;
            }
            if let Some(url) = big_image {
                update.big_image_url = url;
            }
            api.update_product(&id, &update).await?;
            println!("Updated product {id}");
        }
        AdminProductCommand::Delete { id } => {
            let id = ProductId::new(id);
            api.delete_product(&id).await?;
            println!("Deleted product {id}");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn categories(shop: &Storefront, command: AdminCategoryCommand) -> Result<(), CliError> {
    let api = shop.api();
    match command {
        AdminCategoryCommand::Create {
            id,
            name,
            description,
        } => {
            let category = NewCategory {
                id: CategoryId::new(id),
                name,
                description,
            };
            api.create_category(&category).await?;
            println!("Created category {}", category.id);
        }
        AdminCategoryCommand::Update {
            id,
            name,
            description,
        } => {
            let id = CategoryId::new(id);
            let current = api.category(&id).await?;
            let update = CategoryUpdate {
                name: name.unwrap_or(current.name),
                description: description.unwrap_or(current.description),
            };
            api.update_category(&id, &update).await?;
            println!("Updated category {id}");
        }
        AdminCategoryCommand::Delete { id } => {
            let id = CategoryId::new(id);
            api.delete_category(&id).await?;
            println!("Deleted category {id}");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn orders(shop: &Storefront, command: AdminOrderCommand) -> Result<(), CliError> {
    let api = shop.api();
    match command {
        AdminOrderCommand::List { page, size } => {
            let request = PageRequest::new(page, size.unwrap_or(shop.config().page_size));
            print_summaries(&api.list_orders(request).await?);
        }
        AdminOrderCommand::Show { id } => {
            print_order(&api.order(&PurchaseOrderId::new(id)).await?);
        }
        AdminOrderCommand::Status { id, status } => {
            let id = PurchaseOrderId::new(id);
            api.update_order_status(&id, status).await?;
            println!("Order {id} is now {status}");
        }
    }
    Ok(())
}

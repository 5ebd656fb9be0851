//! Purchase order history.

use clap::Subcommand;

use ecomm_core::{Page, PageRequest, PurchaseOrderId};
use ecomm_storefront::Storefront;
use ecomm_storefront::api::{PurchaseOrderDto, PurchaseOrderSummary};
use ecomm_storefront::auth::Access;

use super::require;
use crate::error::CliError;

#[derive(Subcommand)]
pub enum OrderCommand {
    /// List orders, newest page first
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Show one order with its lines
    Show { id: String },
}

pub async fn run(shop: &Storefront, command: OrderCommand) -> Result<(), CliError> {
    require(shop, Access::Authenticated)?;
    match command {
        OrderCommand::List { page, size } => {
            let request = PageRequest::new(page, size.unwrap_or(shop.config().page_size));
            print_summaries(&shop.api().list_orders(request).await?);
        }
        OrderCommand::Show { id } => {
            print_order(&shop.api().order(&PurchaseOrderId::new(id)).await?);
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) fn print_summaries(orders: &Page<PurchaseOrderSummary>) {
    for order in &orders.content {
        let placed = order
            .created_at
            .map_or_else(String::new, |t| t.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{:<24} {:<10} {:>10}  {:<16} {}",
            order.id, order.status, order.total, placed, order.username
        );
    }
    println!(
        "Page {} of {} ({} orders)",
        orders.number + 1,
        orders.total_pages.max(1),
        orders.total_elements
    );
}

#[allow(clippy::print_stdout)]
pub(super) fn print_order(order: &PurchaseOrderDto) {
    println!("Order {} ({})", order.id, order.status);
    if let Some(placed) = order.created_at {
        println!("Placed:   {placed}");
    }
    if let Some(user) = &order.user {
        println!("Customer: {} <{}>", user.username, user.email);
    }
    for line in &order.lines {
        println!(
            "  {:>4} x {:<32} {:>10}",
            line.quantity, line.product.product_name, line.product.price
        );
    }
    println!("Total:    {}", order.total);
}

//! Cart editing and checkout.

use clap::Subcommand;

use ecomm_core::ProductId;
use ecomm_storefront::Storefront;
use ecomm_storefront::auth::Access;
use ecomm_storefront::cart::{Cart, CartProduct};

use super::require;
use crate::error::CliError;

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show cart lines and total
    Show,
    /// Add a product (quantities are capped at available stock)
    Add {
        product_id: String,
        #[arg(long, short, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Set {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { product_id: String },
    /// Empty the cart
    Clear,
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for item in cart.items() {
        println!(
            "{}  {:<32} {:>4} x {:>10} = {:>10}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.product.price,
            item.line_total()
        );
    }
    println!("{} items, total {}", cart.item_count(), cart.total());
}

pub async fn run(shop: &Storefront, command: CartCommand) -> Result<(), CliError> {
    let cart = shop.cart();
    match command {
        CartCommand::Show => {}
        CartCommand::Add {
            product_id,
            quantity,
        } => {
            let product = shop.api().product(&ProductId::new(product_id)).await?;
            if product.stock == 0 {
                return Err(CliError::Input(format!(
                    "{} is out of stock",
                    product.product_name
                )));
            }
            cart.add(&CartProduct::from(&product), quantity)?;
        }
        CartCommand::Set {
            product_id,
            quantity,
        } => cart.set_quantity(&ProductId::new(product_id), quantity)?,
        CartCommand::Remove { product_id } => cart.remove(&ProductId::new(product_id))?,
        CartCommand::Clear => cart.clear()?,
    }
    print_cart(&cart.snapshot());
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn checkout(shop: &Storefront, reconcile: bool) -> Result<(), CliError> {
    require(shop, Access::Authenticated)?;

    if reconcile {
        let changes = shop.checkout().reconcile(shop.api()).await?;
        for change in &changes {
            println!("{change}");
        }
        if !changes.is_empty() {
            print_cart(&shop.cart().snapshot());
            return Err(CliError::Input(
                "cart changed; review it and run checkout again".to_owned(),
            ));
        }
    }

    let order_id = shop.checkout().checkout(shop.api()).await?;
    println!("Order {order_id} placed");
    Ok(())
}

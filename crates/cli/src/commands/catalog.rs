//! Product and category browsing.

use clap::Subcommand;

use ecomm_core::{CategoryId, PageRequest, ProductId, ProductQuery, SortDirection};
use ecomm_storefront::Storefront;

use crate::error::CliError;

#[derive(Subcommand)]
pub enum ProductCommand {
    /// List one page of products
    List {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Products per page (defaults to ECOMM_PAGE_SIZE)
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        /// Free-text search
        #[arg(long)]
        search: Option<String>,
        /// Sort by price: asc or desc
        #[arg(long)]
        sort: Option<SortDirection>,
    },
    /// Show one product
    Show { id: String },
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// List every category
    List,
}

#[allow(clippy::print_stdout)]
pub async fn products(shop: &Storefront, command: ProductCommand) -> Result<(), CliError> {
    match command {
        ProductCommand::List {
            page,
            size,
            category,
            search,
            sort,
        } => {
            let query = ProductQuery {
                page: PageRequest::new(page, size.unwrap_or(shop.config().page_size)),
                category_id: category.map(CategoryId::new),
                query: search,
                sort_by_price: sort,
            };
            let result = shop.api().list_products(&query).await?;
            for product in &result.content {
                println!(
                    "{}  {:<32} {:>10}  stock {}",
                    product.product_id, product.product_name, product.price, product.stock
                );
            }
            println!(
                "Page {} of {} ({} products)",
                result.number + 1,
                result.total_pages.max(1),
                result.total_elements
            );
        }
        ProductCommand::Show { id } => {
            let product = shop.api().product(&ProductId::new(id)).await?;
            println!("{}", product.product_name);
            println!("Id:       {}", product.product_id);
            println!("Price:    {}", product.price);
            println!("Stock:    {}", product.stock);
            if let Some(category) = &product.category {
                println!("Category: {} ({})", category.name, category.id);
            }
            if !product.product_description.is_empty() {
                println!();
                println!("{}", product.product_description);
            }
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(shop: &Storefront, command: CategoryCommand) -> Result<(), CliError> {
    match command {
        CategoryCommand::List => {
            for category in shop.api().all_categories().await? {
                println!("{:<20} {}", category.id, category.name);
            }
        }
    }
    Ok(())
}

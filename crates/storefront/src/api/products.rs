//! Product endpoints.

use reqwest::Method;
use tracing::{debug, instrument};

use ecomm_core::{Page, ProductId, ProductQuery};

use super::{ApiClient, ApiError, NewProduct, ProductDto, ProductUpdate};
use crate::cart::CartProduct;
use crate::checkout::ProductCatalog;

impl ApiClient {
    /// One page of the product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(page = query.page.page))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<ProductDto>, ApiError> {
        let mut params = vec![
            ("page", query.page.page.to_string()),
            ("size", query.page.size.to_string()),
        ];
        if let Some(category) = &query.category_id {
            params.push(("pageRequest.categoryId", category.to_string()));
        }
        if let Some(text) = query.query.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(("pageRequest.queryString", text.to_owned()));
        }
        if let Some(direction) = query.sort_by_price {
            params.push(("pageRequest.sortByPrice", direction.as_str().to_owned()));
        }

        self.get_json(&["product", "page"], &params).await
    }

    /// A single product, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; a missing product is reported
    /// as a 404 [`ApiError::Status`].
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<ProductDto, ApiError> {
        if let Some(product) = self.inner.products.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: ProductDto = self.get_json(&["product", id.as_str()], &[]).await?;
        self.inner
            .products
            .insert(id.clone(), product.clone())
            .await;
        Ok(product)
    }

    /// Create a product after client-side validation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] without sending when validation fails.
    #[instrument(skip(self, product), fields(product_id = %product.product_id))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<(), ApiError> {
        product.validate()?;
        self.send_json(Method::POST, &["product"], product).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(&self, id: &ProductId, update: &ProductUpdate) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &["product", id.as_str()], update)
            .await?;
        self.inner.products.invalidate(id).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        self.delete(&["product", id.as_str()]).await?;
        self.inner.products.invalidate(id).await;
        Ok(())
    }
}

impl From<&ProductDto> for CartProduct {
    fn from(product: &ProductDto) -> Self {
        Self {
            id: product.product_id.clone(),
            name: product.product_name.clone(),
            price: product.price,
            stock: product.stock,
        }
    }
}

impl ProductCatalog for ApiClient {
    async fn current_product(&self, id: &ProductId) -> Result<Option<CartProduct>, ApiError> {
        match self.product(id).await {
            Ok(product) => Ok(Some(CartProduct::from(&product))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

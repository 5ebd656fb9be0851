//! Category endpoints.

use reqwest::Method;
use tracing::instrument;

use ecomm_core::{CategoryId, Page, PageRequest};

use super::{ApiClient, ApiError, CategoryDto, CategoryUpdate, NewCategory};

/// Page size used to fetch every category in one request.
const ALL_CATEGORIES_PAGE_SIZE: u32 = 1000;

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self, page: PageRequest) -> Result<Page<CategoryDto>, ApiError> {
        self.get_json(
            &["category", "page"],
            &[("page", page.page.to_string()), ("size", page.size.to_string())],
        )
        .await
    }

    /// Every category, for filters and product forms.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn all_categories(&self) -> Result<Vec<CategoryDto>, ApiError> {
        let page = self
            .list_categories(PageRequest::first(ALL_CATEGORIES_PAGE_SIZE))
            .await?;
        Ok(page.content)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category(&self, id: &CategoryId) -> Result<CategoryDto, ApiError> {
        self.get_json(&["category", id.as_str()], &[]).await
    }

    /// Create a category after client-side validation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] without sending when validation fails.
    #[instrument(skip(self, category), fields(category_id = %category.id))]
    pub async fn create_category(&self, category: &NewCategory) -> Result<(), ApiError> {
        category.validate()?;
        self.send_json(Method::POST, &["category"], category).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: &CategoryId,
        update: &CategoryUpdate,
    ) -> Result<(), ApiError> {
        self.send_json(Method::PUT, &["category", id.as_str()], update)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), ApiError> {
        self.delete(&["category", id.as_str()]).await
    }
}

//! Repository traits describing the host catalog, orders and store options.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{
    AttributeTaxonomy, AttributeTerm, InStockVariation, OrderLineItem, ProductRecord,
};
use crate::domain::types::{OrderId, ProductId, TermId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Selects variations that keep a parent visible under one attribute term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InStockVariationQuery {
    pub parent_ids: Vec<ProductId>,
    /// Attribute key the variation assignment is stored under, e.g. `pa_size`.
    pub attribute: String,
    /// Matched against the assignment by slug or display name.
    pub term: AttributeTerm,
    /// Variations need stock strictly above this amount.
    pub stock_threshold: i64,
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRecord>, RepoError>;

    /// Parent product of a variation, or `None` when `id` is not a variation.
    async fn parent_of(&self, id: ProductId) -> Result<Option<ProductId>, RepoError>;

    async fn find_term(
        &self,
        id: TermId,
        taxonomy: &str,
    ) -> Result<Option<AttributeTerm>, RepoError>;

    /// Terms of `taxonomy` assigned to `product`.
    async fn product_terms(
        &self,
        product: ProductId,
        taxonomy: &str,
    ) -> Result<Vec<AttributeTerm>, RepoError>;

    async fn list_in_stock_variations(
        &self,
        query: &InStockVariationQuery,
        page: PageRequest,
    ) -> Result<Vec<InStockVariation>, RepoError>;

    async fn list_attribute_taxonomies(&self) -> Result<Vec<AttributeTaxonomy>, RepoError>;

    async fn list_taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<AttributeTerm>, RepoError>;
}

#[async_trait]
pub trait OrdersRepo: Send + Sync {
    async fn list_order_items(&self, order: OrderId) -> Result<Vec<OrderLineItem>, RepoError>;
}

#[async_trait]
pub trait StoreSettingsRepo: Send + Sync {
    /// Stock amount at or below which a variation counts as out of stock.
    async fn stock_threshold(&self) -> Result<i64, RepoError>;

    /// Whether the commerce extension this module plugs into is active.
    async fn is_commerce_active(&self) -> Result<bool, RepoError>;
}

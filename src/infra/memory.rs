//! In-process catalog used by tests and local runs without a database.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    CatalogRepo, InStockVariationQuery, OrdersRepo, RepoError, StoreSettingsRepo,
};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{
    AttributeTaxonomy, AttributeTerm, InStockVariation, OrderLineItem, ProductRecord,
    VariationRecord,
};
use crate::domain::types::{OrderId, ProductId, TermId};

const SOURCE: &str = "infra::memory::InMemoryCatalog";

struct CatalogState {
    products: BTreeMap<ProductId, ProductRecord>,
    variations: BTreeMap<ProductId, VariationRecord>,
    terms: BTreeMap<TermId, AttributeTerm>,
    assignments: BTreeMap<ProductId, Vec<TermId>>,
    taxonomies: Vec<AttributeTaxonomy>,
    orders: BTreeMap<OrderId, Vec<OrderLineItem>>,
    stock_threshold: i64,
    commerce_active: bool,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            products: BTreeMap::new(),
            variations: BTreeMap::new(),
            terms: BTreeMap::new(),
            assignments: BTreeMap::new(),
            taxonomies: Vec::new(),
            orders: BTreeMap::new(),
            stock_threshold: 0,
            commerce_active: true,
        }
    }
}

/// Catalog, orders and store options held in memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
    variation_queries: AtomicUsize,
    fail_variation_queries: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: ProductRecord) {
        rw_write(&self.state, SOURCE, "insert_product")
            .products
            .insert(product.id, product);
    }

    pub fn insert_variation(&self, variation: VariationRecord) {
        rw_write(&self.state, SOURCE, "insert_variation")
            .variations
            .insert(variation.id, variation);
    }

    pub fn insert_term(&self, term: AttributeTerm) {
        rw_write(&self.state, SOURCE, "insert_term")
            .terms
            .insert(term.id, term);
    }

    pub fn insert_taxonomy(&self, taxonomy: AttributeTaxonomy) {
        rw_write(&self.state, SOURCE, "insert_taxonomy")
            .taxonomies
            .push(taxonomy);
    }

    /// Assign terms to a product, adding to any existing assignment.
    pub fn assign_terms(&self, product: ProductId, terms: &[TermId]) {
        let mut state = rw_write(&self.state, SOURCE, "assign_terms");
        let assigned = state.assignments.entry(product).or_default();
        for term in terms {
            if !assigned.contains(term) {
                assigned.push(*term);
            }
        }
    }

    pub fn insert_order(&self, order: OrderId, items: Vec<OrderLineItem>) {
        rw_write(&self.state, SOURCE, "insert_order")
            .orders
            .insert(order, items);
    }

    /// Update a variation's stock. Returns false when the variation is unknown.
    pub fn set_stock(&self, variation: ProductId, quantity: Option<i64>) -> bool {
        match rw_write(&self.state, SOURCE, "set_stock")
            .variations
            .get_mut(&variation)
        {
            Some(record) => {
                record.stock_quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn set_stock_threshold(&self, threshold: i64) {
        rw_write(&self.state, SOURCE, "set_stock_threshold").stock_threshold = threshold;
    }

    pub fn set_commerce_active(&self, active: bool) {
        rw_write(&self.state, SOURCE, "set_commerce_active").commerce_active = active;
    }

    /// Make every in-stock variation query fail with a timeout.
    pub fn fail_variation_queries(&self, fail: bool) {
        self.fail_variation_queries.store(fail, Ordering::Release);
    }

    /// Number of variation pages fetched so far.
    pub fn variation_queries(&self) -> usize {
        self.variation_queries.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CatalogRepo for InMemoryCatalog {
    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRecord>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "find_product")
            .products
            .get(&id)
            .cloned())
    }

    async fn parent_of(&self, id: ProductId) -> Result<Option<ProductId>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "parent_of")
            .variations
            .get(&id)
            .map(|variation| variation.parent_id))
    }

    async fn find_term(
        &self,
        id: TermId,
        taxonomy: &str,
    ) -> Result<Option<AttributeTerm>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "find_term")
            .terms
            .get(&id)
            .filter(|term| term.taxonomy == taxonomy)
            .cloned())
    }

    async fn product_terms(
        &self,
        product: ProductId,
        taxonomy: &str,
    ) -> Result<Vec<AttributeTerm>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "product_terms");
        let Some(assigned) = state.assignments.get(&product) else {
            return Ok(Vec::new());
        };
        Ok(assigned
            .iter()
            .filter_map(|id| state.terms.get(id))
            .filter(|term| term.taxonomy == taxonomy)
            .cloned()
            .collect())
    }

    async fn list_in_stock_variations(
        &self,
        query: &InStockVariationQuery,
        page: PageRequest,
    ) -> Result<Vec<InStockVariation>, RepoError> {
        self.variation_queries.fetch_add(1, Ordering::AcqRel);
        if self.fail_variation_queries.load(Ordering::Acquire) {
            return Err(RepoError::Timeout);
        }

        let offset = usize::try_from(page.offset)
            .map_err(|_| RepoError::InvalidInput {
                message: format!("offset {} out of range", page.offset),
            })?;
        let state = rw_read(&self.state, SOURCE, "list_in_stock_variations");

        Ok(state
            .variations
            .values()
            .filter(|variation| query.parent_ids.contains(&variation.parent_id))
            .filter(|variation| {
                variation.is_in_stock_for(&query.attribute, &query.term, query.stock_threshold)
            })
            .map(|variation| InStockVariation {
                id: variation.id,
                parent_id: variation.parent_id,
                stock_quantity: variation.stock_quantity.unwrap_or_default(),
            })
            .skip(offset)
            .take(page.limit as usize)
            .collect())
    }

    async fn list_attribute_taxonomies(&self) -> Result<Vec<AttributeTaxonomy>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "list_attribute_taxonomies")
            .taxonomies
            .clone())
    }

    async fn list_taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<AttributeTerm>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "list_taxonomy_terms")
            .terms
            .values()
            .filter(|term| term.taxonomy == taxonomy)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrdersRepo for InMemoryCatalog {
    async fn list_order_items(&self, order: OrderId) -> Result<Vec<OrderLineItem>, RepoError> {
        rw_read(&self.state, SOURCE, "list_order_items")
            .orders
            .get(&order)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl StoreSettingsRepo for InMemoryCatalog {
    async fn stock_threshold(&self) -> Result<i64, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "stock_threshold").stock_threshold)
    }

    async fn is_commerce_active(&self) -> Result<bool, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "is_commerce_active").commerce_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: i64, slug: &str) -> AttributeTerm {
        AttributeTerm {
            id: TermId(id),
            taxonomy: "pa_size".to_string(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
        }
    }

    fn variation(id: i64, parent: i64, value: &str, quantity: Option<i64>) -> VariationRecord {
        VariationRecord {
            id: ProductId(id),
            parent_id: ProductId(parent),
            manage_stock: true,
            stock_quantity: quantity,
            attributes: BTreeMap::from([("pa_size".to_string(), value.to_string())]),
        }
    }

    fn query(parents: &[i64], threshold: i64) -> InStockVariationQuery {
        InStockVariationQuery {
            parent_ids: parents.iter().copied().map(ProductId).collect(),
            attribute: "pa_size".to_string(),
            term: term(5, "m"),
            stock_threshold: threshold,
        }
    }

    #[tokio::test]
    async fn variation_query_matches_slug_or_name_above_threshold() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_variation(variation(100, 10, "m", Some(3)));
        catalog.insert_variation(variation(101, 11, "M", Some(5)));
        catalog.insert_variation(variation(102, 12, "m", Some(2)));
        catalog.insert_variation(variation(103, 13, "m", None));
        catalog.insert_variation(variation(104, 99, "m", Some(9)));

        let rows = catalog
            .list_in_stock_variations(&query(&[10, 11, 12, 13], 2), PageRequest::new(10, 0))
            .await
            .expect("query");

        let parents: Vec<_> = rows.iter().map(|row| row.parent_id).collect();
        assert_eq!(parents, vec![ProductId(10), ProductId(11)]);
        assert_eq!(catalog.variation_queries(), 1);
    }

    #[tokio::test]
    async fn variation_query_pages_by_offset() {
        let catalog = InMemoryCatalog::new();
        for id in 0..5 {
            catalog.insert_variation(variation(100 + id, 10, "m", Some(5)));
        }

        let second = catalog
            .list_in_stock_variations(&query(&[10], 0), PageRequest::new(2, 2))
            .await
            .expect("query");

        let ids: Vec<_> = second.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![ProductId(102), ProductId(103)]);
    }

    #[tokio::test]
    async fn terms_are_scoped_to_taxonomy() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_term(term(5, "m"));
        catalog.assign_terms(ProductId(10), &[TermId(5)]);

        assert!(catalog.find_term(TermId(5), "pa_color").await.expect("lookup").is_none());
        assert_eq!(
            catalog
                .product_terms(ProductId(10), "pa_size")
                .await
                .expect("terms"),
            vec![term(5, "m")]
        );
    }

    #[tokio::test]
    async fn set_stock_updates_known_variations_only() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_variation(variation(100, 10, "m", Some(1)));

        assert!(catalog.set_stock(ProductId(100), Some(7)));
        assert!(!catalog.set_stock(ProductId(404), Some(7)));
        assert_eq!(
            catalog.parent_of(ProductId(100)).await.expect("parent"),
            Some(ProductId(10))
        );
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let catalog = InMemoryCatalog::new();
        assert!(matches!(
            catalog.list_order_items(OrderId(1)).await,
            Err(RepoError::NotFound)
        ));
    }
}

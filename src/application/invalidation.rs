//! Deletes cached filter results when stock-by-attribute status may have changed.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::repos::{CatalogRepo, StoreSettingsRepo};
use crate::cache::{Keyspace, TransientKey, TransientStore};
use crate::domain::entities::{OrderLineItem, ProductRecord};
use crate::domain::types::ProductId;

/// What an invalidation pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Entries whose attributes were walked.
    pub entries: usize,
    /// Delete calls that reached the transient store.
    pub keys_cleared: usize,
    /// Entries whose walk stopped at an attribute with no resolvable terms.
    pub short_circuited: usize,
}

impl InvalidationReport {
    pub fn merge(&mut self, other: InvalidationReport) {
        self.entries += other.entries;
        self.keys_cleared += other.keys_cleared;
        self.short_circuited += other.short_circuited;
    }
}

pub struct StockInvalidator {
    catalog: Arc<dyn CatalogRepo>,
    settings: Arc<dyn StoreSettingsRepo>,
    transients: Arc<dyn TransientStore>,
    keyspace: Keyspace,
}

impl StockInvalidator {
    pub fn new(
        catalog: Arc<dyn CatalogRepo>,
        settings: Arc<dyn StoreSettingsRepo>,
        transients: Arc<dyn TransientStore>,
        keyspace: Keyspace,
    ) -> Self {
        Self {
            catalog,
            settings,
            transients,
            keyspace,
        }
    }

    /// Stock was set on `id`, which may be a product or a variation.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn on_stock_set(&self, id: ProductId) -> InvalidationReport {
        match self.catalog.find_product(id).await {
            Ok(Some(product)) => self.invalidate_product(&product).await,
            Ok(None) => match self.catalog.parent_of(id).await {
                Ok(Some(parent)) => self.invalidate_entry(parent).await,
                Ok(None) => {
                    debug!("Stock holder is neither a product nor a variation");
                    InvalidationReport::default()
                }
                Err(err) => {
                    warn!(error = %err, "Variation parent lookup failed");
                    InvalidationReport::default()
                }
            },
            Err(err) => {
                warn!(error = %err, "Product lookup failed");
                InvalidationReport::default()
            }
        }
    }

    /// An order reduced stock; every variation line invalidates its parent.
    pub async fn on_order_stock_reduced(&self, items: &[OrderLineItem]) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        for item in items.iter().filter(|item| item.is_variation()) {
            report.merge(self.invalidate_entry(item.product_id).await);
        }
        report
    }

    pub async fn on_variations_saved(&self, product_id: ProductId) -> InvalidationReport {
        self.invalidate_entry(product_id).await
    }

    pub async fn on_product_saved(&self, product_id: ProductId) -> InvalidationReport {
        self.invalidate_entry(product_id).await
    }

    /// Load a product and invalidate the terms of its variation attributes.
    #[instrument(skip(self))]
    pub async fn invalidate_entry(&self, product_id: ProductId) -> InvalidationReport {
        match self.catalog.find_product(product_id).await {
            Ok(Some(product)) => self.invalidate_product(&product).await,
            Ok(None) => {
                debug!("Product not found; nothing to invalidate");
                InvalidationReport::default()
            }
            Err(err) => {
                warn!(error = %err, "Product lookup failed");
                InvalidationReport::default()
            }
        }
    }

    /// Delete the cached result of every term assigned through a taxonomy-backed
    /// variation attribute.
    ///
    /// The walk stops at the first such attribute whose terms are missing or fail
    /// to load; later attributes of the same product are left untouched.
    pub async fn invalidate_product(&self, product: &ProductRecord) -> InvalidationReport {
        let mut report = InvalidationReport {
            entries: 1,
            ..Default::default()
        };

        for attribute in product
            .attributes
            .iter()
            .filter(|attribute| attribute.drives_invalidation())
        {
            let terms = match self.catalog.product_terms(product.id, &attribute.name).await {
                Ok(terms) if !terms.is_empty() => terms,
                Ok(_) => {
                    debug!(
                        product_id = %product.id,
                        attribute = %attribute.name,
                        "No terms assigned; stopping invalidation for this product"
                    );
                    report.short_circuited += 1;
                    break;
                }
                Err(err) => {
                    warn!(
                        product_id = %product.id,
                        attribute = %attribute.name,
                        error = %err,
                        "Term lookup failed; stopping invalidation for this product"
                    );
                    report.short_circuited += 1;
                    break;
                }
            };

            for term in terms {
                if self.delete(&self.keyspace.term(term.id)).await {
                    report.keys_cleared += 1;
                }
            }
        }

        report
    }

    /// Delete the cached result of every term of every registered attribute taxonomy.
    ///
    /// Returns `None` when the sweep was skipped: the commerce extension is
    /// inactive, its state is unknown, or the taxonomies could not be listed.
    #[instrument(skip(self))]
    pub async fn sweep_all(&self) -> Option<InvalidationReport> {
        match self.settings.is_commerce_active().await {
            Ok(true) => {}
            Ok(false) => {
                info!("Commerce extension inactive; skipping transient sweep");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "Could not confirm commerce extension; skipping sweep");
                return None;
            }
        }

        let taxonomies = match self.catalog.list_attribute_taxonomies().await {
            Ok(taxonomies) => taxonomies,
            Err(err) => {
                warn!(error = %err, "Listing attribute taxonomies failed; skipping sweep");
                return None;
            }
        };

        let mut report = InvalidationReport::default();

        for taxonomy in taxonomies {
            let taxonomy_name = taxonomy.taxonomy_name();
            let terms = match self.catalog.list_taxonomy_terms(&taxonomy_name).await {
                Ok(terms) => terms,
                Err(err) => {
                    warn!(taxonomy = %taxonomy_name, error = %err, "Listing terms failed");
                    continue;
                }
            };

            for term in terms {
                if self.delete(&self.keyspace.term(term.id)).await {
                    report.keys_cleared += 1;
                }
            }
        }

        info!(keys_cleared = report.keys_cleared, "Transient sweep complete");
        Some(report)
    }

    async fn delete(&self, key: &TransientKey) -> bool {
        match self.transients.delete(key).await {
            Ok(existed) => {
                debug!(key = %key, existed, "Transient deleted");
                true
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Transient delete failed");
                false
            }
        }
    }
}

//! Explicit construction of the filter and its invalidation hooks.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::invalidation::{InvalidationReport, StockInvalidator};
use crate::application::layered_nav::{
    FilterOutcome, FilterSource, LayeredNavConfig, LayeredNavFilter, PassThroughReason,
};
use crate::application::lifecycle::{ExtensionGuard, ModuleState};
use crate::application::repos::{CatalogRepo, OrdersRepo, StoreSettingsRepo};
use crate::cache::{CacheConfig, CacheTrigger, EventQueue, InvalidationConsumer, TransientStore};
use crate::domain::types::{OrderId, ProductId, TermId};

/// Host collaborators the module is built from.
#[derive(Clone)]
pub struct LayeredNavDeps {
    pub catalog: Arc<dyn CatalogRepo>,
    pub orders: Arc<dyn OrdersRepo>,
    pub settings: Arc<dyn StoreSettingsRepo>,
    pub transients: Arc<dyn TransientStore>,
}

/// The wired module: one filter and the event hooks that keep its cache honest.
pub struct LayeredNav {
    state: ModuleState,
    filter: LayeredNavFilter,
    orders: Arc<dyn OrdersRepo>,
    trigger: Arc<CacheTrigger>,
}

impl LayeredNav {
    /// Build every component and check that the commerce extension is active.
    pub async fn wire(
        deps: LayeredNavDeps,
        cache: CacheConfig,
        layered_nav: LayeredNavConfig,
    ) -> Self {
        let guard = ExtensionGuard::new(deps.settings.clone());
        let state = guard.check().await;

        let keyspace = cache.keyspace();
        info!(
            state = ?state,
            key_prefix = keyspace.prefix(),
            backend = ?cache.backend,
            "In-stock layered nav wired"
        );
        let filter = LayeredNavFilter::new(
            deps.catalog.clone(),
            deps.settings.clone(),
            deps.transients.clone(),
            keyspace.clone(),
            cache.enabled.then(|| cache.ttl()),
            layered_nav,
        );

        let invalidator = Arc::new(StockInvalidator::new(
            deps.catalog,
            deps.settings,
            deps.transients,
            keyspace,
        ));
        let queue = Arc::new(EventQueue::new());
        let consumer = Arc::new(InvalidationConsumer::new(
            cache.clone(),
            queue.clone(),
            invalidator,
        ));
        let trigger = Arc::new(CacheTrigger::new(cache, queue, consumer));

        Self {
            state,
            filter,
            orders: deps.orders,
            trigger,
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn trigger(&self) -> &Arc<CacheTrigger> {
        &self.trigger
    }

    pub async fn filter_post_ids(
        &self,
        candidates: &[ProductId],
        attribute: &str,
        term: TermId,
    ) -> Vec<ProductId> {
        self.evaluate(candidates, attribute, term).await.into_ids()
    }

    pub async fn evaluate(
        &self,
        candidates: &[ProductId],
        attribute: &str,
        term: TermId,
    ) -> FilterOutcome {
        if !self.state.is_active() {
            return FilterOutcome {
                ids: candidates.to_vec(),
                source: FilterSource::PassThrough(PassThroughReason::ModuleInactive),
            };
        }
        self.filter.evaluate(candidates, attribute, term).await
    }

    pub async fn on_stock_set(&self, product_id: ProductId) -> InvalidationReport {
        if !self.accepts_events("stock_set") {
            return InvalidationReport::default();
        }
        self.trigger.stock_set(product_id).await.unwrap_or_default()
    }

    /// Load the order's line items and invalidate every variation among them.
    #[instrument(skip(self))]
    pub async fn on_order_stock_reduced(&self, order_id: OrderId) -> InvalidationReport {
        if !self.accepts_events("order_stock_reduced") {
            return InvalidationReport::default();
        }
        let items = match self.orders.list_order_items(order_id).await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "Failed to load order items; skipping invalidation");
                return InvalidationReport::default();
            }
        };
        self.trigger
            .order_stock_reduced(order_id, items)
            .await
            .unwrap_or_default()
    }

    pub async fn on_variations_saved(&self, product_id: ProductId) -> InvalidationReport {
        if !self.accepts_events("variations_saved") {
            return InvalidationReport::default();
        }
        self.trigger
            .variations_saved(product_id)
            .await
            .unwrap_or_default()
    }

    pub async fn on_product_saved(&self, product_id: ProductId) -> InvalidationReport {
        if !self.accepts_events("product_saved") {
            return InvalidationReport::default();
        }
        self.trigger
            .product_saved(product_id)
            .await
            .unwrap_or_default()
    }

    /// Sweep every term key. The sweep re-checks the extension itself.
    pub async fn on_deactivated(&self) -> InvalidationReport {
        self.trigger
            .extension_deactivated()
            .await
            .unwrap_or_default()
    }

    fn accepts_events(&self, event: &'static str) -> bool {
        if self.state.is_active() {
            return true;
        }
        debug!(event, "Event ignored: module inactive");
        false
    }
}

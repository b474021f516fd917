//! Cache trigger service.
//!
//! The entry point host hooks call: publishes catalog events and, by default,
//! consumes them before returning so the next filter request sees fresh data.

use std::sync::Arc;

use tracing::debug;

use crate::application::invalidation::InvalidationReport;
use crate::domain::entities::OrderLineItem;
use crate::domain::types::{OrderId, ProductId};

use super::config::CacheConfig;
use super::consumer::InvalidationConsumer;
use super::events::{EventKind, EventQueue};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<InvalidationConsumer>,
}

impl CacheTrigger {
    pub fn new(
        config: CacheConfig,
        queue: Arc<EventQueue>,
        consumer: Arc<InvalidationConsumer>,
    ) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume the queue immediately.
    ///
    /// Returns the merged report when consumption ran.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) -> Option<InvalidationReport> {
        if !self.config.enabled {
            debug!(event_kind = kind.name(), "Cache trigger skipped: cache disabled");
            return None;
        }

        self.queue.publish(kind);

        if consume_now {
            Some(self.consumer.consume_all().await)
        } else {
            None
        }
    }

    pub async fn stock_set(&self, product_id: ProductId) -> Option<InvalidationReport> {
        self.trigger(EventKind::StockSet { product_id }, true).await
    }

    pub async fn order_stock_reduced(
        &self,
        order_id: OrderId,
        items: Vec<OrderLineItem>,
    ) -> Option<InvalidationReport> {
        self.trigger(EventKind::OrderStockReduced { order_id, items }, true)
            .await
    }

    pub async fn variations_saved(&self, product_id: ProductId) -> Option<InvalidationReport> {
        self.trigger(EventKind::VariationsSaved { product_id }, true)
            .await
    }

    pub async fn product_saved(&self, product_id: ProductId) -> Option<InvalidationReport> {
        self.trigger(EventKind::ProductSaved { product_id }, true).await
    }

    pub async fn extension_deactivated(&self) -> Option<InvalidationReport> {
        self.trigger(EventKind::ExtensionDeactivated, true).await
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<InvalidationConsumer> {
        &self.consumer
    }
}

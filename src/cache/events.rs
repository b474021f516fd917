//! Catalog events that can change stock-by-attribute status.
//!
//! Host hooks publish these into an in-memory queue drained by the consumer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::gauge;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::OrderLineItem;
use crate::domain::types::{OrderId, ProductId};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

pub(crate) const METRIC_EVENT_QUEUE_LEN: &str = "instock_nav_event_queue_len";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier used to drop duplicate deliveries.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Stock was set on a product or on one of its variations.
    StockSet { product_id: ProductId },
    /// An order was placed and its line items reduced stock.
    OrderStockReduced {
        order_id: OrderId,
        items: Vec<OrderLineItem>,
    },
    /// Variations were saved from the product editor.
    VariationsSaved { product_id: ProductId },
    /// A product was saved.
    ProductSaved { product_id: ProductId },
    /// This module is being switched off; every cached term is swept.
    ExtensionDeactivated,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::StockSet { .. } => "stock_set",
            EventKind::OrderStockReduced { .. } => "order_stock_reduced",
            EventKind::VariationsSaved { .. } => "variations_saved",
            EventKind::ProductSaved { .. } => "product_saved",
            EventKind::ExtensionDeactivated => "extension_deactivated",
        }
    }
}

pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: EventKind) {
        let event = CacheEvent::new(kind, self.next_epoch());

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.name(),
            "Catalog event enqueued"
        );

        self.push(event);
    }

    /// Enqueue an already-built event, e.g. a redelivery carrying its original id.
    pub fn push(&self, event: CacheEvent) {
        let mut queue = mutex_lock(&self.queue, SOURCE, "push");
        queue.push_back(event);
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let events = queue.drain(..count).collect();
        gauge!(METRIC_EVENT_QUEUE_LEN).set(queue.len() as f64);
        events
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn epochs_are_monotonic() {
        let queue = EventQueue::new();
        let first = queue.next_epoch();
        let second = queue.next_epoch();
        assert!(first < second);
    }

    #[test]
    fn drain_returns_fifo_batches() {
        let queue = EventQueue::new();
        queue.publish(EventKind::ProductSaved {
            product_id: ProductId(1),
        });
        queue.publish(EventKind::StockSet {
            product_id: ProductId(2),
        });
        queue.publish(EventKind::ExtensionDeactivated);

        let batch = queue.drain(2);
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(batch[0].kind.name(), "product_saved");
        assert_eq!(batch[1].kind.name(), "stock_set");
        assert!(batch[0].epoch < batch[1].epoch);
    }

    #[test]
    fn drain_more_than_available_empties_queue() {
        let queue = EventQueue::new();
        queue.publish(EventKind::ExtensionDeactivated);

        assert_eq!(queue.drain(100).len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn pushed_events_keep_their_identity() {
        let queue = EventQueue::new();
        let event = CacheEvent::new(EventKind::ExtensionDeactivated, 7);
        let id = event.id;

        queue.push(event);

        let drained = queue.drain(1);
        assert_eq!(drained[0].id, id);
        assert_eq!(drained[0].epoch, 7);
    }

    #[test]
    fn event_queue_recovers_from_poisoned_lock() {
        let queue = EventQueue::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("queue lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(EventKind::ExtensionDeactivated);
        assert_eq!(queue.len(), 1);
    }
}

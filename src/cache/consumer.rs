//! Drains catalog events and executes the resulting invalidation plan.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::invalidation::{InvalidationReport, StockInvalidator};

use super::config::CacheConfig;
use super::events::EventQueue;
use super::planner::{ConsumptionPlan, Target};

pub(crate) const METRIC_CONSUME_MS: &str = "instock_nav_consume_ms";

pub struct InvalidationConsumer {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    invalidator: Arc<StockInvalidator>,
}

impl InvalidationConsumer {
    pub fn new(
        config: CacheConfig,
        queue: Arc<EventQueue>,
        invalidator: Arc<StockInvalidator>,
    ) -> Self {
        Self {
            config,
            queue,
            invalidator,
        }
    }

    /// Consume one batch of pending events.
    ///
    /// Returns `None` when the queue was empty.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> Option<InvalidationReport> {
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit());
        if events.is_empty() {
            return None;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|event| event.id).collect();
        let plan = ConsumptionPlan::from_events(events);

        info!(
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Invalidation consumption starting"
        );

        let report = self.execute(&plan).await;

        info!(
            event_count,
            entries = report.entries,
            keys_cleared = report.keys_cleared,
            short_circuited = report.short_circuited,
            "Invalidation consumption complete"
        );

        histogram!(METRIC_CONSUME_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        Some(report)
    }

    /// Consume until the queue is empty, merging every batch report.
    pub async fn consume_all(&self) -> InvalidationReport {
        let mut total = InvalidationReport::default();
        while let Some(report) = self.consume().await {
            total.merge(report);
        }
        total
    }

    /// Run the sweep when requested; a skipped sweep falls back to the targets.
    async fn execute(&self, plan: &ConsumptionPlan) -> InvalidationReport {
        if plan.sweep {
            if let Some(report) = self.invalidator.sweep_all().await {
                return report;
            }
            debug!(targets = plan.targets.len(), "Sweep skipped; invalidating targets");
        }

        let mut report = InvalidationReport::default();
        for target in &plan.targets {
            let outcome = match *target {
                Target::Product(id) => self.invalidator.invalidate_entry(id).await,
                Target::StockHolder(id) => self.invalidator.on_stock_set(id).await,
            };
            report.merge(outcome);
        }
        report
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }
}

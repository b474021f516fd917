//! Consumption plan generation.
//!
//! Merges a batch of catalog events into the set of entries to invalidate.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::domain::types::ProductId;

use super::events::{CacheEvent, EventKind};

/// An entry whose attribute terms must be invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A parent product, known directly from the event.
    Product(ProductId),
    /// The product or variation whose stock changed; variations resolve to their parent.
    StockHolder(ProductId),
}

impl Target {
    pub fn id(self) -> ProductId {
        match self {
            Target::Product(id) | Target::StockHolder(id) => id,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsumptionPlan {
    /// Targets in first-seen order, one per id.
    pub targets: Vec<Target>,
    /// Sweep every attribute term. `targets` only run when the sweep is skipped.
    pub sweep: bool,
}

impl fmt::Display for ConsumptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConsumptionPlan {{ targets: {}, sweep: {} }}",
            self.targets.len(),
            self.sweep
        )
    }
}

impl ConsumptionPlan {
    /// - Deduplicates by event id
    /// - Orders by epoch
    /// - Flattens order line items into their parent products
    /// - Keeps one target per id; a stock holder covers a product with the same id
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();
        let mut positions: HashMap<ProductId, usize> = HashMap::new();

        let mut events: Vec<_> = events
            .into_iter()
            .filter(|event| seen_ids.insert(event.id))
            .collect();
        events.sort_by_key(|event| event.epoch);

        let mut push = |plan: &mut Self, target: Target| match positions.get(&target.id()) {
            Some(&index) => {
                if let Target::StockHolder(_) = target {
                    plan.targets[index] = target;
                }
            }
            None => {
                positions.insert(target.id(), plan.targets.len());
                plan.targets.push(target);
            }
        };

        for event in events {
            match event.kind {
                EventKind::StockSet { product_id } => {
                    push(&mut plan, Target::StockHolder(product_id));
                }
                EventKind::OrderStockReduced { items, .. } => {
                    for item in items.iter().filter(|item| item.is_variation()) {
                        push(&mut plan, Target::Product(item.product_id));
                    }
                }
                EventKind::VariationsSaved { product_id }
                | EventKind::ProductSaved { product_id } => {
                    push(&mut plan, Target::Product(product_id));
                }
                EventKind::ExtensionDeactivated => plan.sweep = true,
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && !self.sweep
    }
}

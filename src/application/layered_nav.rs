//! Layered navigation post-id filter.
//!
//! Narrows the products listed for a selected attribute term to those with at
//! least one in-stock variation carrying that term, caching the result per term.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use tracing::{debug, instrument, warn};

use crate::application::pagination::{PagerError, PagerLimits, collect_pages};
use crate::application::repos::{CatalogRepo, InStockVariationQuery, StoreSettingsRepo};
use crate::cache::{Keyspace, TransientStore};
use crate::config::{
    DEFAULT_MAX_PAGES, DEFAULT_MAX_QUERY_SECS, DEFAULT_PAGE_SIZE, LayeredNavSettings,
};
use crate::domain::entities::AttributeTerm;
use crate::domain::types::{ProductId, TermId};

pub(crate) const METRIC_FILTER_QUERY_MS: &str = "instock_nav_filter_query_ms";

#[derive(Debug, Clone)]
pub struct LayeredNavConfig {
    pub enabled: bool,
    pub page_size: NonZeroU32,
    pub max_pages: NonZeroU32,
    pub max_query_duration: Duration,
}

impl Default for LayeredNavConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
            max_pages: NonZeroU32::new(DEFAULT_MAX_PAGES).unwrap_or(NonZeroU32::MIN),
            max_query_duration: Duration::from_secs(DEFAULT_MAX_QUERY_SECS),
        }
    }
}

impl From<&LayeredNavSettings> for LayeredNavConfig {
    fn from(settings: &LayeredNavSettings) -> Self {
        Self {
            enabled: settings.enabled,
            page_size: settings.page_size,
            max_pages: settings.max_pages,
            max_query_duration: settings.max_query_duration,
        }
    }
}

impl LayeredNavConfig {
    fn pager_limits(&self) -> PagerLimits {
        PagerLimits {
            page_size: self.page_size,
            max_pages: self.max_pages,
            max_duration: self.max_query_duration,
        }
    }
}

/// Why a request was answered with its own candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassThroughReason {
    /// The term could not be resolved in the attribute's taxonomy.
    UnknownTerm,
    /// The first candidate does not use the attribute to define variations.
    NotVariationAttribute,
    /// The first candidate could not be loaded.
    UnknownProduct,
    /// A repository call failed.
    LookupFailed(String),
    /// The variation query hit its page or time cap.
    QueryCapped(String),
    /// The module is switched off or the commerce extension is absent.
    ModuleInactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    /// Served from the transient without querying.
    Cache,
    /// Computed from the variation query and cached.
    Query,
    PassThrough(PassThroughReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub ids: Vec<ProductId>,
    pub source: FilterSource,
}

impl FilterOutcome {
    fn pass_through(candidates: &[ProductId], reason: PassThroughReason) -> Self {
        Self {
            ids: candidates.to_vec(),
            source: FilterSource::PassThrough(reason),
        }
    }

    pub fn into_ids(self) -> Vec<ProductId> {
        self.ids
    }
}

pub struct LayeredNavFilter {
    catalog: Arc<dyn CatalogRepo>,
    settings: Arc<dyn StoreSettingsRepo>,
    transients: Arc<dyn TransientStore>,
    keyspace: Keyspace,
    /// `None` bypasses the transient store entirely.
    ttl: Option<Duration>,
    config: LayeredNavConfig,
}

impl LayeredNavFilter {
    pub fn new(
        catalog: Arc<dyn CatalogRepo>,
        settings: Arc<dyn StoreSettingsRepo>,
        transients: Arc<dyn TransientStore>,
        keyspace: Keyspace,
        ttl: Option<Duration>,
        config: LayeredNavConfig,
    ) -> Self {
        Self {
            catalog,
            settings,
            transients,
            keyspace,
            ttl,
            config,
        }
    }

    /// Filter `candidates` for `term` of `attribute`, keeping input order.
    pub async fn filter_post_ids(
        &self,
        candidates: &[ProductId],
        attribute: &str,
        term: TermId,
    ) -> Vec<ProductId> {
        self.evaluate(candidates, attribute, term).await.into_ids()
    }

    /// Like [`filter_post_ids`](Self::filter_post_ids), also reporting where the answer came from.
    ///
    /// A cached list is returned as stored even when `candidates` differs from the
    /// list it was computed for.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn evaluate(
        &self,
        candidates: &[ProductId],
        attribute: &str,
        term: TermId,
    ) -> FilterOutcome {
        if !self.config.enabled {
            return FilterOutcome::pass_through(candidates, PassThroughReason::ModuleInactive);
        }

        let key = self.keyspace.term(term);

        if self.ttl.is_some() {
            match self.transients.get(&key).await {
                Ok(Some(ids)) => {
                    debug!(key = %key, cached = ids.len(), "Serving layered nav ids from transient");
                    return FilterOutcome {
                        ids,
                        source: FilterSource::Cache,
                    };
                }
                Ok(None) => {}
                Err(err) => warn!(key = %key, error = %err, "Transient read failed; recomputing"),
            }
        }

        let attribute_term = match self.catalog.find_term(term, attribute).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                return FilterOutcome::pass_through(candidates, PassThroughReason::UnknownTerm);
            }
            Err(err) => {
                warn!(error = %err, "Term lookup failed");
                return FilterOutcome::pass_through(
                    candidates,
                    PassThroughReason::LookupFailed(err.to_string()),
                );
            }
        };

        let Some(&first) = candidates.first() else {
            return FilterOutcome {
                ids: Vec::new(),
                source: FilterSource::Query,
            };
        };

        let first_product = match self.catalog.find_product(first).await {
            Ok(Some(product)) => product,
            Ok(None) => {
                return FilterOutcome::pass_through(candidates, PassThroughReason::UnknownProduct);
            }
            Err(err) => {
                warn!(product_id = %first, error = %err, "Product lookup failed");
                return FilterOutcome::pass_through(
                    candidates,
                    PassThroughReason::LookupFailed(err.to_string()),
                );
            }
        };

        if !first_product
            .attribute(attribute)
            .is_some_and(|found| found.is_variation)
        {
            return FilterOutcome::pass_through(
                candidates,
                PassThroughReason::NotVariationAttribute,
            );
        }

        let threshold = match self.settings.stock_threshold().await {
            Ok(threshold) => threshold,
            Err(err) => {
                warn!(error = %err, "Stock threshold lookup failed");
                return FilterOutcome::pass_through(
                    candidates,
                    PassThroughReason::LookupFailed(err.to_string()),
                );
            }
        };

        let in_stock_parents = match self
            .in_stock_parents(candidates, attribute, &attribute_term, threshold)
            .await
        {
            Ok(parents) => parents,
            Err(PagerError::Repo(err)) => {
                warn!(error = %err, "In-stock variation query failed");
                return FilterOutcome::pass_through(
                    candidates,
                    PassThroughReason::LookupFailed(err.to_string()),
                );
            }
            Err(capped) => {
                warn!(error = %capped, "In-stock variation query capped; not filtering");
                return FilterOutcome::pass_through(
                    candidates,
                    PassThroughReason::QueryCapped(capped.to_string()),
                );
            }
        };

        let ids: Vec<ProductId> = candidates
            .iter()
            .copied()
            .filter(|id| in_stock_parents.contains(id))
            .collect();

        if let Some(ttl) = self.ttl
            && let Err(err) = self.transients.set(&key, &ids, ttl).await
        {
            warn!(key = %key, error = %err, "Transient write failed");
        }

        debug!(
            key = %key,
            kept = ids.len(),
            dropped = candidates.len() - ids.len(),
            "Layered nav ids filtered"
        );

        FilterOutcome {
            ids,
            source: FilterSource::Query,
        }
    }

    async fn in_stock_parents(
        &self,
        candidates: &[ProductId],
        attribute: &str,
        term: &AttributeTerm,
        threshold: i64,
    ) -> Result<HashSet<ProductId>, PagerError> {
        let started_at = Instant::now();
        let query = InStockVariationQuery {
            parent_ids: candidates.to_vec(),
            attribute: attribute.to_string(),
            term: term.clone(),
            stock_threshold: threshold,
        };

        let catalog = &self.catalog;
        let query = &query;
        let variations = collect_pages(self.config.pager_limits(), |page| async move {
            catalog.list_in_stock_variations(query, page).await
        })
        .await;

        histogram!(METRIC_FILTER_QUERY_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        Ok(variations?
            .into_iter()
            .map(|variation| variation.parent_id)
            .collect())
    }
}

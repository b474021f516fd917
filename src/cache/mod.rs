//! Transient cache for layered navigation filter results.
//!
//! - **Store**: expiring `<prefix>_<term_id>` entries holding filtered product ids
//! - **Events**: catalog changes queued by host hooks and consumed into
//!   invalidation plans
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "postgres"
//! key_prefix = "wc_layered_nav_query_post_ids"
//! ttl_seconds = 604800
//! ```

mod config;
mod consumer;
mod events;
mod keys;
pub(crate) mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::InvalidationConsumer;
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use keys::{Keyspace, TransientKey};
pub use planner::{ConsumptionPlan, Target};
pub use store::{
    CacheError, MemoryTransientStore, TransientStore, decode_ids, encode_ids, expires_after,
};
pub use trigger::CacheTrigger;

pub(crate) mod metric_names {
    pub(crate) use super::consumer::METRIC_CONSUME_MS;
    pub(crate) use super::events::METRIC_EVENT_QUEUE_LEN;
    pub(crate) use super::store::{
        METRIC_TRANSIENT_DELETE, METRIC_TRANSIENT_EVICT, METRIC_TRANSIENT_HIT,
        METRIC_TRANSIENT_MISS,
    };
}

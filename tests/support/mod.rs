#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use instock_nav::application::layered_nav::LayeredNavConfig;
use instock_nav::application::wiring::{LayeredNav, LayeredNavDeps};
use instock_nav::cache::{CacheConfig, Keyspace, MemoryTransientStore, TransientKey};
use instock_nav::domain::entities::{
    AttributeTaxonomy, AttributeTerm, ProductAttribute, ProductRecord, VariationRecord,
};
use instock_nav::domain::types::{ProductId, TermId};
use instock_nav::infra::memory::InMemoryCatalog;

pub const SIZE: &str = "pa_size";
pub const COLOR: &str = "pa_color";
pub const TERM_M: TermId = TermId(5);
pub const TERM_L: TermId = TermId(6);
pub const TERM_RED: TermId = TermId(7);

pub fn ids(raw: &[i64]) -> Vec<ProductId> {
    raw.iter().copied().map(ProductId).collect()
}

pub fn key(term: TermId) -> TransientKey {
    Keyspace::default().term(term)
}

pub fn attribute(name: &str, position: i32, is_variation: bool) -> ProductAttribute {
    ProductAttribute {
        name: name.to_string(),
        position,
        is_taxonomy: true,
        is_variation,
    }
}

pub fn product(id: i64, attributes: Vec<ProductAttribute>) -> ProductRecord {
    ProductRecord {
        id: ProductId(id),
        attributes,
    }
}

pub fn term(id: TermId, taxonomy: &str, slug: &str, name: &str) -> AttributeTerm {
    AttributeTerm {
        id,
        taxonomy: taxonomy.to_string(),
        slug: slug.to_string(),
        name: name.to_string(),
    }
}

pub fn variation(id: i64, parent: i64, size: &str, quantity: Option<i64>) -> VariationRecord {
    VariationRecord {
        id: ProductId(id),
        parent_id: ProductId(parent),
        manage_stock: true,
        stock_quantity: quantity,
        attributes: BTreeMap::from([(SIZE.to_string(), size.to_string())]),
    }
}

/// Products 10, 11 and 12 varying by size with a stock threshold of 2:
/// 10 has `m` at 3, 11 only has `l`, 12 has `m` at exactly 2.
pub fn sized_catalog() -> Arc<InMemoryCatalog> {
    let catalog = Arc::new(InMemoryCatalog::new());

    catalog.insert_taxonomy(AttributeTaxonomy {
        id: 1,
        name: "size".to_string(),
        label: "Size".to_string(),
    });
    catalog.insert_taxonomy(AttributeTaxonomy {
        id: 2,
        name: "color".to_string(),
        label: "Color".to_string(),
    });
    catalog.insert_term(term(TERM_M, SIZE, "m", "M"));
    catalog.insert_term(term(TERM_L, SIZE, "l", "L"));
    catalog.insert_term(term(TERM_RED, COLOR, "red", "Red"));

    for id in [10, 11, 12] {
        catalog.insert_product(product(id, vec![attribute(SIZE, 0, true)]));
    }
    catalog.assign_terms(ProductId(10), &[TERM_M]);
    catalog.assign_terms(ProductId(11), &[TERM_L]);
    catalog.assign_terms(ProductId(12), &[TERM_M]);

    catalog.insert_variation(variation(100, 10, "m", Some(3)));
    catalog.insert_variation(variation(110, 11, "l", Some(9)));
    catalog.insert_variation(variation(120, 12, "m", Some(2)));

    catalog.set_stock_threshold(2);
    catalog
}

pub fn nav_config(page_size: u32, max_pages: u32) -> LayeredNavConfig {
    LayeredNavConfig {
        enabled: true,
        page_size: NonZeroU32::new(page_size).expect("non-zero page size"),
        max_pages: NonZeroU32::new(max_pages).expect("non-zero page cap"),
        max_query_duration: Duration::from_secs(30),
    }
}

pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub transients: Arc<MemoryTransientStore>,
    pub module: LayeredNav,
}

pub async fn harness_with(catalog: Arc<InMemoryCatalog>, layered_nav: LayeredNavConfig) -> Harness {
    harness_with_cache(catalog, CacheConfig::default(), layered_nav).await
}

pub async fn harness_with_cache(
    catalog: Arc<InMemoryCatalog>,
    cache: CacheConfig,
    layered_nav: LayeredNavConfig,
) -> Harness {
    let transients = Arc::new(MemoryTransientStore::new(&cache));
    let deps = LayeredNavDeps {
        catalog: catalog.clone(),
        orders: catalog.clone(),
        settings: catalog.clone(),
        transients: transients.clone(),
    };
    let module = LayeredNav::wire(deps, cache, layered_nav).await;
    Harness {
        catalog,
        transients,
        module,
    }
}

pub async fn harness() -> Harness {
    harness_with(sized_catalog(), LayeredNavConfig::default()).await
}

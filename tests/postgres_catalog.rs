use std::time::Duration;

use instock_nav::application::pagination::PageRequest;
use instock_nav::application::repos::{
    CatalogRepo, InStockVariationQuery, OrdersRepo, StoreSettingsRepo,
};
use instock_nav::cache::{Keyspace, TransientStore};
use instock_nav::domain::types::{OrderId, ProductId, TermId};
use instock_nav::infra::db::{PostgresRepositories, PostgresTransientStore};
use sqlx::PgPool;

async fn seed(pool: &PgPool) {
    sqlx::raw_sql(
        r#"
        INSERT INTO products (id, parent_id, manage_stock, stock_quantity) VALUES
            (10, NULL, FALSE, NULL),
            (12, NULL, FALSE, NULL),
            (100, 10, TRUE, 3),
            (120, 12, TRUE, 2);
        INSERT INTO product_attributes (product_id, name, position, is_taxonomy, is_variation) VALUES
            (10, 'pa_size', 0, TRUE, TRUE),
            (12, 'pa_size', 0, TRUE, TRUE);
        INSERT INTO variation_attributes (variation_id, attribute, value) VALUES
            (100, 'pa_size', 'm'),
            (120, 'pa_size', 'M');
        INSERT INTO attribute_taxonomies (name, label) VALUES ('size', 'Size');
        INSERT INTO attribute_terms (id, taxonomy, slug, name) VALUES (5, 'pa_size', 'm', 'M');
        INSERT INTO product_terms (product_id, term_id) VALUES (10, 5), (12, 5);
        INSERT INTO store_options (name, value) VALUES ('notify_no_stock_amount', '2');
        INSERT INTO extensions (name, active) VALUES ('woocommerce', TRUE);
        INSERT INTO order_items (order_id, product_id, variation_id, quantity) VALUES
            (1, 10, 100, 1),
            (1, 11, NULL, 2);
        "#,
    )
    .execute(pool)
    .await
    .expect("seed catalog");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_catalog_answers_filter_queries(pool: PgPool) {
    seed(&pool).await;
    let repos = PostgresRepositories::new(pool);

    let product = repos
        .find_product(ProductId(10))
        .await
        .expect("lookup")
        .expect("product 10");
    assert!(product.attribute("pa_size").is_some_and(|a| a.is_variation));
    assert_eq!(
        repos.parent_of(ProductId(100)).await.expect("parent"),
        Some(ProductId(10))
    );
    assert!(repos.find_product(ProductId(100)).await.expect("lookup").is_none());

    let term = repos
        .find_term(TermId(5), "pa_size")
        .await
        .expect("lookup")
        .expect("term 5");
    let threshold = repos.stock_threshold().await.expect("threshold");
    assert_eq!(threshold, 2);
    assert!(repos.is_commerce_active().await.expect("extension"));

    let query = InStockVariationQuery {
        parent_ids: vec![ProductId(10), ProductId(12)],
        attribute: "pa_size".to_string(),
        term,
        stock_threshold: threshold,
    };
    let rows = repos
        .list_in_stock_variations(&query, PageRequest::new(500, 0))
        .await
        .expect("variations");
    let parents: Vec<_> = rows.iter().map(|row| row.parent_id).collect();
    assert_eq!(parents, vec![ProductId(10)]);

    let items = repos.list_order_items(OrderId(1)).await.expect("items");
    assert_eq!(items.len(), 2);
    assert!(items[0].is_variation());
    assert!(!items[1].is_variation());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn postgres_transients_expire_and_delete(pool: PgPool) {
    let store = PostgresTransientStore::new(PostgresRepositories::new(pool));
    let key = Keyspace::default().term(TermId(5));

    store
        .set(&key, &[ProductId(10)], Duration::from_secs(60))
        .await
        .expect("set");
    assert_eq!(
        store.get(&key).await.expect("get"),
        Some(vec![ProductId(10)])
    );
    assert!(store.delete(&key).await.expect("delete"));
    assert!(store.get(&key).await.expect("get").is_none());

    store
        .set(&key, &[ProductId(10)], Duration::ZERO)
        .await
        .expect("set expired");
    assert!(store.get(&key).await.expect("get").is_none());
    assert_eq!(store.purge_expired().await.expect("purge"), 1);
}

use async_trait::async_trait;

use crate::{
    application::repos::{OrdersRepo, RepoError},
    domain::entities::OrderLineItem,
    domain::types::{OrderId, ProductId},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: i64,
    variation_id: Option<i64>,
    quantity: i64,
}

impl From<OrderItemRow> for OrderLineItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: ProductId(row.product_id),
            variation_id: row.variation_id.map(ProductId),
            quantity: row.quantity,
        }
    }
}

#[async_trait]
impl OrdersRepo for PostgresRepositories {
    async fn list_order_items(&self, order: OrderId) -> Result<Vec<OrderLineItem>, RepoError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT product_id, variation_id, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order.get())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OrderLineItem::from).collect())
    }
}

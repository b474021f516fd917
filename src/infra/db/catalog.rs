use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    application::pagination::PageRequest,
    application::repos::{CatalogRepo, InStockVariationQuery, RepoError},
    domain::entities::{
        AttributeTaxonomy, AttributeTerm, InStockVariation, ProductAttribute, ProductRecord,
    },
    domain::types::{ProductId, TermId},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AttributeRow {
    name: String,
    position: i32,
    is_taxonomy: bool,
    is_variation: bool,
}

impl From<AttributeRow> for ProductAttribute {
    fn from(row: AttributeRow) -> Self {
        Self {
            name: row.name,
            position: row.position,
            is_taxonomy: row.is_taxonomy,
            is_variation: row.is_variation,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TermRow {
    id: i64,
    taxonomy: String,
    slug: String,
    name: String,
}

impl From<TermRow> for AttributeTerm {
    fn from(row: TermRow) -> Self {
        Self {
            id: TermId(row.id),
            taxonomy: row.taxonomy,
            slug: row.slug,
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaxonomyRow {
    id: i64,
    name: String,
    label: String,
}

#[derive(sqlx::FromRow)]
struct VariationRow {
    id: i64,
    parent_id: i64,
    stock_quantity: i64,
}

#[async_trait]
impl CatalogRepo for PostgresRepositories {
    async fn find_product(&self, id: ProductId) -> Result<Option<ProductRecord>, RepoError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM products WHERE id = $1 AND parent_id IS NULL",
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if exists.is_none() {
            return Ok(None);
        }

        let attributes = sqlx::query_as::<_, AttributeRow>(
            r#"
            SELECT name, position, is_taxonomy, is_variation
            FROM product_attributes
            WHERE product_id = $1
            ORDER BY position, name
            "#,
        )
        .bind(id.get())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some(ProductRecord {
            id,
            attributes: attributes.into_iter().map(ProductAttribute::from).collect(),
        }))
    }

    async fn parent_of(&self, id: ProductId) -> Result<Option<ProductId>, RepoError> {
        let parent = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT parent_id FROM products WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(parent.flatten().map(ProductId))
    }

    async fn find_term(
        &self,
        id: TermId,
        taxonomy: &str,
    ) -> Result<Option<AttributeTerm>, RepoError> {
        let row = sqlx::query_as::<_, TermRow>(
            "SELECT id, taxonomy, slug, name FROM attribute_terms WHERE id = $1 AND taxonomy = $2",
        )
        .bind(id.get())
        .bind(taxonomy)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AttributeTerm::from))
    }

    async fn product_terms(
        &self,
        product: ProductId,
        taxonomy: &str,
    ) -> Result<Vec<AttributeTerm>, RepoError> {
        let rows = sqlx::query_as::<_, TermRow>(
            r#"
            SELECT t.id, t.taxonomy, t.slug, t.name
            FROM product_terms pt
            INNER JOIN attribute_terms t ON t.id = pt.term_id
            WHERE pt.product_id = $1 AND t.taxonomy = $2
            ORDER BY t.id
            "#,
        )
        .bind(product.get())
        .bind(taxonomy)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AttributeTerm::from).collect())
    }

    async fn list_in_stock_variations(
        &self,
        query: &InStockVariationQuery,
        page: PageRequest,
    ) -> Result<Vec<InStockVariation>, RepoError> {
        let parent_ids: Vec<i64> = query.parent_ids.iter().map(|id| id.get()).collect();
        let offset = i64::try_from(page.offset).map_err(|_| RepoError::InvalidInput {
            message: format!("offset {} out of range", page.offset),
        })?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT v.id, v.parent_id, v.stock_quantity FROM products v \
             INNER JOIN variation_attributes va ON va.variation_id = v.id AND va.attribute = ",
        );
        qb.push_bind(query.attribute.as_str());
        qb.push(" WHERE v.parent_id = ANY(");
        qb.push_bind(parent_ids);
        qb.push(") AND v.manage_stock AND v.stock_quantity IS NOT NULL AND v.stock_quantity > ");
        qb.push_bind(query.stock_threshold);
        qb.push(" AND va.value IN (");
        qb.push_bind(query.term.slug.as_str());
        qb.push(", ");
        qb.push_bind(query.term.name.as_str());
        qb.push(") ORDER BY v.id LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<VariationRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| InStockVariation {
                id: ProductId(row.id),
                parent_id: ProductId(row.parent_id),
                stock_quantity: row.stock_quantity,
            })
            .collect())
    }

    async fn list_attribute_taxonomies(&self) -> Result<Vec<AttributeTaxonomy>, RepoError> {
        let rows = sqlx::query_as::<_, TaxonomyRow>(
            "SELECT id, name, label FROM attribute_taxonomies ORDER BY name",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| AttributeTaxonomy {
                id: row.id,
                name: row.name,
                label: row.label,
            })
            .collect())
    }

    async fn list_taxonomy_terms(&self, taxonomy: &str) -> Result<Vec<AttributeTerm>, RepoError> {
        let rows = sqlx::query_as::<_, TermRow>(
            "SELECT id, taxonomy, slug, name FROM attribute_terms WHERE taxonomy = $1 ORDER BY id",
        )
        .bind(taxonomy)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AttributeTerm::from).collect())
    }
}

//! Catalog entities as read from the host store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{ATTRIBUTE_TAXONOMY_PREFIX, ProductId, TermId};

/// An attribute attached to a product, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttribute {
    /// Attribute key, e.g. `pa_size` for taxonomy attributes.
    pub name: String,
    pub position: i32,
    /// Backed by a registered attribute taxonomy rather than free text.
    pub is_taxonomy: bool,
    /// Used to define the product's variations.
    pub is_variation: bool,
}

impl ProductAttribute {
    /// Only taxonomy-backed variation attributes carry terms worth invalidating.
    pub fn drives_invalidation(&self) -> bool {
        self.is_taxonomy && self.is_variation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub attributes: Vec<ProductAttribute>,
}

impl ProductRecord {
    pub fn attribute(&self, name: &str) -> Option<&ProductAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationRecord {
    pub id: ProductId,
    pub parent_id: ProductId,
    pub manage_stock: bool,
    pub stock_quantity: Option<i64>,
    /// Attribute key to assigned value. Values hold either a term slug or a term name.
    pub attributes: BTreeMap<String, String>,
}

impl VariationRecord {
    /// Whether this variation counts as in stock for `term` under `attribute`.
    ///
    /// Stock equal to the threshold is out of stock.
    pub fn is_in_stock_for(&self, attribute: &str, term: &AttributeTerm, threshold: i64) -> bool {
        if !self.manage_stock {
            return false;
        }
        let Some(quantity) = self.stock_quantity else {
            return false;
        };
        if quantity <= threshold {
            return false;
        }
        self.attributes
            .get(attribute)
            .is_some_and(|value| term.matches_value(value))
    }
}

/// A variation row returned by the in-stock query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InStockVariation {
    pub id: ProductId,
    pub parent_id: ProductId,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTerm {
    pub id: TermId,
    pub taxonomy: String,
    pub slug: String,
    pub name: String,
}

impl AttributeTerm {
    pub fn matches_value(&self, value: &str) -> bool {
        value == self.slug || value == self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTaxonomy {
    pub id: i64,
    /// Bare attribute name, e.g. `size`.
    pub name: String,
    pub label: String,
}

impl AttributeTaxonomy {
    pub fn taxonomy_name(&self) -> String {
        format!("{ATTRIBUTE_TAXONOMY_PREFIX}{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub variation_id: Option<ProductId>,
    pub quantity: i64,
}

impl OrderLineItem {
    pub fn is_variation(&self) -> bool {
        self.variation_id.is_some_and(|id| id.get() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_m() -> AttributeTerm {
        AttributeTerm {
            id: TermId(5),
            taxonomy: "pa_size".to_string(),
            slug: "m".to_string(),
            name: "Medium".to_string(),
        }
    }

    fn variation(quantity: Option<i64>, value: &str) -> VariationRecord {
        VariationRecord {
            id: ProductId(100),
            parent_id: ProductId(10),
            manage_stock: true,
            stock_quantity: quantity,
            attributes: BTreeMap::from([("pa_size".to_string(), value.to_string())]),
        }
    }

    #[test]
    fn term_matches_by_slug_or_name() {
        let term = term_m();
        assert!(term.matches_value("m"));
        assert!(term.matches_value("Medium"));
        assert!(!term.matches_value("medium"));
    }

    #[test]
    fn stock_at_threshold_is_out_of_stock() {
        let term = term_m();
        assert!(!variation(Some(2), "m").is_in_stock_for("pa_size", &term, 2));
        assert!(variation(Some(3), "m").is_in_stock_for("pa_size", &term, 2));
    }

    #[test]
    fn unmanaged_or_unknown_stock_is_excluded() {
        let term = term_m();
        let mut unmanaged = variation(Some(50), "m");
        unmanaged.manage_stock = false;
        assert!(!unmanaged.is_in_stock_for("pa_size", &term, 0));
        assert!(!variation(None, "m").is_in_stock_for("pa_size", &term, 0));
    }

    #[test]
    fn taxonomy_name_carries_attribute_prefix() {
        let taxonomy = AttributeTaxonomy {
            id: 1,
            name: "size".to_string(),
            label: "Size".to_string(),
        };
        assert_eq!(taxonomy.taxonomy_name(), "pa_size");
    }

    #[test]
    fn zero_variation_id_is_not_a_variation_line() {
        let item = OrderLineItem {
            product_id: ProductId(10),
            variation_id: Some(ProductId(0)),
            quantity: 1,
        };
        assert!(!item.is_variation());
    }
}

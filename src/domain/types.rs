//! Identifier newtypes shared across the catalog model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value
                    .trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|err| DomainError::validation(format!("invalid {} `{value}`: {err}", $entity)))
            }
        }
    };
}

numeric_id!(
    /// Identifier of a catalog entry or one of its variations.
    ProductId,
    "product id"
);
numeric_id!(
    /// Identifier of an attribute term.
    TermId,
    "term id"
);
numeric_id!(OrderId, "order id");

/// Prefix the host uses for taxonomies backing global product attributes.
pub const ATTRIBUTE_TAXONOMY_PREFIX: &str = "pa_";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_with_surrounding_whitespace() {
        assert_eq!(" 42 ".parse::<ProductId>().expect("valid id"), ProductId(42));
        assert_eq!("7".parse::<TermId>().expect("valid id"), TermId(7));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = "abc".parse::<OrderId>().expect_err("should reject");
        assert!(err.to_string().contains("order id"));
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&vec![ProductId(10), ProductId(11)]).expect("serialize");
        assert_eq!(json, "[10,11]");
    }
}

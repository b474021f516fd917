//! Catalog domain types.

pub mod entities;
pub mod error;
pub mod types;

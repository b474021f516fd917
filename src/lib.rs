//! In-stock filtering for layered navigation.
//!
//! A product listed under a selected attribute term is kept only when at least
//! one of its variations carrying that term is in stock. Results are cached per
//! term and dropped whenever stock or product attributes change.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

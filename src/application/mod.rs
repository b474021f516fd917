//! Application services: the layered nav filter, stock invalidation and wiring.

pub mod error;
pub mod invalidation;
pub mod layered_nav;
pub mod lifecycle;
pub mod pagination;
pub mod repos;
pub mod wiring;

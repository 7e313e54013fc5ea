//! Core business logic, independent of the HTTP layer.

pub mod category;
pub mod dashboard;
pub mod order;
pub mod pricing;
pub mod product;
pub mod seed;
pub mod status;
pub mod user;

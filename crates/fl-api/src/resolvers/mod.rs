//! GraphQL resolvers, grouped by domain.
//!
//! Each resolver is a thin `#[Object]` method that delegates to a function
//! returning [`ApiResult`](crate::error::ApiResult) and converts the error at
//! the boundary with `.extend()`.

pub mod accounts;
pub mod arrivals;
pub mod directory;
pub mod maps;
pub mod servants;
pub mod services;

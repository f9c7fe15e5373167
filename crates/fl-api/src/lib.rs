//! fl-api: GraphQL API for the FL church admin portal.
//!
//! Resolvers check the caller's JWT roles, apply the business rules from
//! `fl-core`, write through `fl-graph`, and reach identity, notification and
//! payment providers through the traits in [`external`].

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod external;
pub mod http;
pub mod resolvers;
pub mod schema;
pub mod types;
pub mod workflow;

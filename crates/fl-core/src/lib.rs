//! fl-core: Shared types, business rules, and configuration for the FL admin backend.
//!
//! This crate provides the foundations used by the graph layer and the API:
//! - Church hierarchy levels, servant kinds, and role claims
//! - The permission table and the declarative servant configuration
//! - Business rules for services, banking, arrivals, and council accounts
//! - History log sentences
//! - Configuration loading and the common error type

pub mod accounts;
pub mod arrivals;
pub mod banking;
pub mod churches;
pub mod config;
pub mod error;
pub mod history;
pub mod members;
pub mod permissions;
pub mod servants;
pub mod services;
pub mod types;

pub use error::{FlError, Result};
pub use types::{Amount, ChurchId, ChurchLevel, MemberId, RecordId, Role, ServantKind};

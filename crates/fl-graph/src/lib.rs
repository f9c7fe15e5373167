//! FL Graph: Neo4j client for the church graph.
//!
//! This crate is the single access point for the Neo4j database. Every
//! Cypher template lives here, grouped by domain, so that invariants such as
//! one leader per unit and one `CURRENT_HISTORY` edge per entity are kept by
//! the same code paths.

pub mod accounts;
pub mod arrivals;
pub mod banking;
pub mod client;
pub mod directory;
pub mod history;
pub mod maps;
pub mod records;
pub mod servants;
pub mod services;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use records::{
    BussingRow, ChurchRecord, ChurchRef, HistoryRecord, MemberRecord, NearbyFellowship, ServiceRecordRow,
    TransactionRecord, VehicleRow,
};

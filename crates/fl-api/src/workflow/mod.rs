//! Multi-step operations that span the graph and external collaborators.

pub mod servants;

pub use servants::{ServantOutcome, ServantRequest, ServantStore, ServantWorkflow};

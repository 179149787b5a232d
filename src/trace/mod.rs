//! Trace document loading and data model.
//!
//! Handles reading the raw nested simulation trace and exposing it
//! as an order-preserving in-memory document.

pub mod loader;
pub mod schema;

// Re-export main types and functions
pub use loader::load_trace;
pub use schema::{NodeSample, RawTrace};

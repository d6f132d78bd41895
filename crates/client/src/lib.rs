//! Client code for folio.
//!
//! This crate provides the outbound HTTP pipeline, link extraction from
//! content bodies, and the broken-link repairer built on both.

pub mod fetch;
pub mod links;
pub mod repair;

pub use fetch::{FetchClient, FetchConfig, FetchResponse};
pub use links::LinkPattern;
pub use repair::{App, LinkOutcome, LinkProbe, LinkRepairer, RepairReport};

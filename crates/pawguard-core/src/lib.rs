//! Core types, store traits, and service objects for PawGuard.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement the traits in [`store`]; the API and server crates compose the
//! services in [`registry`] and [`desk`] around a concrete backend.

pub mod animal;
pub mod desk;
pub mod error;
pub mod hash;
pub mod ids;
pub mod identification;
pub mod lifecycle;
pub mod matching;
pub mod registry;
pub mod report;
pub mod store;
pub mod submission;

pub use error::{Error, Result};

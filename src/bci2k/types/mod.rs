//! Foundational data structures, error types, and the decoder contract.

pub mod decoder;
pub mod error;
pub mod models;

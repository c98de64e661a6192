//! Shared domain types for Forgehand.
//!
//! Everything that crosses a crate boundary lives here: the configuration
//! tree, the shared error type, the provider-agnostic conversation model,
//! the parsed webhook event, and the structured outcome of an agent run.

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod outcome;

pub use error::{Error, Result};

//! # brewlink-core
//!
//! Core crate for the BrewLink session core. Contains configuration
//! schemas, typed identifiers, the receipt status event model with its
//! outcome classifier, and the unified error system.
//!
//! This crate has **no** internal dependencies on other BrewLink crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

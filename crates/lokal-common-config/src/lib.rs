//! Configuration types for Lokal.
//!
//! This crate provides [`LocalizationConfig`], the settings a host hands to
//! the localisation facade, plus environment overlays and validation.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;

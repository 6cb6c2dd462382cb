//! # Configuration Abstractions
//!
//! Layered configuration loading shared by ApiHost crates.

pub mod loader;
pub mod traits;

pub use loader::*;
pub use traits::*;

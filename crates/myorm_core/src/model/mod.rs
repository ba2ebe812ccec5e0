//! Entity registration model.
//!
//! # Responsibility
//! - Define the closed value set exchanged with executors.
//! - Define the explicit per-type descriptors replacing runtime reflection.

pub mod schema;
pub mod value;

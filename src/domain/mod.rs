//! Domain layer types and invariants.

pub mod error;
pub mod lenient;
pub mod pattern;
pub mod planning;
pub mod records;
pub mod staging;

//! Application services: the planning workflow and its backend seam.

pub mod backend;
pub mod batch;
pub mod error;
pub mod planning;

//! smart-erp: an offline-first gateway for the foundry ERP frontend and the
//! production planning workflow behind it.

pub mod application;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod infra;
mod util;

pub use smart_erp_api_types as api_types;

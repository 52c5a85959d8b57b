//! Shared HTTP and runtime plumbing for Tidings services.

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod task;
pub mod tracing;

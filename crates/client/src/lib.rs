//! PerfOps Client - HTTP access to the PerfOps API

mod client;
mod runner;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use runner::KindRunner;

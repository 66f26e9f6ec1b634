//! HTTP API module.
//!
//! This module provides the HTTP server, the request/response types and the
//! log broadcaster shared with the conversion pipeline.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server};
pub use types::*;
pub use logs::*;

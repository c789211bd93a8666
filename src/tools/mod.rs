//! MHM Tools module
//!
//! Tool implementations behind the MCP surface.

pub mod auth;
pub mod reports;
pub mod status;

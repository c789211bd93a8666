//! MCP surface

mod server;

pub use server::MhmService;

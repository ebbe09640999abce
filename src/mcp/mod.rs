//! MCP (Model Context Protocol) module
//!
//! The tool catalog and dispatcher, plus the stdio JSON-RPC server that
//! exposes them to a host.

pub mod server;
pub mod tools;
pub mod types;

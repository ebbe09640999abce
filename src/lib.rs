//! Gmail Assistant MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing a small set of Gmail tools:
//! listing unread mail, drafting threaded replies, and the OAuth code and
//! refresh-token exchanges needed to obtain access tokens.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{GmailMcpError, Result};

//! Gmail API module
//!
//! Contains types, OAuth helpers, MIME/reply logic, and the client for the Gmail API.

pub mod auth;
pub mod client;
pub mod http;
pub mod mime;
pub mod reply;
pub mod types;
pub mod utils;

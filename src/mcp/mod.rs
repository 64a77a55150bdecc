//! MCP (Model Context Protocol) Server Implementation
//!
//! This module provides a complete MCP server implementation following the
//! JSON-RPC 2.0 and MCP protocol version 2025-06-18, exposing
//! the expense store as tools.

pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod validation;


pub use errors::{ErrorHandler, McpError};
pub use protocol::*;
pub use server::{ConnectionState, McpServer, MessageHandler, ResourceHandler, ToolHandler};
pub use validation::McpValidator;

//! MCP (Model Context Protocol) module
//!
//! Implements the MCP server protocol for tool registration and invocation.

pub mod property;
pub mod registry;
pub mod server;
pub mod tool;
pub mod types;

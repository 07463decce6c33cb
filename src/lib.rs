//! Device MCP Server Library
//!
//! A Model Context Protocol (MCP) server that exposes device capabilities
//! as tools for a remote LLM controller. Provides the tool registry,
//! schema validation, paginated listing, and serialized execution on a
//! single device context.

pub mod board;
pub mod config;
pub mod error;
pub mod executor;
pub mod mcp;
pub mod settings;
pub mod transport;

pub use config::Config;
pub use error::{DeviceMcpError, Result};

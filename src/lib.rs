//! mcpforge turns OpenAPI documents and public API catalog entries into
//! ready-to-run MCP proxy servers.
//!
//! The pipeline runs in one direction: [`ingest`] loads documents,
//! [`conversion`] normalizes them into a [`domain::ServerConfig`],
//! [`generation`] renders that config into server source, and [`harness`]
//! exercises the configured endpoints against the live upstream API.

pub mod conversion;
pub mod core;
pub mod domain;
pub mod generation;
pub mod harness;
pub mod ingest;

pub use crate::core::{Error, Result};

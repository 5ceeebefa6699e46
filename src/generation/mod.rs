//! Code generation: turns a [`ServerConfig`](crate::domain::ServerConfig)
//! into the source of a Node.js/Express proxy server.
//!
//! Output is pure string templating. Each configuration flag gates its own
//! block, so a generated server only carries the features it was configured
//! with.

pub mod auth;
pub mod endpoints;
pub mod renderer;
pub mod sanitizers;
pub mod templates;
pub mod validation;

pub use renderer::{GeneratedServer, ServerGenerator};

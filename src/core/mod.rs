//! Core building blocks shared across the pipeline: errors, settings and
//! identifier casing helpers.

pub mod error;
pub mod settings;
pub mod utils;

pub use error::{Error, Result};
pub use settings::Settings;

//! oflagsgen Core
//!
//! Shared types, error handling and configuration for the oflagsgen
//! fdflags generator.

pub mod config;
pub mod error;
pub mod target;
pub mod types;

pub use config::{Encoding, GeneratorConfig, OutputFormat, OutputStyle};
pub use error::{Error, Result};
pub use target::Architecture;
pub use types::*;

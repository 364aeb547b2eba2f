//! oflagsgen Codegen
//!
//! Filters flag macros out of a compiler's macro dump and renders them as
//! `constexpr` definitions for an fdflags class.
//!
//! ## Modules
//!
//! - `extract` - Flag line matching and value resolution
//! - `template` - Preamble and definition rendering
//! - `generator` - The compiler-to-text pipeline

pub mod extract;
pub mod generator;
pub mod template;

pub use extract::{extract_flags, FlagMatcher};
pub use generator::Generator;
pub use template::{Template, CUT_LINE};

//! oflagsgen Preprocessor
//!
//! Everything between the host compiler and a resolved macro value.
//!
//! ## Modules
//!
//! - `toolchain` - Running the compiler in dump-macros mode
//! - `dump` - Parsing `#define` lines into a macro table
//! - `lexer` - Preprocessing tokens and stringification
//! - `expand` - Object-like and function-like macro expansion

pub mod dump;
pub mod expand;
pub mod lexer;
pub mod toolchain;

pub use dump::{DefineParser, DumpError, MacroTable};
pub use expand::{ExpandError, Expander};
pub use lexer::{render, stringify, tokenize, Token, TokenKind};
pub use toolchain::{decode, DumpOptions, MacroDump, Toolchain, ToolchainError};

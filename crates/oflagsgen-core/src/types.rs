//! Core type definitions

use serde::{Deserialize, Serialize};

/// A macro definition as reported by a compiler's macro dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    /// Macro name
    pub name: String,
    /// Parameter names, present only for function-like macros
    pub params: Option<Vec<String>>,
    /// Whether the last parameter collects variadic arguments
    pub variadic: bool,
    /// Replacement list, as written
    pub body: String,
}

impl MacroDefinition {
    /// Create an object-like macro
    pub fn object(name: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            params: None,
            variadic: false,
            body: body.to_string(),
        }
    }

    /// Create a function-like macro
    pub fn function(name: &str, params: &[&str], variadic: bool, body: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Some(params.iter().map(|p| p.to_string()).collect()),
            variadic,
            body: body.to_string(),
        }
    }

    /// Parse a `NAME[=VALUE]` command-line definition.
    ///
    /// A bare name is defined to `1`, matching `-DNAME`.
    pub fn from_define_arg(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((name, value)) => Self::object(name.trim(), value),
            None => Self::object(arg.trim(), "1"),
        }
    }

    /// Whether this macro takes arguments
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Convert to a compiler `-D` argument
    pub fn to_compiler_arg(&self) -> String {
        format!("-D{}={}", self.name, self.body)
    }
}

/// One generated fdflags constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagConstant {
    /// Original macro name (e.g. `O_RDONLY`)
    pub macro_name: String,
    /// Generated member name (e.g. `rdonly`)
    pub member: String,
    /// Replacement list as it appeared in the dump
    pub definition: String,
    /// Fully expanded replacement list
    pub value: String,
}

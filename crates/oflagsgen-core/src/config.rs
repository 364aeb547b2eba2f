//! Configuration types

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::Error;
use crate::target::Architecture;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// How the value inside a generated initializer is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// `{"04000"}`: the expanded value as a string literal
    #[default]
    Stringified,
    /// `{strfry(O_NONBLOCK)}`: left for a downstream preprocessor pass
    Deferred,
    /// `{04000}`: the expanded value itself
    Expanded,
}

/// Shape of the generator's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Preamble, sentinel and one source line per flag
    #[default]
    Text,
    /// JSON array of flag records
    Json,
}

/// Decoding applied to the compiler's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Every byte maps to the code point of the same value
    #[default]
    Latin1,
    /// Strict UTF-8; invalid sequences are an error
    Utf8,
}

macro_rules! impl_from_str {
    ($ty:ty, $field:literal, { $($text:pat => $variant:expr),+ $(,)? }) => {
        impl std::str::FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    _ => Err(ConfigError::InvalidValue {
                        field: $field,
                        value: s.to_string(),
                    }
                    .into()),
                }
            }
        }
    };
}

impl_from_str!(OutputStyle, "style", {
    "stringified" => OutputStyle::Stringified,
    "deferred" => OutputStyle::Deferred,
    "expanded" => OutputStyle::Expanded,
});

impl_from_str!(OutputFormat, "format", {
    "text" => OutputFormat::Text,
    "json" => OutputFormat::Json,
});

impl_from_str!(Encoding, "encoding", {
    "latin1" | "iso8859-1" | "iso-8859-1" => Encoding::Latin1,
    "utf8" | "utf-8" => Encoding::Utf8,
});

/// Generator configuration
///
/// Every field has a default; an empty file and no file at all produce the
/// same output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Compiler frontend to run in dump-macros mode
    pub compiler: String,

    /// Source language passed to `-x`
    pub language: String,

    /// Headers included by the probe translation unit, in order
    pub headers: Vec<String>,

    /// Extra definitions (`NAME` or `NAME=VALUE`)
    pub defines: Vec<String>,

    /// Extra include directories
    pub include_dirs: Vec<PathBuf>,

    /// Additional compiler arguments
    pub extra_args: Vec<String>,

    /// Cross target, for compilers that accept `--target`
    pub target: Option<Architecture>,

    /// Prefix identifying flag macros
    pub flag_prefix: String,

    /// Class whose static members are defined
    pub class_name: String,

    /// Name of the outer stringification helper
    pub stringify_helper: String,

    /// Name of the inner stringification helper
    pub indirect_helper: String,

    /// Initializer style
    pub style: OutputStyle,

    /// Output shape
    pub format: OutputFormat,

    /// Compiler output decoding
    pub encoding: Encoding,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            compiler: "gcc".into(),
            language: "c++".into(),
            headers: vec![
                "sys/types.h".into(),
                "sys/stat.h".into(),
                "fcntl.h".into(),
            ],
            defines: Vec::new(),
            include_dirs: Vec::new(),
            extra_args: Vec::new(),
            target: None,
            flag_prefix: "O_".into(),
            class_name: "fdflags".into(),
            stringify_helper: "strfry".into(),
            indirect_helper: "strfry2".into(),
            style: OutputStyle::default(),
            format: OutputFormat::default(),
            encoding: Encoding::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a YAML or JSON file.
    ///
    /// Files ending in `.json` are read as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            serde_json::from_str(&content)?
        } else if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// The probe translation unit: one `#include` line per header
    pub fn translation_unit(&self) -> String {
        self.headers
            .iter()
            .map(|h| format!("#include <{}>\n", h))
            .collect()
    }

    /// Check that every name that ends up in generated source is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let identifiers = [
            ("flag_prefix", &self.flag_prefix),
            ("class_name", &self.class_name),
            ("stringify_helper", &self.stringify_helper),
            ("indirect_helper", &self.indirect_helper),
        ];
        for (field, value) in identifiers {
            if !is_identifier(value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    value: value.clone(),
                });
            }
        }

        if self.stringify_helper == self.indirect_helper {
            return Err(ConfigError::InvalidValue {
                field: "indirect_helper",
                value: self.indirect_helper.clone(),
            });
        }

        if self.compiler.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "compiler",
                value: self.compiler.clone(),
            });
        }

        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

//! Compiler Toolchain Integration
//!
//! Runs the host compiler in dump-macros mode (`-dM -E`) over a probe
//! translation unit fed on stdin and captures every macro it reports.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

use oflagsgen_core::{Architecture, Encoding, GeneratorConfig, MacroDefinition};

/// Errors that can occur while running the compiler
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Compiler not found: {0}")]
    CompilerNotFound(String),

    #[error("Compiler exited with status {code}: {stderr}")]
    CompilerFailed { code: i32, stderr: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Compiler output is not valid UTF-8 at byte {offset}")]
    Decode { offset: usize },
}

impl From<ToolchainError> for oflagsgen_core::Error {
    fn from(err: ToolchainError) -> Self {
        match err {
            ToolchainError::CompilerNotFound(name) => Self::CompilerNotFound(name),
            ToolchainError::CompilerFailed { code, stderr } => Self::CompilerFailed { code, stderr },
            ToolchainError::IoError(e) => Self::Io(e),
            e @ ToolchainError::Decode { .. } => Self::Decode(e.to_string()),
        }
    }
}

/// Options for a macro dump
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Source language (`-x`)
    pub language: String,
    /// Cross target
    pub target: Option<Architecture>,
    /// Macro definitions (-D flags)
    pub defines: Vec<MacroDefinition>,
    /// Include paths (-I flags)
    pub include_dirs: Vec<PathBuf>,
    /// Additional compiler arguments
    pub extra_args: Vec<String>,
    /// Output decoding
    pub encoding: Encoding,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            language: "c++".to_string(),
            target: None,
            defines: Vec::new(),
            include_dirs: Vec::new(),
            extra_args: Vec::new(),
            encoding: Encoding::Latin1,
        }
    }
}

impl DumpOptions {
    /// Derive dump options from generator configuration
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            language: config.language.clone(),
            target: config.target,
            defines: config
                .defines
                .iter()
                .map(|d| MacroDefinition::from_define_arg(d))
                .collect(),
            include_dirs: config.include_dirs.clone(),
            extra_args: config.extra_args.clone(),
            encoding: config.encoding,
        }
    }
}

/// Captured output of a macro dump
#[derive(Debug)]
pub struct MacroDump {
    /// Decoded `#define` lines, in the order the compiler printed them
    pub text: String,
    /// Warnings the compiler printed on stderr
    pub warnings: Vec<String>,
}

impl MacroDump {
    /// Iterate over the dump's lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Compiler frontend wrapper
pub struct Toolchain {
    /// Path or name of the compiler executable
    compiler: PathBuf,
}

impl Toolchain {
    /// Create a toolchain with a specific compiler
    pub fn with_path(compiler: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
        }
    }

    /// Preprocess `source` in dump-macros mode and capture the result.
    ///
    /// Blocks until the compiler exits; nothing is returned on failure.
    pub fn dump_macros(
        &self,
        source: &str,
        options: &DumpOptions,
    ) -> Result<MacroDump, ToolchainError> {
        let args = self.build_args(options);
        debug!("Running {:?} with args: {:?}", self.compiler, args);

        let mut child = Command::new(&self.compiler)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ToolchainError::CompilerNotFound(self.compiler.display().to_string())
                }
                _ => ToolchainError::IoError(e),
            })?;

        // A compiler that rejects its arguments exits without reading
        // stdin; its status takes precedence over the failed write.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(source.as_bytes()),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(ToolchainError::CompilerFailed {
                code: exit_code(output.status),
                stderr,
            });
        }
        written?;

        let text = decode(&output.stdout, options.encoding)?;
        let warnings = parse_warnings(&stderr);
        for warning in &warnings {
            warn!("{}", warning);
        }
        debug!("Compiler reported {} lines", text.lines().count());

        Ok(MacroDump { text, warnings })
    }

    /// Build compiler command line arguments
    fn build_args(&self, options: &DumpOptions) -> Vec<String> {
        let mut args = vec![
            "-dM".to_string(), // Dump macro definitions
            "-E".to_string(),  // Preprocess only
            "-x".to_string(),
            options.language.clone(),
        ];

        if let Some(target) = options.target {
            args.push(target.to_compiler_arg());
        }

        for macro_def in &options.defines {
            args.push(macro_def.to_compiler_arg());
        }

        for include in &options.include_dirs {
            args.push(format!("-I{}", include.display()));
        }

        args.extend(options.extra_args.iter().cloned());

        // Read the translation unit from stdin
        args.push("-".to_string());

        args
    }
}

/// Decode compiler output
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, ToolchainError> {
    match encoding {
        Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| ToolchainError::Decode {
            offset: e.utf8_error().valid_up_to(),
        }),
    }
}

/// Parse warnings from stderr
fn parse_warnings(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter(|line| line.contains("warning:"))
        .map(|s| s.to_string())
        .collect()
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

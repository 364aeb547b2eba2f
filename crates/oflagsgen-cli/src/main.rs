//! gen-fdflags
//!
//! Prints `constexpr` fdflags definitions for the host platform's `O_*`
//! macros, as reported by the compiler's preprocessor.

use anyhow::{Context, Result};
use clap::Parser;
use oflagsgen_codegen::Generator;
use oflagsgen_core::{Architecture, Encoding, GeneratorConfig, OutputFormat, OutputStyle};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gen-fdflags")]
#[command(author, version, about = "Generate fdflags definitions from the compiler's O_* macros", long_about = None)]
struct Cli {
    /// Configuration file (YAML, or JSON if it ends in .json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Compiler frontend to run
    #[arg(long, value_name = "PROG")]
    compiler: Option<String>,

    /// Cross target (clang only)
    #[arg(long, value_name = "ARCH")]
    target: Option<Architecture>,

    /// Extra macro definition passed to the compiler
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Extra include directory passed to the compiler
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Header to include instead of the defaults (repeatable)
    #[arg(long = "header", value_name = "HEADER")]
    headers: Vec<String>,

    /// Class whose members are defined
    #[arg(long = "class", value_name = "NAME")]
    class_name: Option<String>,

    /// Macro prefix that marks a flag
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Initializer style (stringified, deferred, expanded)
    #[arg(long)]
    style: Option<OutputStyle>,

    /// Output format (text, json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Compiler output decoding (latin1, utf8)
    #[arg(long)]
    encoding: Option<Encoding>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Log to stderr; stdout carries the generated source.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let output = cli.output.clone();
    let config = build_config(cli)?;
    debug!("Effective configuration: {:?}", config);

    let generator = Generator::new(config).context("Invalid configuration")?;
    let text = generator.generate().with_context(|| {
        format!(
            "Failed to collect flag macros with {}",
            generator.config().compiler
        )
    })?;

    if let Some(path) = output {
        std::fs::write(&path, &text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Output written to: {}", path.display());
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
    }

    Ok(())
}

/// Merge the config file (if any) with command-line overrides
fn build_config(cli: Cli) -> Result<GeneratorConfig> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    if let Some(compiler) = cli.compiler {
        config.compiler = compiler;
    }
    if cli.target.is_some() {
        config.target = cli.target;
    }
    config.defines.extend(cli.defines);
    config.include_dirs.extend(cli.include_dirs);
    if !cli.headers.is_empty() {
        config.headers = cli.headers;
    }
    if let Some(class_name) = cli.class_name {
        config.class_name = class_name;
    }
    if let Some(prefix) = cli.prefix {
        config.flag_prefix = prefix;
    }
    if let Some(style) = cli.style {
        config.style = style;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(encoding) = cli.encoding {
        config.encoding = encoding;
    }

    Ok(config)
}

/// Exit status for a failed run: a failing compiler's own status, else 1
fn exit_code_for(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<oflagsgen_core::Error>()
        .map_or(1, oflagsgen_core::Error::exit_code);
    u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
}

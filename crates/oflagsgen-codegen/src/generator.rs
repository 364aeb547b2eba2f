//! End-to-end generation: compiler dump in, fdflags source out.

use tracing::{debug, info};

use oflagsgen_core::{FlagConstant, GeneratorConfig, OutputFormat, Result};
use oflagsgen_preprocessor::{DumpOptions, Toolchain};

use crate::extract::{extract_flags, FlagMatcher};
use crate::template::Template;

/// Runs one generation
pub struct Generator {
    config: GeneratorConfig,
    toolchain: Toolchain,
    matcher: FlagMatcher,
    template: Template,
}

impl Generator {
    /// Create a generator. The configuration is validated here.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let toolchain = Toolchain::with_path(&config.compiler);
        let matcher = FlagMatcher::new(&config.flag_prefix)?;
        let template = Template::from_config(&config);
        Ok(Self {
            config,
            toolchain,
            matcher,
            template,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Ask the compiler for its macros and resolve the flag macros.
    pub fn collect(&self) -> Result<Vec<FlagConstant>> {
        let source = self.config.translation_unit();
        let options = DumpOptions::from_config(&self.config);
        debug!("Probe translation unit:\n{}", source);

        let dump = self.toolchain.dump_macros(&source, &options)?;
        self.extract(&dump.text)
    }

    /// Resolve the flag macros of an already captured dump.
    pub fn extract(&self, dump: &str) -> Result<Vec<FlagConstant>> {
        extract_flags(dump, &self.matcher)
    }

    /// Format flags in the configured output format
    pub fn render(&self, flags: &[FlagConstant]) -> Result<String> {
        match self.config.format {
            OutputFormat::Text => Ok(self.template.render(flags)),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(flags)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    /// Run the compiler and produce the complete output.
    pub fn generate(&self) -> Result<String> {
        info!("Collecting flag macros with {}", self.config.compiler);
        let flags = self.collect()?;
        self.render(&flags)
    }
}

//! Target architectures
//!
//! Selecting a target lets a cross-capable compiler (clang) report another
//! platform's flag values.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported target architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86_64,
    I386,
    Arm64,
    Arm,
    Riscv64,
    Riscv32,
    Mips,
    PowerPC,
}

impl Architecture {
    /// Get the Clang target triple for this architecture
    pub fn target_triple(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64-linux-gnu",
            Architecture::I386 => "i386-linux-gnu",
            Architecture::Arm64 => "aarch64-linux-gnu",
            Architecture::Arm => "arm-linux-gnueabi",
            Architecture::Riscv64 => "riscv64-linux-gnu",
            Architecture::Riscv32 => "riscv32-linux-gnu",
            Architecture::Mips => "mips-linux-gnu",
            Architecture::PowerPC => "powerpc64-linux-gnu",
        }
    }

    /// Compiler argument selecting this target
    pub fn to_compiler_arg(&self) -> String {
        format!("--target={}", self.target_triple())
    }
}

impl std::str::FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Architecture::X86_64),
            "i386" | "i686" | "x86" => Ok(Architecture::I386),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "arm" | "arm32" => Ok(Architecture::Arm),
            "riscv64" => Ok(Architecture::Riscv64),
            "riscv32" | "riscv" => Ok(Architecture::Riscv32),
            "mips" => Ok(Architecture::Mips),
            "powerpc" | "ppc64" => Ok(Architecture::PowerPC),
            _ => Err(Error::Config(format!("unknown architecture: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("amd64".parse::<Architecture>().unwrap(), Architecture::X86_64);
        assert_eq!("AArch64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert!("sparc".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_compiler_arg() {
        assert_eq!(
            Architecture::Arm64.to_compiler_arg(),
            "--target=aarch64-linux-gnu"
        );
    }
}

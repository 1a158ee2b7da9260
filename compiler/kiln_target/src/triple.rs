//! Target triple parsing.
//!
//! Triples follow `<arch>-<vendor>-<os>[-<env>]`:
//! - `x86_64-unknown-linux-gnu` - 64-bit Linux with glibc
//! - `aarch64-apple-darwin` - ARM64 macOS
//! - `wasm32-unknown-unknown` - standalone WebAssembly

use std::fmt;

use crate::TargetError;

/// Triples the lowering engine has a complete descriptor for.
pub const SUPPORTED_TARGETS: &[&str] = &[
    // x86
    "x86_64-unknown-linux-gnu",
    "x86_64-unknown-linux-musl",
    "x86_64-apple-darwin",
    "x86_64-pc-windows-msvc",
    "x86_64-pc-windows-gnu",
    "i686-unknown-linux-gnu",
    // ARM
    "aarch64-unknown-linux-gnu",
    "aarch64-unknown-linux-musl",
    "aarch64-apple-darwin",
    "arm-unknown-linux-gnueabihf",
    // RISC-V
    "riscv64gc-unknown-linux-gnu",
    "riscv32imac-unknown-none-elf",
    // WebAssembly
    "wasm32-unknown-unknown",
    "wasm32-wasi",
    "wasm64-unknown-unknown",
    // Others (generic C ABI fallback)
    "mips-unknown-linux-gnu",
    "mipsel-unknown-linux-gnu",
    "powerpc64le-unknown-linux-gnu",
];

/// Parsed components of a target triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTripleComponents {
    /// CPU architecture, including any ISA suffix (e.g. `riscv64gc`).
    pub arch: String,
    /// Hardware vendor (e.g. `unknown`, `apple`, `pc`).
    pub vendor: String,
    /// Operating system (e.g. `linux`, `darwin`, `windows`, `wasi`).
    pub os: String,
    /// Environment/ABI (e.g. `gnu`, `musl`, `msvc`).
    pub env: Option<String>,
}

impl TargetTripleComponents {
    /// Parse a target triple string into components.
    ///
    /// `wasm32-wasi` is the one accepted two-component form; its vendor is
    /// `unknown`.
    pub fn parse(triple: &str) -> Result<Self, TargetError> {
        let parts: Vec<&str> = triple.split('-').collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(TargetError::InvalidTripleFormat {
                triple: triple.to_string(),
                reason: "empty component".to_string(),
            });
        }

        match parts.as_slice() {
            [arch, os] if arch.starts_with("wasm") => Ok(Self {
                arch: (*arch).to_string(),
                vendor: "unknown".to_string(),
                os: (*os).to_string(),
                env: None,
            }),
            [arch, vendor, os, rest @ ..] if rest.len() <= 1 => Ok(Self {
                arch: (*arch).to_string(),
                vendor: (*vendor).to_string(),
                os: (*os).to_string(),
                env: rest.first().map(|s| (*s).to_string()),
            }),
            _ => Err(TargetError::InvalidTripleFormat {
                triple: triple.to_string(),
                reason: "expected <arch>-<vendor>-<os>[-<env>]".to_string(),
            }),
        }
    }
}

impl fmt::Display for TargetTripleComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch, self.vendor, self.os)?;
        if let Some(env) = &self.env {
            write!(f, "-{env}")?;
        }
        Ok(())
    }
}

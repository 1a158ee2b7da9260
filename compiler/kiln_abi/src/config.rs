//! Lowering configuration.
//!
//! Debug builds check every lowered type against the frontend's layout by
//! default. Both switches can be forced from the environment:
//!
//! - `KILN_STRICT_LAYOUT=1`: cross-check lowered layouts in release builds
//! - `KILN_ERROR_TRACING=1`: pass an error-trace pointer to internal
//!   functions that can fail

/// Options that change what the engine emits or checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LowerConfig {
    /// Compare every lowered type's layout with `Pool::abi_layout`.
    pub strict_checks: bool,
    /// Pass a hidden error-trace pointer to fallible internal functions.
    pub error_tracing: bool,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self {
            strict_checks: cfg!(debug_assertions),
            error_tracing: false,
        }
    }
}

impl LowerConfig {
    #[must_use]
    pub fn with_strict_checks(mut self, on: bool) -> Self {
        self.strict_checks = on;
        self
    }

    #[must_use]
    pub fn with_error_tracing(mut self, on: bool) -> Self {
        self.error_tracing = on;
        self
    }

    /// The default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(on) = env_flag("KILN_STRICT_LAYOUT") {
            config.strict_checks = on;
        }
        if let Some(on) = env_flag("KILN_ERROR_TRACING") {
            config.error_tracing = on;
        }
        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

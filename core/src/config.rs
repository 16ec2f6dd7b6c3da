//! Decoding configuration.

/// How decoding reacts to malformed input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Any record failure or checksum mismatch aborts the decode
    Strict,
    /// Failures are recorded and decoding continues with what is left
    #[default]
    BestEffort,
}

/// Options threaded through every decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Failure policy
    pub mode: DecodeMode,
    /// Compute and check table checksums
    pub verify_checksums: bool,
}

impl DecodeConfig {
    /// Best-effort decoding with checksum verification
    pub const fn new() -> Self {
        Self {
            mode: DecodeMode::BestEffort,
            verify_checksums: true,
        }
    }

    /// Strict decoding with checksum verification
    pub const fn strict() -> Self {
        Self {
            mode: DecodeMode::Strict,
            verify_checksums: true,
        }
    }

    /// Best-effort decoding with checksum verification
    pub const fn best_effort() -> Self {
        Self::new()
    }

    /// Enable or disable checksum verification
    pub const fn with_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Check whether failures abort decoding
    #[inline]
    pub const fn is_strict(&self) -> bool {
        matches!(self.mode, DecodeMode::Strict)
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-family decoding context
///
/// Families that need more than the configuration (for instance the
/// structure version) wrap a [`DecodeConfig`] and implement this trait.
pub trait DecodeContext {
    /// The active configuration
    fn config(&self) -> &DecodeConfig;
}

impl DecodeContext for DecodeConfig {
    fn config(&self) -> &DecodeConfig {
        self
    }
}

//! Configuration primitives for the transfer engine.

use core::num::NonZeroU32;

/// Largest burst the BMI2 sensor API is told it may request in one call.
pub const DEFAULT_MAX_TRANSFER_LEN: usize = 46;

/// Upper bound on [`Config::max_transfer_len`]; the BMI270 configuration blob is 8 KiB.
pub const MAX_TRANSFER_LEN_LIMIT: usize = 8192;

/// User-facing configuration for the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Longest payload accepted by a single `read` or `write`.
    pub max_transfer_len: usize,
    /// Consecutive wake-ups without a byte moving before a transaction is declared stalled.
    ///
    /// `None` waits forever.
    pub wake_budget: Option<NonZeroU32>,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration is usable.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.max_transfer_len == 0 {
            return Err(ConfigError::ZeroTransferLength);
        }

        if self.max_transfer_len > MAX_TRANSFER_LEN_LIMIT {
            return Err(ConfigError::TransferLengthTooLarge);
        }

        Ok(())
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Overrides the maximum payload length.
    pub fn max_transfer_len(mut self, len: usize) -> Self {
        self.config.max_transfer_len = len;
        self
    }

    /// Bounds the number of consecutive wake-ups without progress.
    pub fn wake_budget(mut self, wakes: NonZeroU32) -> Self {
        self.config.wake_budget = Some(wakes);
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_transfer_len: DEFAULT_MAX_TRANSFER_LEN,
            wake_budget: None,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A zero-byte maximum would reject every transfer.
    ZeroTransferLength,
    /// The maximum exceeds [`MAX_TRANSFER_LEN_LIMIT`].
    TransferLengthTooLarge,
}

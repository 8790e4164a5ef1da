//! Error types for the synchronization core
//!
//! Synchronization itself never fails: starvation, overflow and staleness
//! are reported through `Option` results and counters in [`SyncStats`].
//! Errors only come out of configuration handling and the output pump.
//!
//! [`SyncStats`]: crate::SyncStats

/// Result type alias using the sync [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or wiring up a synchronizer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("Config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(String),

    /// Operation requires a running synchronizer
    #[error("Synchronizer is stopped")]
    Stopped,

    /// Downstream consumer went away
    #[error("Output channel closed")]
    ChannelClosed,
}

impl Error {
    /// Check if this error came from configuration handling
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_) | Error::ConfigIo(_) | Error::ConfigParse(_)
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

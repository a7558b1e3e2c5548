//! Error types and handling for the Paradecast application

use thiserror::Error;

/// Main error type for the Paradecast application
#[derive(Error, Debug)]
pub enum ParadecastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Query settings rejected before any derivation ran
    #[error("Invalid settings: {reason}")]
    InvalidSettings { reason: String },

    /// A query was run before any location was selected
    #[error("No location selected")]
    NoLocationSelected,

    /// Weather provider fetch failure (recoverable, retry is safe)
    #[error("Weather provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// Export encoding failure (not fatal to the session)
    #[error("Export encoding failed: {message}")]
    EncodeFailure { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ParadecastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid-settings error
    pub fn invalid_settings<S: Into<String>>(reason: S) -> Self {
        Self::InvalidSettings {
            reason: reason.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(message: S) -> Self {
        Self::EncodeFailure {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ParadecastError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            ParadecastError::InvalidSettings { reason } => {
                format!("Invalid settings: {reason}")
            }
            ParadecastError::NoLocationSelected => {
                "Select a location on the map before running a query.".to_string()
            }
            ParadecastError::ProviderUnavailable { .. } => {
                "Unable to reach the weather service. Please try again.".to_string()
            }
            ParadecastError::EncodeFailure { .. } => {
                "Export failed. Your query results are still available.".to_string()
            }
            ParadecastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }

    /// Whether retrying the same operation can reasonably succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ParadecastError::ProviderUnavailable { .. } | ParadecastError::EncodeFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = ParadecastError::config("missing base url");
        assert!(matches!(config_err, ParadecastError::Config { .. }));

        let settings_err = ParadecastError::invalid_settings("both data sources disabled");
        assert!(matches!(
            settings_err,
            ParadecastError::InvalidSettings { .. }
        ));

        let provider_err = ParadecastError::provider("connection refused");
        assert!(matches!(
            provider_err,
            ParadecastError::ProviderUnavailable { .. }
        ));
    }

    #[test]
    fn test_user_messages() {
        let settings_err = ParadecastError::invalid_settings("wind threshold out of range");
        assert!(
            settings_err
                .user_message()
                .contains("wind threshold out of range")
        );

        let provider_err = ParadecastError::provider("timeout");
        assert!(provider_err.user_message().contains("weather service"));

        assert!(
            ParadecastError::NoLocationSelected
                .user_message()
                .contains("location")
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(ParadecastError::provider("timeout").is_recoverable());
        assert!(ParadecastError::encode("renderer failed").is_recoverable());
        assert!(!ParadecastError::NoLocationSelected.is_recoverable());
        assert!(!ParadecastError::config("bad port").is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ParadecastError = io_err.into();
        assert!(matches!(err, ParadecastError::Io { .. }));
    }
}

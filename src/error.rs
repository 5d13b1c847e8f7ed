//! Error types and handling for Tibber Future Prices
//!
//! Every fallible library operation returns [`Result`]. The two failures the
//! integration itself recognises are a duplicate setup
//! ([`PriceError::AlreadyConfigured`]) and a refresh that yielded no prices
//! ([`PriceError::NoPriceData`]); everything else is a lower-level fault that
//! is reported upward unchanged.

use thiserror::Error;

/// Result type alias for Tibber Future Prices operations
pub type Result<T> = std::result::Result<T, PriceError>;

/// Main error type for Tibber Future Prices
#[derive(Debug, Error)]
pub enum PriceError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Transport-level failures talking to the provider
    #[error("Network error: {message}")]
    Network { message: String },

    /// The provider answered, but with an error or an unusable payload
    #[error("API error: {message}")]
    Api { message: String },

    /// Missing or rejected access token
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// A configuration entry with this unique id already exists
    #[error("Already configured: {unique_id}")]
    AlreadyConfigured { unique_id: String },

    /// The provider returned no price data for a home
    #[error("No price data received for home {home_id}")]
    NoPriceData { home_id: String },

    /// First refresh of a configuration entry failed; setup should be retried
    #[error("Entry not ready: {message}")]
    NotReady { message: String },

    /// A price timestamp could not be parsed
    #[error("Invalid timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },
}

impl PriceError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn already_configured<S: Into<String>>(unique_id: S) -> Self {
        Self::AlreadyConfigured {
            unique_id: unique_id.into(),
        }
    }

    pub fn no_price_data<S: Into<String>>(home_id: S) -> Self {
        Self::NoPriceData {
            home_id: home_id.into(),
        }
    }

    pub fn not_ready<S: Into<String>>(message: S) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PriceError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PriceError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PriceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PriceError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

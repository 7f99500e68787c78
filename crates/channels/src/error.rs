use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across channel traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport is not connected, or connecting failed.
    #[error("channel not connected: {message}")]
    Connectivity { message: String },

    /// A protocol deadline (pairing, handshake) expired.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// A destination address could not be parsed.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A peer sent a frame that could not be understood.
    #[error("malformed frame from peer: {message}")]
    MalformedFrame { message: String },

    /// The transport rejected an outbound message.
    #[error("failed to deliver message: {context}: {source}")]
    Delivery {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The session was revoked by the platform; re-pairing is required.
    #[error("session logged out: {message}")]
    LoggedOut { message: String },

    /// Configuration cannot produce a working channel.
    #[error("invalid channel config: {message}")]
    InvalidConfig { message: String },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn connectivity(message: impl std::fmt::Display) -> Self {
        Self::Connectivity {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn invalid_address(address: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn malformed_frame(message: impl std::fmt::Display) -> Self {
        Self::MalformedFrame {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn delivery(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Delivery {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn logged_out(message: impl std::fmt::Display) -> Self {
        Self::LoggedOut {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl std::fmt::Display) -> Self {
        Self::InvalidConfig {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether this error means "not connected" rather than a rejected payload.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

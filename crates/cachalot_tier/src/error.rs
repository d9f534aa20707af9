// Copyright (c) The Cachalot Project Authors.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::sync::Arc;

/// A boxed error shared between every caller waiting on the same operation.
///
/// Coalesced computations broadcast their outcome to all attached waiters, so
/// failure causes are held behind an `Arc` to keep [`Error`] cloneable.
pub type SharedCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// An error from a cache operation.
///
/// The taxonomy is deliberately small. Only [`Error::Computation`] normally
/// reaches request handlers; the façade swallows remote-tier failures
/// (degrading to a miss) and decode failures (recomputing) internally.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The remote cache could not be reached or timed out.
    ///
    /// The façade treats this as a cache miss and never propagates it, except
    /// from `flush_db` where silently failing would defeat the purpose.
    #[error("remote cache unavailable: {cause}")]
    RemoteUnavailable {
        /// The underlying transport failure.
        cause: SharedCause,
    },

    /// A stored payload could not be decoded into the expected shape.
    ///
    /// Treated as a miss: a previously-written malformed value must not
    /// permanently poison its key.
    #[error("cached payload could not be decoded: {cause}")]
    Serialization {
        /// The underlying decode failure.
        cause: SharedCause,
    },

    /// The caller-supplied compute function failed.
    ///
    /// This is the only error surfaced to the original request path. Every
    /// waiter coalesced onto the failed computation receives a clone.
    #[error("computation failed: {cause}")]
    Computation {
        /// The compute function's own error. Recover the concrete type with
        /// [`Error::source_as`].
        cause: SharedCause,
    },

    /// The caller supplied an empty or malformed key.
    ///
    /// A programmer error; reported synchronously before either tier is
    /// touched.
    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// What made the key invalid.
        reason: &'static str,
    },
}

impl Error {
    /// Wraps a remote-tier transport failure.
    pub fn remote_unavailable(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::RemoteUnavailable { cause: Arc::new(cause) }
    }

    /// Wraps a payload decode failure.
    pub fn serialization(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Serialization { cause: Arc::new(cause) }
    }

    /// Wraps a failure from a caller-supplied compute function.
    pub fn computation(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Computation { cause: Arc::new(cause) }
    }

    /// Attempts to recover the original failure as a concrete type.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachalot_tier::Error;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    /// let error = Error::computation(io);
    /// assert!(error.source_as::<std::io::Error>().is_some());
    /// ```
    #[must_use]
    pub fn source_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::RemoteUnavailable { cause } | Self::Serialization { cause } | Self::Computation { cause } => {
                cause.downcast_ref::<E>()
            }
            Self::InvalidKey { .. } => None,
        }
    }

    /// Returns `true` if this error represents remote-tier unavailability.
    #[must_use]
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. })
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Validates a caller-supplied cache key.
///
/// Keys are opaque namespaced strings (`"tokenProperties:<identifier>"`); the
/// cache only insists that they are non-empty and free of whitespace and
/// control characters, which would break the remote store's text protocol.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] for an empty key or one containing
/// whitespace/control characters.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey {
            key: String::new(),
            reason: "key must not be empty",
        });
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "key must not contain whitespace or control characters",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_cause_message() {
        let error = Error::remote_unavailable(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"));
        assert!(format!("{error}").contains("refused"));
    }

    #[test]
    fn source_as_recovers_concrete_type() {
        let error = Error::computation(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow upstream"));
        let io = error.source_as::<std::io::Error>().expect("should downcast");
        assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
        assert!(error.source_as::<std::fmt::Error>().is_none());
    }

    #[test]
    fn cloned_error_shares_cause() {
        let error = Error::computation(std::fmt::Error);
        let clone = error.clone();
        assert!(clone.source_as::<std::fmt::Error>().is_some());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(validate_key(""), Err(Error::InvalidKey { .. })));
    }

    #[test]
    fn key_with_whitespace_is_rejected() {
        assert!(validate_key("token properties:x").is_err());
        assert!(validate_key("key\n").is_err());
    }

    #[test]
    fn namespaced_key_is_accepted() {
        assert!(validate_key("tokenProperties:TOKEN-abcdef").is_ok());
    }
}

//! Registry error types.

use thiserror::Error;

/// Errors returned by a [`MetadataClient`](super::MetadataClient) lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The package or version does not exist in the registry.
    #[error("{name}@{version} not found in registry")]
    NotFound { name: String, version: String },

    /// The registry refused the request because of a quota.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
        /// Request quota for the current window, when advertised.
        limit: Option<u64>,
        /// Requests left in the current window, when advertised.
        remaining: Option<u64>,
    },

    /// Transport failure talking to the registry.
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The caller's deadline elapsed before the registry answered.
    #[error("lookup of {key} timed out after {after_secs}s")]
    Timeout { key: String, after_secs: u64 },

    /// Registry API returned an unexpected non-success status code.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("cannot parse response from {url}: {message}")]
    Parse { url: String, message: String },
}

impl RegistryError {
    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        RegistryError::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn parse(url: &str, message: impl Into<String>) -> Self {
        RegistryError::Parse {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(name: &str, version: &str) -> Self {
        RegistryError::NotFound {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Whether repeating the same request later may succeed.
    ///
    /// Not-found and parse failures need an upstream change first.
    pub fn is_retriable(&self) -> bool {
        match self {
            RegistryError::RateLimited { .. }
            | RegistryError::Network { .. }
            | RegistryError::Timeout { .. } => true,
            RegistryError::Api { status, .. } => *status >= 500,
            RegistryError::NotFound { .. } | RegistryError::Parse { .. } => false,
        }
    }

    /// Suggested back-off before retrying, for rate-limited lookups.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            RegistryError::RateLimited {
                retry_after_secs, ..
            } => Some(std::time::Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(!RegistryError::not_found("a", "1").is_retriable());
        assert!(!RegistryError::parse("http://x", "bad json").is_retriable());
        assert!(RegistryError::Timeout {
            key: "a@1".into(),
            after_secs: 5
        }
        .is_retriable());
        assert!(RegistryError::Api {
            status: 503,
            message: String::new()
        }
        .is_retriable());
        assert!(!RegistryError::Api {
            status: 400,
            message: String::new()
        }
        .is_retriable());
    }

    #[test]
    fn test_rate_limited_carries_retry_hint() {
        let err = RegistryError::RateLimited {
            retry_after_secs: 30,
            limit: Some(60),
            remaining: Some(0),
        };
        assert!(err.is_retriable());
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(30)));
        assert_eq!(err.to_string(), "rate limited, retry after 30s");
    }
}

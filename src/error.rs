//! Error types for zonegate.

use thiserror::Error;

/// Infrastructural faults.
///
/// These are the unexpected failures (store I/O, key material problems,
/// bad configuration) that callers map to 5xx responses. Expected outcomes
/// such as rejected credentials or field validation failures are values,
/// not errors; see [`crate::auth::AuthenticationOutcome`] and
/// [`crate::validation::ValidationError`].
#[derive(Debug, Error)]
pub enum Error {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Principal store failure during access-key lookup.
    #[error("principal store error: {0}")]
    PrincipalStore(String),

    /// Zone store failure.
    #[error("zone store error: {0}")]
    ZoneStore(String),

    /// Encryption or decryption of key material failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Crypto("bad key length".to_string());
        assert_eq!(err.to_string(), "crypto error: bad key length");

        let err = Error::Config("auth.crypto.key is not base64".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: auth.crypto.key is not base64"
        );
    }
}

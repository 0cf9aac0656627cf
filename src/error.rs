use thiserror::Error;

/// Errors raised while reading configuration from a property store.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("configuration key '{key}' expects a {expected} value")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("unknown voice policy '{0}'")]
    UnknownPolicy(String),
}

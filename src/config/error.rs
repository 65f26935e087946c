//! Errors raised while reading or checking `pagebuilder.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed config file")]
    Toml(#[from] toml::de::Error),

    /// A setting that parses but cannot be used (bad extension, overlapping roots).
    #[error("invalid setting {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_names_file_and_keeps_cause() {
        let err = ConfigError::Io(
            PathBuf::from("site/pagebuilder.toml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "cannot read config file `site/pagebuilder.toml`");
        assert_eq!(err.source().unwrap().to_string(), "denied");
    }

    #[test]
    fn test_toml_error_keeps_cause() {
        let toml_err = toml::from_str::<toml::Table>("[build").unwrap_err();
        let err = ConfigError::from(toml_err);
        assert_eq!(err.to_string(), "malformed config file");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_validation_message() {
        let err = ConfigError::Validation("[build.extension] must start with '.'".into());
        assert_eq!(err.to_string(), "invalid setting [build.extension] must start with '.'");
    }
}

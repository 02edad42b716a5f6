use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    #[error("Failed to initialise logging: {0}")]
    LoggingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn load_error_names_no_particular_source() {
        let err = ConfigError::from(config::ConfigError::Message("bad value".to_string()));
        assert_eq!(err.to_string(), "Failed to load configuration");
        assert_eq!(err.source().unwrap().to_string(), "bad value");
    }
}

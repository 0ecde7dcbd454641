use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read {}: {error}", .path.display())]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse {}: {error}", .path.display())]
    Parse { path: PathBuf, error: String },

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Unresolved references: {}", join_errors(.0))]
    References(Vec<ConfigError>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_errors_listed() {
        let err = ConfigError::References(vec![
            ConfigError::EnvVarNotFound("A".into()),
            ConfigError::EnvVarNotFound("B".into()),
        ]);
        assert_eq!(
            err.to_string(),
            "Unresolved references: Environment variable not found: A; Environment variable not found: B"
        );
    }
}

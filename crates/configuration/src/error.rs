use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings (file or KALDOR__* environment): {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

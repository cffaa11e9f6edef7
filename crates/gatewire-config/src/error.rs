use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Stack file not found. Looked in:\n\
        - current directory: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl\n\
        - the ./.gatewire/ directory\n\
        - ~/.config/gatewire/stack.kdl\n\
        Set GATEWIRE_CONFIG_PATH to point at a file directly"
    )]
    StackFileNotFound,

    #[error("GATEWIRE_CONFIG_PATH points at a missing file: {0}")]
    ConfiguredPathMissing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

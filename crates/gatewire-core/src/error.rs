use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(String),

    #[error("No machine image configured for region '{region}' (configured regions: {available})")]
    UnsupportedRegion { region: String, available: String },

    #[error("Resource '{0}' is declared more than once")]
    DuplicateResource(String),

    #[error("Resource '{0}' references itself")]
    SelfReference(String),

    #[error("Resource '{resource}' references '{reference}', which has not been declared before it")]
    UnresolvedReference { resource: String, reference: String },

    #[error("Output '{0}' is declared more than once")]
    DuplicateOutput(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Stack failed validation:\n{0}")]
    Invalid(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;

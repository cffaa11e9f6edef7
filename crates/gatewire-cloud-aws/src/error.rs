//! AWS provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found. Please install AWS CLI v2: https://aws.amazon.com/cli/")]
    AwsCliNotFound,

    #[error("AWS authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("EC2 API error: {0}")]
    Ec2(String),

    #[error("Unexpected aws output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] gatewire_cloud::CloudError),
}

impl From<AwsError> for gatewire_cloud::CloudError {
    fn from(err: AwsError) -> Self {
        use gatewire_cloud::CloudError;
        match err {
            AwsError::CloudError(e) => e,
            AwsError::AuthenticationFailed(msg) => CloudError::AuthenticationFailed(msg),
            AwsError::CommandFailed(msg) => CloudError::CommandFailed(msg),
            AwsError::IoError(e) => CloudError::Io(e),
            AwsError::JsonError(e) => CloudError::Json(e),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

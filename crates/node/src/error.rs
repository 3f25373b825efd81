//! Errors of ringlet-node.
//!
//! Every variant carries a stable numeric code. The hundreds digit names the
//! category: 1xx ring protocol, 2xx network, 3xx files and config, 4xx runtime.

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Core error: {0}")]
    CoreError(#[from] ringlet_core::Error),
    #[error("Invalid peer address: {0}")]
    InvalidAddress(String),
    #[error("Bind listener failed: {0}")]
    BindFailed(String),
    #[error("HTTP server error: {0}")]
    ServeFailed(String),
    #[error("HTTP client error: {0}")]
    HttpClientError(String),
    #[error("Create File Error: {0}")]
    CreateFileError(String),
    #[error("Open File Error: {0}")]
    OpenFileError(String),
    #[error("Cannot find home directory")]
    HomeDirError,
    #[error("Cannot find parent directory")]
    ParentDirError,
    #[error("Serde yaml error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error),
    #[error("Serde json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Acquire lock failed")]
    Lock,
    #[error("Processor is already listening")]
    AlreadyListening,
}

impl Error {
    pub fn code(&self) -> u32 {
        match self {
            Error::CoreError(_) => 100,
            Error::InvalidAddress(_) => 200,
            Error::BindFailed(_) => 201,
            Error::ServeFailed(_) => 202,
            Error::HttpClientError(_) => 203,
            Error::CreateFileError(_) => 300,
            Error::OpenFileError(_) => 301,
            Error::HomeDirError => 302,
            Error::ParentDirError => 303,
            Error::SerdeYamlError(_) => 304,
            Error::SerdeJsonError(_) => 305,
            Error::InvalidConfig(_) => 306,
            Error::Lock => 400,
            Error::AlreadyListening => 401,
        }
    }
}

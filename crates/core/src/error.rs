use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid page window config: {0}")]
    InvalidWindowConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("access token unavailable: {0}")]
    AuthToken(String),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid response from {service}: {details}")]
    BackendResponse { service: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),

    #[error("operation not finished yet: {0}")]
    NotReady(String),
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("streamer not found")]
    StreamerNotFound,
    #[error("api error: {0}")]
    ApiError(String),
    #[error("validation error: {0}")]
    ValidationError(String),
}

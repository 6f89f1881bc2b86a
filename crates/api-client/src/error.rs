use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to deserialize API response: {0}")]
    Deserialization(String),

    #[error("Exchange returned invalid data: {0}")]
    InvalidData(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Analytics calculation error: {0}")]
    Calculation(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WfoError {
    #[error("Market data error: {0}")]
    Api(#[from] api_client::error::ApiError),

    #[error("Window construction failed: {0}")]
    Window(#[from] core_types::CoreError),

    #[error("Optimizer error during in-sample search: {0}")]
    Optimizer(#[from] optimizer::OptimizerError),

    #[error("Backtester error during out-of-sample validation: {0}")]
    Backtester(#[from] backtester::error::BacktestError),

    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<indicatif::style::TemplateError> for WfoError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        WfoError::ProgressBarTemplate(error.to_string())
    }
}

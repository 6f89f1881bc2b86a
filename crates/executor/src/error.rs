use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Insufficient cash: required {required}, available {available}")]
    InsufficientCash { required: String, available: String },

    #[error("Cannot close {requested} units; position holds {available}")]
    InvalidClosingQuantity { requested: String, available: String },

    #[error("Portfolio error: {0}")]
    PortfolioError(String),
}

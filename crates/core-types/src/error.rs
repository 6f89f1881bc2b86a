use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Window '{0}' is empty")]
    EmptyWindow(String),

    #[error("Window '{0}' is not chronologically ordered at bar {1}")]
    UnorderedWindow(String, usize),
}

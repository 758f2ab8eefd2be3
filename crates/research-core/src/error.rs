use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("cannot summarize an evaluation without episodes")]
    EmptyEvaluation,
    #[error("the number of evaluation episodes must be positive")]
    NoEpisodes,
    #[error("only discrete action spaces are supported, got {0}")]
    UnsupportedActionSpace(String),
}

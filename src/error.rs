use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}

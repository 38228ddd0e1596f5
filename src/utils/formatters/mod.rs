pub mod export;
pub mod json;
pub mod text;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unable to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unable to render export line, {0} is empty")]
    MissingField(&'static str),
}

pub type Result = std::result::Result<(), Error>;

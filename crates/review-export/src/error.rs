use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Review not found: {0}")]
    NotFound(String),

    #[error("No suitable comments could be found for {0}")]
    NoMatchingComments(String),

    #[error("Could not process archive file")]
    ExternalToolFailure { output: String },

    #[error("Source is not a PDF path: {0}")]
    InvalidSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

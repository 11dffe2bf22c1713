use reloc_core::FrameError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelocError {
    #[error("only {valid} pixels have a valid feature but {required} are required")]
    InsufficientData { valid: usize, required: usize },
    #[error("no pose candidate could be generated")]
    NoPoseFound,
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
}

#[derive(thiserror::Error, Debug)]
pub enum FilterError {
    #[error("{filter}: frame of {width}x{height} is too small")]
    FrameTooSmall {
        filter: &'static str,
        width: u32,
        height: u32,
    },
    #[error("{filter}: failed to rebuild image buffer")]
    Buffer { filter: &'static str },
    #[error("{filter}: inference failed: {message}")]
    Inference {
        filter: &'static str,
        message: String,
    },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ChainError {
    #[error("filter \"{label}\" is not in the active chain")]
    NotFound { label: &'static str },
}

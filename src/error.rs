pub type WipeResult<T> = Result<T, WipeError>;

#[derive(thiserror::Error, Debug)]
pub enum WipeError {
    #[error("unknown wipe direction '{0}'")]
    InvalidDirection(String),

    #[error("unknown image fit mode '{0}'")]
    InvalidMode(String),

    #[error("unknown unit '{unit}' in scroll length '{raw}'")]
    InvalidUnit { raw: String, unit: String },

    #[error("invalid scroll length '{0}'")]
    InvalidLength(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WipeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

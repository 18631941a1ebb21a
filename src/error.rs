use crate::column::ViewKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("overflow: {0}")]
    Overflow(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported reinterpretation from {from} to {to}")]
    UnsupportedReinterpretation { from: ViewKind, to: ViewKind },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid column: {0}")]
    InvalidColumn(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt data: {0}")]
    Corrupt(&'static str),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("task failed: {0:#}")]
    Task(anyhow::Error),
}

impl Error {
    pub(crate) fn overflow(msg: impl Into<String>) -> Self {
        Error::Overflow(msg.into())
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

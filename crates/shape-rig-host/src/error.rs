use derive_more::{Display, From};
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, From, Display)]
pub enum Error {
    #[from(skip)]
    #[display("invalid configuration: {_0}")]
    InvalidConfig(String),
    #[from(skip)]
    #[display("invalid depth recording: {_0}")]
    InvalidRecording(String),

    // External
    #[display("{_0}")]
    Io(io::Error),
    #[display("{_0}")]
    SerdeJson(serde_json::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::SerdeJson(err) => Some(err),
            _ => None,
        }
    }
}

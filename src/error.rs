use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CabacError {
    #[error("bit source exhausted")]
    StreamExhausted,
    #[error("corrupt stream: illegal initial codIOffset {offset}")]
    CorruptStream { offset: u16 },
    #[error("corrupt slice data: {0}")]
    CorruptData(String),
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("neighbour query failed: {0}")]
    CollaboratorFailure(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("trace line {line}: {message}")]
    Trace { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, CabacError>;

macro_rules! protocol_violation {
    ($($arg:tt)*) => {
        $crate::error::CabacError::ProtocolViolation(format!($($arg)*))
    };
}
pub(crate) use protocol_violation;

macro_rules! corrupt_data {
    ($($arg:tt)*) => {
        $crate::error::CabacError::CorruptData(format!($($arg)*))
    };
}
pub(crate) use corrupt_data;

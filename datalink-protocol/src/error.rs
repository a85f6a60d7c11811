#[derive(Debug, thiserror::Error)]
pub enum DataLinkError {
    #[error("frame too short: expected {expected}, actual {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("invalid sync: expected {expected:?}, actual {actual:?}")]
    InvalidSync {
        expected: &'static str,
        actual: [u8; 2],
    },

    #[error("invalid header length: {0}")]
    InvalidHeaderLength(usize),

    #[error("empty header")]
    EmptyHeader,

    #[error("header too long: {len} bytes (max {max})")]
    HeaderTooLong { len: usize, max: usize },

    #[error("header is not ASCII text")]
    NonAsciiHeader,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, DataLinkError>;

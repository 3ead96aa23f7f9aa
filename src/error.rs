use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no capability set reported for card:{card} device:{device}")]
    DeviceUnavailable { card: i32, device: i32 },

    #[error("failed to open PCM device: {0}")]
    DeviceOpenFailed(String),

    #[error("buffer allocation of {0} bytes failed")]
    AllocationFailed(usize),

    #[error("transport I/O error: {0}")]
    Transport(String),

    #[error("operation not supported")]
    Unsupported,
}

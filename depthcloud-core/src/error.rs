use thiserror::Error;

use crate::SdkError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no depth camera connected")]
    NoDevice,
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error("failed to get capture from device")]
    CaptureFailed,
    #[error("unexpected {what} image: {reason}")]
    UnexpectedImage { what: &'static str, reason: String },
}

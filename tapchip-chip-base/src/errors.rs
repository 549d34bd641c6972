use thiserror::Error;

/// Errors shared by every applet client built on [`AppExt`](crate::AppExt).
///
/// `Status` carries the raw status word so callers can log and match the
/// exact chip diagnosis; it is never collapsed into a generic failure.
#[derive(Debug, Error)]
pub enum ChipAppError<E: std::error::Error> {
    /// Non-success status word with its table description
    #[error("chip status {0:#06x}: {1}")]
    Status(u16, String),

    /// Status word outside the known table
    #[error("chip status {0:#06x}: unrecognized status word")]
    UnknownStatus(u16),

    /// Error from the underlying transport
    #[error("transport error: {0}")]
    Transport(#[from] E),

    /// Success status but an empty payload where a signature was required
    #[error("chip returned success but no signature payload")]
    NoSignature,

    /// Response payload shorter than the fixed layout requires
    #[error("response too short: {got} bytes (expected at least {expected})")]
    ResponseTooShort { got: usize, expected: usize },

    /// Empty body passed to a chunked write
    #[error("refusing to write an empty body")]
    InvalidEmptyBody,

    /// Body too large for the on-tag file
    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },
}

impl<E: std::error::Error> ChipAppError<E> {
    /// Raw status word, if this error carries one.
    pub fn status_word(&self) -> Option<u16> {
        match self {
            ChipAppError::Status(word, _) | ChipAppError::UnknownStatus(word) => Some(*word),
            _ => None,
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PcscTransportError {
    /// No contactless reader attached
    #[error("no PC/SC reader found")]
    ReaderNotFound,
    /// No tag present in the reader field
    #[error("no tag present in the reader field")]
    TagNotPresent,
    /// Communication error
    #[error("tag communication error `{0}`")]
    Comm(&'static str),
    /// PC/SC service error
    #[error("PC/SC error")]
    Pcsc(#[from] pcsc::Error),
    /// Response framing error
    #[error("tag response was too short")]
    ResponseTooShort,
}

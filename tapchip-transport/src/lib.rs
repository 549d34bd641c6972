use std::ops::Deref;

pub use async_trait::async_trait;
pub use tapchip_apdu::{ApduAnswer, ApduCommand, ApduErrorCode};

/// Use to talk to the secure-element tag
#[async_trait]
pub trait Exchange {
    /// Error defined by Transport used
    type Error;

    /// The concrete type containing the ApduAnswer
    type AnswerType: Deref<Target = [u8]> + Send;

    /// Send a command with the given transport and retrieve an answer or a transport error
    async fn exchange<I>(
        &self,
        command: &ApduCommand<I>,
    ) -> Result<ApduAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync;
}

mod errors;

use std::ffi::{CString, CStr};
use std::ops::Deref;
use std::sync::Mutex;

pub use errors::PcscTransportError;
pub use pcsc;
use pcsc::{Card, Context, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};
use log::info;
use tapchip_transport::{async_trait, ApduAnswer, ApduCommand, Exchange};

/// A contactless tag attached through a PC/SC reader.
///
/// The card handle is behind a mutex: tag I/O is strictly sequential, one
/// command must complete before the next is issued.
pub struct TransportPcsc {
    card: Mutex<Card>,
}

impl TransportPcsc {
    /// Establish a PC/SC context in user scope.
    pub fn establish_context() -> Result<Context, PcscTransportError> {
        Ok(Context::establish(Scope::User)?)
    }

    /// List attached reader names.
    pub fn list_readers(ctx: &Context) -> Result<Vec<CString>, PcscTransportError> {
        let mut buf = [0u8; 2048];
        let readers = ctx.list_readers(&mut buf)?;
        Ok(readers.map(CStr::to_owned).collect())
    }

    /// Connect to the tag currently in the field of the given reader.
    pub fn open_reader(ctx: &Context, reader: &CStr) -> Result<Self, PcscTransportError> {
        let card = ctx
            .connect(reader, ShareMode::Shared, Protocols::ANY)
            .map_err(|e| match e {
                pcsc::Error::NoSmartcard => PcscTransportError::TagNotPresent,
                other => PcscTransportError::Pcsc(other),
            })?;

        Ok(TransportPcsc {
            card: Mutex::new(card),
        })
    }

    /// Connect through the first attached reader.
    pub fn new(ctx: &Context) -> Result<Self, PcscTransportError> {
        let readers = Self::list_readers(ctx)?;
        let first = readers.first().ok_or(PcscTransportError::ReaderNotFound)?;

        Self::open_reader(ctx, first)
    }

    pub fn exchange<I: Deref<Target = [u8]>>(
        &self,
        command: &ApduCommand<I>,
    ) -> Result<ApduAnswer<Vec<u8>>, PcscTransportError> {
        let card = self.card.lock().expect("PC/SC card poisoned");

        let raw = command.serialize();
        info!("[{:3}] => {:}", raw.len(), hex::encode(&raw));

        let mut recv_buf = [0u8; MAX_BUFFER_SIZE];
        let answer = card.transmit(&raw, &mut recv_buf)?;

        info!("[{:3}] <= {:}", answer.len(), hex::encode(answer));

        ApduAnswer::from_answer(answer.to_vec())
            .map_err(|_| PcscTransportError::ResponseTooShort)
    }
}

#[async_trait]
impl Exchange for TransportPcsc {
    type Error = PcscTransportError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &ApduCommand<I>,
    ) -> Result<ApduAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        self.exchange(command)
    }
}

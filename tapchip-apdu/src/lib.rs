#![cfg_attr(not(feature = "std"), no_std)]

//! APDU command/response framing for secure-element tags.
//!
//! This crate is the only layer that knows ISO 7816 wire framing: how a
//! command header, body and expected-length byte are serialized, and how a
//! response splits into a payload and a trailing status word. `0x9000` is
//! the only success word; everything else maps to a distinct
//! [`ApduErrorCode`] carrying the raw value.

#[cfg(not(feature = "std"))]
extern crate no_std_compat as std;

use core::ops::Deref;

use snafu::prelude::*;
#[cfg(not(feature = "std"))]
use std::prelude::v1::*;

/// An APDU command to be sent to the chip.
///
/// `data` is generic so callers can pass owned buffers or borrowed slices.
/// `le` is the optional expected response length; READ BINARY style
/// commands require it, most others omit it.
#[derive(Debug, Clone)]
pub struct ApduCommand<I>
where
    I: Deref<Target = [u8]>,
{
    /// Instruction class
    pub cla: u8,
    /// Instruction code
    pub ins: u8,
    /// First instruction parameter
    pub p1: u8,
    /// Second instruction parameter
    pub p2: u8,
    /// Command body, emitted with a leading Lc byte when non-empty
    pub data: I,
    /// Expected response length (Le), emitted last when present
    pub le: Option<u8>,
}

impl<I> ApduCommand<I>
where
    I: Deref<Target = [u8]>,
{
    /// Serialize the command to raw wire bytes:
    /// `CLA INS P1 P2 [Lc data] [Le]`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.data.len() + 1);
        out.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !self.data.is_empty() {
            out.push(self.data.len() as u8);
            out.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            out.push(le);
        }
        out
    }
}

/// Status words the chip is known to emit, per ISO 7816-4.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Snafu)]
#[repr(u16)]
pub enum ApduErrorCode {
    /// Success
    #[snafu(display("success"))]
    NoError = 0x9000,
    /// Wrong length (Lc/Le inconsistent with the command)
    #[snafu(display("wrong length"))]
    WrongLength = 0x6700,
    /// Security status not satisfied (e.g. missing authentication)
    #[snafu(display("security status not satisfied"))]
    SecurityStatusNotSatisfied = 0x6982,
    /// Conditions of use not satisfied
    #[snafu(display("conditions of use not satisfied"))]
    ConditionsNotSatisfied = 0x6985,
    /// Incorrect data field
    #[snafu(display("incorrect command data"))]
    IncorrectData = 0x6A80,
    /// Referenced applet or file not found
    #[snafu(display("applet or file not found"))]
    FileNotFound = 0x6A82,
    /// Not enough memory space in the file
    #[snafu(display("not enough memory space"))]
    NotEnoughMemory = 0x6A84,
    /// Incorrect P1/P2 parameters
    #[snafu(display("incorrect P1/P2"))]
    IncorrectP1P2 = 0x6A86,
    /// Wrong offset (outside the file body)
    #[snafu(display("offset outside file"))]
    WrongOffset = 0x6B00,
    /// Instruction not supported by the applet
    #[snafu(display("instruction not supported"))]
    InsNotSupported = 0x6D00,
    /// Class not supported
    #[snafu(display("class not supported"))]
    ClaNotSupported = 0x6E00,
    /// No precise diagnosis
    #[snafu(display("no precise diagnosis"))]
    Unknown = 0x6F00,
}

impl ApduErrorCode {
    /// Human-readable description of the status word.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl TryFrom<u16> for ApduErrorCode {
    type Error = u16;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        match word {
            0x9000 => Ok(Self::NoError),
            0x6700 => Ok(Self::WrongLength),
            0x6982 => Ok(Self::SecurityStatusNotSatisfied),
            0x6985 => Ok(Self::ConditionsNotSatisfied),
            0x6A80 => Ok(Self::IncorrectData),
            0x6A82 => Ok(Self::FileNotFound),
            0x6A84 => Ok(Self::NotEnoughMemory),
            0x6A86 => Ok(Self::IncorrectP1P2),
            0x6B00 => Ok(Self::WrongOffset),
            0x6D00 => Ok(Self::InsNotSupported),
            0x6E00 => Ok(Self::ClaNotSupported),
            0x6F00 => Ok(Self::Unknown),
            other => Err(other),
        }
    }
}

/// Error when a raw response cannot even be framed as an APDU answer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Snafu)]
pub enum ApduAnswerError {
    /// Response shorter than the 2-byte status word
    #[snafu(display("response too short to contain a status word"))]
    TooShort,
}

/// An APDU response: payload bytes followed by a 2-byte status word.
#[derive(Debug, Clone)]
pub struct ApduAnswer<B> {
    answer: B,
    retcode: u16,
}

impl<B> ApduAnswer<B>
where
    B: Deref<Target = [u8]>,
{
    /// Frame a raw response buffer. Fails if it cannot hold a status word.
    pub fn from_answer(answer: B) -> Result<Self, ApduAnswerError> {
        ensure!(answer.len() >= 2, TooShortSnafu);
        let retcode = u16::from_be_bytes([answer[answer.len() - 2], answer[answer.len() - 1]]);
        Ok(Self { answer, retcode })
    }

    /// Payload without the trailing status word.
    pub fn data(&self) -> &[u8] {
        &self.answer[..self.answer.len() - 2]
    }

    /// Raw status word.
    pub fn retcode(&self) -> u16 {
        self.retcode
    }

    /// Status word mapped to the known table; `Err` carries the raw word
    /// when it is not in the table.
    pub fn error_code(&self) -> Result<ApduErrorCode, u16> {
        ApduErrorCode::try_from(self.retcode)
    }
}

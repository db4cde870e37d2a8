//! Byte-at-a-time decoding of link layer frames.
//!
//! A [`Decoder`] owns everything it has parsed so far, so a frame may arrive
//! split over any number of reads. The first violation freezes the outcome;
//! the checksum is compared once, after the terminating `0x16` has been seen.

use thiserror::Error;

use crate::{
    Decode, END, FIXED_START, SINGLE_CONTROL_CHARACTER, VARIABLE_START,
    checksum::Checksum,
    control::Control,
    frame::{Frame, FrameBytes, FrameShape, UserData},
};

/// Smallest usable length octet: control, address and one user data byte.
pub const MIN_VARIABLE_LENGTH: u8 = 3;

/// Public outcome of a decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    NoError,
    /// Not a failure: feed more bytes and call again.
    NeedMoreData,
    BadFormat,
    CheckError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Length0,
    Length1,
    RepeatedStart,
    Control,
    Address,
    UserData,
    Checksum,
    End,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected start byte {0:#04x}")]
    UnexpectedStart(u8),
    #[error("length {0} leaves no room for user data")]
    LengthTooShort(u8),
    #[error("length octets differ: {first:#04x} then {second:#04x}")]
    LengthMismatch { first: u8, second: u8 },
    #[error("expected repeated start 0x68, found {0:#04x}")]
    MissingRepeatedStart(u8),
    #[error("expected end byte 0x16, found {0:#04x}")]
    MissingEnd(u8),
    #[error("checksum mismatch: calculated {calculated:#04x}, found {found:#04x}")]
    ChecksumMismatch { calculated: u8, found: u8 },
    #[error("frame incomplete after {found} bytes")]
    Incomplete { found: usize },
}

impl DecodeError {
    pub fn status(&self) -> ParseStatus {
        match self {
            DecodeError::ChecksumMismatch { .. } => ParseStatus::CheckError,
            DecodeError::Incomplete { .. } => ParseStatus::NeedMoreData,
            _ => ParseStatus::BadFormat,
        }
    }
}

/// Incremental frame decoder. One instance per frame; call [`Decoder::reset`]
/// to reuse it.
#[derive(Debug, Clone)]
pub struct Decoder {
    state: State,
    shape: FrameShape,
    control: u8,
    address: u8,
    length: [u8; 2],
    checksum: u8,
    user_data: UserData,
    raw: FrameBytes,
    /// Terminator seen, checksum not compared yet
    unverified: bool,
    result: Option<Result<(), DecodeError>>,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            state: State::Start,
            shape: FrameShape::Fixed,
            control: 0,
            address: 0,
            length: [0; 2],
            checksum: 0,
            user_data: UserData::new(),
            raw: FrameBytes::new(),
            unverified: false,
            result: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Decoder::new();
    }

    /// Feed `data`, resuming from wherever the previous call stopped.
    ///
    /// Bytes after the end of the frame are not consumed; [`Decoder::consumed`]
    /// tells how many were. Once the decoder is done further input is
    /// ignored and the frozen status is returned.
    pub fn decode(&mut self, data: &[u8]) -> ParseStatus {
        for &byte in data {
            if self.is_done() {
                break;
            }
            self.advance(byte);
        }
        if core::mem::take(&mut self.unverified) {
            self.result = Some(self.verify());
        }
        self.status()
    }

    pub fn push(&mut self, byte: u8) -> ParseStatus {
        self.decode(&[byte])
    }

    pub fn status(&self) -> ParseStatus {
        match self.result {
            None => ParseStatus::NeedMoreData,
            Some(Ok(())) => ParseStatus::NoError,
            Some(Err(e)) => e.status(),
        }
    }

    /// Why the frame was rejected, if it was.
    pub fn error(&self) -> Option<DecodeError> {
        match self.result {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Bytes consumed so far, including the one that ended the frame.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn consumed(&self) -> usize {
        self.raw.len()
    }

    /// The decoded frame, available only when the status is
    /// [`ParseStatus::NoError`].
    pub fn frame(&self) -> Option<Frame> {
        match self.result {
            Some(Ok(())) => Some(self.build_frame()),
            _ => None,
        }
    }

    /// Hand out the outcome of a finished frame and start over. `None` while
    /// more bytes are needed.
    pub fn take(&mut self) -> Option<Result<Frame, DecodeError>> {
        let outcome = match self.result? {
            Ok(()) => Ok(self.build_frame()),
            Err(e) => Err(e),
        };
        self.reset();
        Some(outcome)
    }

    fn build_frame(&self) -> Frame {
        match self.shape {
            FrameShape::SingleControlCharacter => Frame::single_control_character(),
            FrameShape::Fixed => Frame::fixed(Control::from(self.control), u16::from(self.address)),
            FrameShape::Variable => Frame::from_parts(
                Control::from(self.control),
                u16::from(self.address),
                self.user_data.clone(),
            ),
        }
    }

    fn advance(&mut self, byte: u8) {
        // The decoder stops at Done, which no frame reaches past MAX_FRAME_SIZE
        let _ = self.raw.push(byte);
        match self.step(byte) {
            Ok(State::Done) => {
                self.state = State::Done;
                if self.shape == FrameShape::SingleControlCharacter {
                    self.result = Some(Ok(()));
                } else {
                    self.unverified = true;
                }
            }
            Ok(next) => self.state = next,
            Err(e) => {
                log::debug!("rejecting frame after {} bytes: {}", self.raw.len(), e);
                self.state = State::Done;
                self.result = Some(Err(e));
            }
        }
    }

    /// Transition out of the current state on `byte`, recording any field
    /// the byte carries.
    fn step(&mut self, byte: u8) -> Result<State, DecodeError> {
        match self.state {
            State::Start => match byte {
                FIXED_START => {
                    self.shape = FrameShape::Fixed;
                    Ok(State::Control)
                }
                VARIABLE_START => {
                    self.shape = FrameShape::Variable;
                    Ok(State::Length0)
                }
                SINGLE_CONTROL_CHARACTER => {
                    self.shape = FrameShape::SingleControlCharacter;
                    Ok(State::Done)
                }
                other => Err(DecodeError::UnexpectedStart(other)),
            },
            State::Length0 => {
                if byte < MIN_VARIABLE_LENGTH {
                    return Err(DecodeError::LengthTooShort(byte));
                }
                self.length[0] = byte;
                Ok(State::Length1)
            }
            State::Length1 => {
                if byte != self.length[0] {
                    return Err(DecodeError::LengthMismatch {
                        first: self.length[0],
                        second: byte,
                    });
                }
                self.length[1] = byte;
                Ok(State::RepeatedStart)
            }
            State::RepeatedStart => match byte {
                VARIABLE_START => Ok(State::Control),
                other => Err(DecodeError::MissingRepeatedStart(other)),
            },
            State::Control => {
                self.control = byte;
                Ok(State::Address)
            }
            State::Address => {
                self.address = byte;
                match self.shape {
                    FrameShape::Variable => Ok(State::UserData),
                    _ => Ok(State::Checksum),
                }
            }
            State::UserData => {
                // length - 2 <= MAX_USER_DATA, so the push always fits
                let _ = self.user_data.push(byte);
                if self.user_data.len() == usize::from(self.length[0]) - 2 {
                    Ok(State::Checksum)
                } else {
                    Ok(State::UserData)
                }
            }
            State::Checksum => {
                self.checksum = byte;
                Ok(State::End)
            }
            State::End => match byte {
                END => Ok(State::Done),
                other => Err(DecodeError::MissingEnd(other)),
            },
            State::Done => Ok(State::Done),
        }
    }

    fn verify(&self) -> Result<(), DecodeError> {
        let calculated = Checksum::of(&[&[self.control, self.address][..], &self.user_data[..]]);
        if calculated != self.checksum {
            log::debug!(
                "checksum mismatch: calculated {:#04x}, found {:#04x}",
                calculated,
                self.checksum
            );
            return Err(DecodeError::ChecksumMismatch {
                calculated,
                found: self.checksum,
            });
        }
        log::trace!("decoded {:?} frame, control {:#04x}", self.shape, self.control);
        Ok(())
    }
}

impl<'a> Decode<'a> for Frame {
    type Error = DecodeError;

    /// Decode one frame from the start of `data`. Trailing bytes are ignored.
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let mut decoder = Decoder::new();
        decoder.decode(data);
        decoder
            .take()
            .unwrap_or(Err(DecodeError::Incomplete { found: data.len() }))
    }
}

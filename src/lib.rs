//! Link layer framing for IEC 60870-5-101 style master/slave lines.
//!
//! [`Frame`] models the three frame shapes (fixed, variable, single control
//! character) and encodes them; [`Decoder`] validates an inbound byte stream
//! one byte at a time. [`link`] adapts both to non-blocking serial traits.
#![cfg_attr(not(test), no_std)]

mod checksum;
mod control;
mod decoder;
mod frame;
pub mod link;

pub trait Encode {
    type Error;

    /// Write `self` into `buffer`, returning the number of bytes used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub trait Bytes<T>
where
    T: AsRef<[u8]>,
{
    fn bytes(&self) -> T;
}

/// First byte of a fixed frame.
pub const FIXED_START: u8 = 0x10;
/// First and fourth byte of a variable frame.
pub const VARIABLE_START: u8 = 0x68;
/// The whole of a single control character frame.
pub const SINGLE_CONTROL_CHARACTER: u8 = 0xE5;
pub const END: u8 = 0x16;

pub const FIXED_FRAME_SIZE: usize = 5;
/// The length octet counts control and address too, so 255 - 2
pub const MAX_USER_DATA: usize = u8::MAX as usize - 2;
/// Start: 1, Length: 2, Start: 1, Control: 1, Address: 1, Data: MAX_USER_DATA, Checksum: 1, End: 1
pub const MAX_FRAME_SIZE: usize = MAX_USER_DATA + 8;

pub use checksum::Checksum;
pub use control::{
    Acd, Control, Dfc, Dir, Fcb, Fcv, FunctionCodeError, Prm, SlaveFunction, StartupFunction,
};
pub use decoder::{DecodeError, Decoder, MIN_VARIABLE_LENGTH, ParseStatus, State};
pub use frame::{
    BROADCAST_ADDRESS, Frame, FrameBytes, FrameError, FrameShape, INVALID_ADDRESS, UserData,
};
pub use link::{FrameRecv, FrameRx, FrameSend, FrameTx, FrameTxRx, LinkError};

use bilge::prelude::*;
use thiserror::Error;

use crate::{
    Bytes, Encode, END, FIXED_FRAME_SIZE, FIXED_START, MAX_FRAME_SIZE, MAX_USER_DATA,
    SINGLE_CONTROL_CHARACTER, VARIABLE_START,
    checksum::Checksum,
    control::{Acd, Control, Dfc, Dir, Fcb, Fcv, FunctionCodeError, Prm, SlaveFunction, StartupFunction},
};

/// Reserved "unset" station address.
pub const INVALID_ADDRESS: u16 = 0x0000;
/// Address every slave on the line accepts.
pub const BROADCAST_ADDRESS: u16 = 0xFFFF;

/// User data carried by a variable frame.
pub type UserData = heapless::Vec<u8, MAX_USER_DATA>;

/// Encoded frame, as it goes onto the line.
pub type FrameBytes = heapless::Vec<u8, MAX_FRAME_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameShape {
    /// `10 C A CS 16`
    Fixed,
    /// `68 L L 68 C A data.. CS 16`
    Variable,
    /// `E5`
    SingleControlCharacter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("variable frame needs at least one user data byte")]
    EmptyUserData,
    #[error("user data of {found} bytes exceeds the {max} byte limit")]
    UserDataTooLong { max: usize, found: usize },
    #[error("encode buffer too small: need {expected} bytes, got {found}")]
    EncodeBufferTooSmall { expected: usize, found: usize },
}

/// One link layer frame.
///
/// The shape is derived: a frame carrying user data is variable, a frame
/// flagged as single control character is `E5`, anything else is fixed.
/// Constructors keep the flag and user data mutually exclusive.
///
/// Bits 4 and 5 of the control field mean different things depending on
/// PRM. Both readings are exposed (`fcb`/`acd`, `fcv`/`dfc`) over the same
/// bits; pick the pair matching [`Frame::prm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    control: Control,
    address: u16,
    user_data: UserData,
    single_control_character: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Frame::fixed(Control::from(0u8), INVALID_ADDRESS)
    }
}

impl Frame {
    pub fn fixed(control: Control, address: u16) -> Frame {
        Frame {
            control,
            address,
            user_data: UserData::new(),
            single_control_character: false,
        }
    }

    pub fn variable(control: Control, address: u16, user_data: &[u8]) -> Result<Frame, FrameError> {
        if user_data.is_empty() {
            return Err(FrameError::EmptyUserData);
        }
        let user_data = UserData::from_slice(user_data).map_err(|_| FrameError::UserDataTooLong {
            max: MAX_USER_DATA,
            found: user_data.len(),
        })?;
        Ok(Frame {
            control,
            address,
            user_data,
            single_control_character: false,
        })
    }

    /// Assembled by the decoder once the envelope has been validated.
    pub(crate) fn from_parts(control: Control, address: u16, user_data: UserData) -> Frame {
        Frame {
            control,
            address,
            user_data,
            single_control_character: false,
        }
    }

    /// Fixed frame when `user_data` is empty, variable otherwise.
    pub fn new(control: Control, address: u16, user_data: &[u8]) -> Result<Frame, FrameError> {
        if user_data.is_empty() {
            Ok(Frame::fixed(control, address))
        } else {
            Frame::variable(control, address, user_data)
        }
    }

    /// The `E5` acknowledgement a slave sends when it has no class 1 or
    /// class 2 data.
    pub fn single_control_character() -> Frame {
        let mut f = Frame::default();
        f.set_single_control_character();
        f
    }

    pub fn set_single_control_character(&mut self) {
        self.user_data.clear();
        self.single_control_character = true;
    }

    pub fn shape(&self) -> FrameShape {
        if self.single_control_character {
            FrameShape::SingleControlCharacter
        } else if self.user_data.is_empty() {
            FrameShape::Fixed
        } else {
            FrameShape::Variable
        }
    }

    pub fn is_single_control_character(&self) -> bool {
        self.single_control_character
    }

    pub fn has_user_data(&self) -> bool {
        !self.user_data.is_empty()
    }

    pub fn user_data(&self) -> &[u8] {
        &self.user_data
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn is_broadcast(&self) -> bool {
        self.address == BROADCAST_ADDRESS
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn control_byte(&self) -> u8 {
        self.control.bits()
    }

    pub fn prm(&self) -> Prm {
        self.control.prm()
    }

    pub fn is_from_startup_station(&self) -> bool {
        self.prm() == Prm::FromStartupStation
    }

    pub fn dir(&self) -> Dir {
        self.control.dir()
    }

    pub fn is_from_master_station(&self) -> bool {
        self.dir() == Dir::FromMasterStation
    }

    pub fn fcb(&self) -> Fcb {
        self.control.fcb_acd().into()
    }

    pub fn acd(&self) -> Acd {
        self.control.fcb_acd().into()
    }

    pub fn fcv(&self) -> Fcv {
        self.control.fcv_dfc().into()
    }

    pub fn dfc(&self) -> Dfc {
        self.control.fcv_dfc().into()
    }

    pub fn function_code(&self) -> u8 {
        self.control.function().value()
    }

    pub fn startup_function(&self) -> Result<StartupFunction, FunctionCodeError> {
        StartupFunction::try_from(self.function_code())
    }

    pub fn slave_function(&self) -> Result<SlaveFunction, FunctionCodeError> {
        SlaveFunction::try_from(self.function_code())
    }

    pub fn set_prm(&mut self, prm: Prm) {
        self.control.set_prm(prm);
    }

    pub fn set_dir(&mut self, dir: Dir) {
        self.control.set_dir(dir);
    }

    pub fn set_fcb(&mut self, fcb: Fcb) {
        self.control.set_fcb_acd(fcb.into());
    }

    pub fn set_acd(&mut self, acd: Acd) {
        self.control.set_fcb_acd(acd.into());
    }

    pub fn set_fcv(&mut self, fcv: Fcv) {
        self.control.set_fcv_dfc(fcv.into());
    }

    pub fn set_dfc(&mut self, dfc: Dfc) {
        self.control.set_fcv_dfc(dfc.into());
    }

    /// Only the low nibble of `code` is kept.
    pub fn set_function_code(&mut self, code: u8) {
        self.control.set_function(u4::new(code & 0x0F));
    }

    pub fn set_startup_function(&mut self, function: StartupFunction) {
        self.set_function_code(function as u8);
    }

    pub fn set_slave_function(&mut self, function: SlaveFunction) {
        self.set_function_code(function as u8);
    }

    /// Number of octets this frame occupies on the line.
    pub fn encoded_len(&self) -> usize {
        match self.shape() {
            FrameShape::SingleControlCharacter => 1,
            FrameShape::Fixed => FIXED_FRAME_SIZE,
            FrameShape::Variable => 4 + self.length() as usize + 2,
        }
    }

    /// Value of the doubled length octet: control + address + user data.
    fn length(&self) -> u8 {
        // bounded by MAX_USER_DATA + 2 == u8::MAX
        (2 + self.user_data.len()) as u8
    }

    fn checksum(&self) -> u8 {
        let mut d = Checksum::new();
        d.update(&[self.control_byte(), self.address as u8]);
        d.update(&self.user_data);
        d.finalize()
    }
}

impl Bytes<FrameBytes> for Frame {
    fn bytes(&self) -> FrameBytes {
        // Every shape fits in MAX_FRAME_SIZE, so the pushes cannot fail
        let mut raw = FrameBytes::new();
        match self.shape() {
            FrameShape::SingleControlCharacter => {
                let _ = raw.push(SINGLE_CONTROL_CHARACTER);
            }
            FrameShape::Fixed => {
                let _ = raw.extend_from_slice(&[
                    FIXED_START,
                    self.control_byte(),
                    self.address as u8,
                    self.checksum(),
                    END,
                ]);
            }
            FrameShape::Variable => {
                let len = self.length();
                let _ = raw.extend_from_slice(&[
                    VARIABLE_START,
                    len,
                    len,
                    VARIABLE_START,
                    self.control_byte(),
                    self.address as u8,
                ]);
                let _ = raw.extend_from_slice(&self.user_data);
                let _ = raw.extend_from_slice(&[self.checksum(), END]);
            }
        }
        raw
    }
}

impl Encode for Frame {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let size = self.encoded_len();
        if buffer.len() < size {
            return Err(FrameError::EncodeBufferTooSmall {
                expected: size,
                found: buffer.len(),
            });
        }
        buffer[..size].copy_from_slice(&self.bytes());
        Ok(size)
    }
}

use bilge::prelude::*;
use thiserror::Error;

/// DIR, bit 7 of the control field.
#[bitsize(1)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    FromMasterStation = 0,
    FromSlaveStation = 1,
}

/// PRM, bit 6 of the control field. Decides which of the dual meanings
/// bits 4 and 5 carry and which function code table applies.
#[bitsize(1)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prm {
    FromSlaveStation = 0,
    FromStartupStation = 1,
}

/// Frame count bit. Bit 5 when PRM is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fcb {
    Zero,
    One,
}

/// Frame count bit valid. Bit 4 when PRM is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fcv {
    Invalid,
    Valid,
}

/// Access demand: class 1 data waiting. Bit 5 when PRM is clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acd {
    NoClass1Data,
    Class1DataWaiting,
}

/// Data flow control. Bit 4 when PRM is clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dfc {
    CanReceive,
    CannotReceive,
}

macro_rules! bit_enum {
    ($name:ident, $clear:ident, $set:ident) => {
        impl From<bool> for $name {
            fn from(value: bool) -> Self {
                if value { $name::$set } else { $name::$clear }
            }
        }

        impl From<$name> for bool {
            fn from(value: $name) -> bool {
                matches!(value, $name::$set)
            }
        }
    };
}

bit_enum!(Fcb, Zero, One);
bit_enum!(Fcv, Invalid, Valid);
bit_enum!(Acd, NoClass1Data, Class1DataWaiting);
bit_enum!(Dfc, CanReceive, CannotReceive);

/// Function codes sent by the startup (primary) station.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupFunction {
    ResetRemoteLink = 0,
    TestLink = 2,
    SendConfirmUserData = 3,
    SendNoReplyUserData = 4,
    AccessDemand = 8,
    RequestLinkStatus = 9,
    RequestClass1Data = 10,
    RequestClass2Data = 11,
}

/// Function codes answered by the slave (secondary) station.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveFunction {
    Ack = 0,
    Nack = 1,
    UserData = 8,
    NoRequestedData = 9,
    LinkStatus = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FunctionCodeError {
    #[error("unknown function code {0}")]
    Unknown(u8),
}

impl TryFrom<u8> for StartupFunction {
    type Error = FunctionCodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StartupFunction::ResetRemoteLink),
            2 => Ok(StartupFunction::TestLink),
            3 => Ok(StartupFunction::SendConfirmUserData),
            4 => Ok(StartupFunction::SendNoReplyUserData),
            8 => Ok(StartupFunction::AccessDemand),
            9 => Ok(StartupFunction::RequestLinkStatus),
            10 => Ok(StartupFunction::RequestClass1Data),
            11 => Ok(StartupFunction::RequestClass2Data),
            x => Err(FunctionCodeError::Unknown(x)),
        }
    }
}

impl TryFrom<u8> for SlaveFunction {
    type Error = FunctionCodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SlaveFunction::Ack),
            1 => Ok(SlaveFunction::Nack),
            8 => Ok(SlaveFunction::UserData),
            9 => Ok(SlaveFunction::NoRequestedData),
            11 => Ok(SlaveFunction::LinkStatus),
            x => Err(FunctionCodeError::Unknown(x)),
        }
    }
}

/// The link control octet. Fields are packed LSB first, so `function`
/// occupies bits 0-3 and `dir` bit 7.
///
/// `fcv_dfc` and `fcb_acd` hold whichever meaning `prm` selects; the typed
/// accessors on [`crate::Frame`] expose both readings.
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub function: u4,
    pub fcv_dfc: bool,
    pub fcb_acd: bool,
    pub prm: Prm,
    pub dir: Dir,
}

impl Control {
    /// Control octet for a message from the startup station. The direction
    /// bit is left clear, as on unbalanced lines.
    pub fn primary(function: StartupFunction, fcb: Fcb, fcv: Fcv) -> Control {
        Control::new(
            u4::new(function as u8),
            fcv.into(),
            fcb.into(),
            Prm::FromStartupStation,
            Dir::FromMasterStation,
        )
    }

    /// Control octet for a slave station response.
    pub fn secondary(function: SlaveFunction, acd: Acd, dfc: Dfc) -> Control {
        Control::new(
            u4::new(function as u8),
            dfc.into(),
            acd.into(),
            Prm::FromSlaveStation,
            Dir::FromMasterStation,
        )
    }

    pub fn bits(&self) -> u8 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_lsb_first() {
        // 0101_0011: PRM, FCV, function 3
        let c = Control::from(0x53u8);
        assert_eq!(c.function().value(), 3);
        assert!(c.fcv_dfc());
        assert!(!c.fcb_acd());
        assert_eq!(c.prm(), Prm::FromStartupStation);
        assert_eq!(c.dir(), Dir::FromMasterStation);
    }

    #[test]
    fn primary_builds_expected_octet() {
        let c = Control::primary(StartupFunction::SendConfirmUserData, Fcb::One, Fcv::Valid);
        assert_eq!(c.bits(), 0x73);
    }

    #[test]
    fn secondary_builds_expected_octet() {
        let c = Control::secondary(SlaveFunction::UserData, Acd::Class1DataWaiting, Dfc::CanReceive);
        assert_eq!(c.bits(), 0x28);
    }

    #[test]
    fn function_codes_round_trip_through_u8() {
        for code in 0..16u8 {
            if let Ok(f) = StartupFunction::try_from(code) {
                assert_eq!(f as u8, code);
            }
            if let Ok(f) = SlaveFunction::try_from(code) {
                assert_eq!(f as u8, code);
            }
        }
        assert_eq!(StartupFunction::try_from(1), Err(FunctionCodeError::Unknown(1)));
        assert_eq!(SlaveFunction::try_from(10), Err(FunctionCodeError::Unknown(10)));
    }

    #[test]
    fn bit_enums_follow_bool() {
        assert_eq!(Fcb::from(true), Fcb::One);
        assert!(!bool::from(Fcv::Invalid));
        assert_eq!(Acd::from(false), Acd::NoClass1Data);
        assert!(bool::from(Dfc::CannotReceive));
    }
}

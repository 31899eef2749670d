use num_enum::{FromPrimitive, IntoPrimitive};

/// Numbering-plan-identification field of an address (4 bits, TS 23.040 9.1.2.5)
///
/// Values without a defined meaning are kept as `Reserved` so that they
/// survive a decode/encode cycle unchanged.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumberingPlan {
    Unknown = 0b0000,
    Isdn = 0b0001,
    Data = 0b0011,
    Telex = 0b0100,
    ServiceCentreSpecific = 0b0101,
    ServiceCentreSpecific2 = 0b0110,
    National = 0b1000,
    Private = 0b1001,
    Ermes = 0b1010,
    #[num_enum(catch_all)]
    Reserved(u8),
}

impl Default for NumberingPlan {
    fn default() -> Self {
        NumberingPlan::Unknown
    }
}

impl NumberingPlan {
    /// Extract the numbering plan from a type-of-address octet
    pub fn from_toa(toa: u8) -> Self {
        Self::from(toa & 0x0F)
    }
}

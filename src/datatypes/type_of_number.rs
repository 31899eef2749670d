use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Type-of-number field of an address (3 bits, TS 23.040 9.1.2.5)
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeOfNumber {
    #[default]
    Unknown = 0b000,
    International = 0b001,
    National = 0b010,
    NetworkSpecific = 0b011,
    SubscriberNumber = 0b100,
    Alphanumeric = 0b101,
    Abbreviated = 0b110,
    Reserved = 0b111,
}

impl TypeOfNumber {
    /// Extract the type of number from a type-of-address octet
    pub fn from_toa(toa: u8) -> Self {
        // Every 3-bit value has a variant
        Self::try_from((toa >> 4) & 0x07).unwrap_or(Self::Reserved)
    }
}

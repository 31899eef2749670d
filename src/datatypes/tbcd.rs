// ABOUTME: Telephony BCD digit strings as used in TP and RP address fields
// ABOUTME: Validates the {0-9,*,#,a,b,c} digit set and packs digits low nibble first with 0xF fill

use crate::codec::CodecError;
use std::fmt;
use std::str::FromStr;

const FILL: u8 = 0x0F;

/// A validated Telephony BCD digit string
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct TbcdString(String);

fn digit_to_nibble(ch: char) -> Result<u8, CodecError> {
    match ch {
        '0'..='9' => Ok(ch as u8 - b'0'),
        '*' => Ok(0x0A),
        '#' => Ok(0x0B),
        'a' => Ok(0x0C),
        'b' => Ok(0x0D),
        'c' => Ok(0x0E),
        _ => Err(CodecError::InvalidDigit(ch)),
    }
}

fn nibble_to_digit(nibble: u8) -> Option<char> {
    match nibble {
        0..=9 => Some((b'0' + nibble) as char),
        0x0A => Some('*'),
        0x0B => Some('#'),
        0x0C => Some('a'),
        0x0D => Some('b'),
        0x0E => Some('c'),
        _ => None,
    }
}

impl TbcdString {
    /// Creates a digit string, validating every digit
    pub fn new(digits: &str) -> Result<Self, CodecError> {
        for ch in digits.chars() {
            digit_to_nibble(ch)?;
        }
        Ok(Self(digits.to_owned()))
    }

    /// Returns the digits as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits (not octets)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of octets the packed form occupies
    pub fn packed_len(&self) -> usize {
        self.0.len().div_ceil(2)
    }

    /// Pack two digits per octet, low nibble first, padding odd length with 0xF
    pub fn to_packed(&self) -> Vec<u8> {
        // Every char was validated on construction
        let nibbles: Vec<u8> = self
            .0
            .chars()
            .map(|ch| digit_to_nibble(ch).unwrap_or(FILL))
            .collect();
        nibbles
            .chunks(2)
            .map(|pair| pair[0] | (pair.get(1).copied().unwrap_or(FILL) << 4))
            .collect()
    }

    /// Unpack exactly `count` digits from the packed octets
    pub fn from_packed_digits(bytes: &[u8], count: usize) -> Result<Self, CodecError> {
        if bytes.len() < count.div_ceil(2) {
            return Err(CodecError::Incomplete);
        }
        let mut digits = String::with_capacity(count);
        for i in 0..count {
            let byte = bytes[i / 2];
            let nibble = if i % 2 == 0 { byte & 0x0F } else { byte >> 4 };
            match nibble_to_digit(nibble) {
                Some(ch) => digits.push(ch),
                None => return Err(CodecError::MisplacedFiller),
            }
        }
        Ok(Self(digits))
    }

    /// Unpack every digit of the octets, allowing a single fill nibble at the very end
    pub fn from_packed(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut count = bytes.len() * 2;
        if bytes.last().is_some_and(|b| b >> 4 == FILL) {
            count -= 1;
        }
        Self::from_packed_digits(bytes, count)
    }
}

impl FromStr for TbcdString {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TbcdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TbcdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TbcdString({:?})", self.0)
    }
}

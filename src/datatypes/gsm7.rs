// ABOUTME: GSM 7-bit default alphabet with its escape extension table and septet bit-packing
// ABOUTME: Packs characters LSB-first at an arbitrary bit offset and unpacks them given a unit count

use crate::codec::CodecError;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Escape code switching to the extension table for the next unit
pub const ESCAPE: u8 = 0x1B;

/// Unit written into seven otherwise-empty trailing bits
pub const FILLER: u8 = 0x1A;

/// GSM 03.38 basic character set, indexed by septet value.
///
/// Index 0x1B is the escape code and never maps to a character on its own.
const BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Extension table reached through the escape code
const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

/// How a single character is written in the default alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    Basic(u8),
    Extended(u8),
}

static CHAR_TO_CODE: LazyLock<HashMap<char, Code>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(BASIC.len() + EXTENSION.len());
    for (code, &ch) in BASIC.iter().enumerate() {
        if code as u8 != ESCAPE {
            map.insert(ch, Code::Basic(code as u8));
        }
    }
    for &(code, ch) in EXTENSION.iter() {
        map.insert(ch, Code::Extended(code));
    }
    map
});

fn extension_char(code: u8) -> Option<char> {
    EXTENSION
        .iter()
        .find(|(ext, _)| *ext == code)
        .map(|(_, ch)| *ch)
}

/// Returns true if the character can be written in the default alphabet
pub fn is_encodable(ch: char) -> bool {
    CHAR_TO_CODE.contains_key(&ch)
}

/// Number of alphabet units a single character occupies (1 or 2)
pub fn char_units(ch: char) -> Option<usize> {
    match CHAR_TO_CODE.get(&ch)? {
        Code::Basic(_) => Some(1),
        Code::Extended(_) => Some(2),
    }
}

/// Number of alphabet units the text occupies
pub fn unit_count(text: &str) -> Result<usize, CodecError> {
    text.chars()
        .map(|ch| char_units(ch).ok_or(CodecError::UnmappableCharacter(ch)))
        .sum()
}

/// Translate text into alphabet units, expanding extension characters to escape pairs
pub fn septets(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match CHAR_TO_CODE.get(&ch) {
            Some(Code::Basic(code)) => out.push(*code),
            Some(Code::Extended(code)) => {
                out.push(ESCAPE);
                out.push(*code);
            }
            None => return Err(CodecError::UnmappableCharacter(ch)),
        }
    }
    Ok(out)
}

/// Translate alphabet units back into text.
///
/// An escape followed by a code with no extension mapping yields the basic
/// character for that code. A lone trailing escape, or an escape pair, yields
/// a space.
pub fn text_from_septets(units: &[u8]) -> String {
    let mut out = String::with_capacity(units.len());
    let mut iter = units.iter().map(|u| u & 0x7F);
    while let Some(unit) = iter.next() {
        if unit != ESCAPE {
            out.push(BASIC[unit as usize]);
            continue;
        }
        match iter.next() {
            Some(ESCAPE) | None => out.push(' '),
            Some(code) => match extension_char(code) {
                Some(ch) => out.push(ch),
                None => {
                    debug!(code, "escape to unmapped extension code");
                    out.push(BASIC[code as usize]);
                }
            },
        }
    }
    out
}

fn check_offset(offset: u8) -> Result<(), CodecError> {
    if offset >= 7 {
        return Err(CodecError::field(
            "bit_offset",
            format!("{offset} is outside 0..7"),
        ));
    }
    Ok(())
}

/// Pack raw units as a continuous LSB-first bit stream starting at `offset`.
///
/// The low `offset` bits of the first octet are left zero. When the stream
/// would leave exactly seven spare bits in the final octet, they carry
/// the filler unit instead of zeros.
pub fn pack_septets(units: &[u8], offset: u8) -> Vec<u8> {
    let offset = offset as usize & 0x07;
    let mut bits = offset + units.len() * 7;
    let filler = bits % 8 == 1;
    if filler {
        bits += 7;
    }
    let mut out = vec![0u8; bits.div_ceil(8)];

    let trailer = filler.then_some(FILLER);
    for (i, unit) in units.iter().copied().chain(trailer).enumerate() {
        let unit = unit & 0x7F;
        let pos = offset + i * 7;
        let (idx, shift) = (pos / 8, pos % 8);
        out[idx] |= unit << shift;
        if shift > 1 {
            out[idx + 1] |= unit >> (8 - shift);
        }
    }
    out
}

/// Read `count` raw units from a bit stream starting at `offset`
pub fn unpack_septets(bytes: &[u8], offset: u8, count: usize) -> Result<Vec<u8>, CodecError> {
    let offset = offset as usize & 0x07;
    let needed = (offset + count * 7).div_ceil(8);
    if bytes.len() < needed {
        return Err(CodecError::Incomplete);
    }

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let pos = offset + i * 7;
        let (idx, shift) = (pos / 8, pos % 8);
        let mut unit = bytes[idx] >> shift;
        if shift > 1 {
            unit |= bytes[idx + 1] << (8 - shift);
        }
        out.push(unit & 0x7F);
    }
    Ok(out)
}

/// Encode text into the packed 7-bit representation at the given bit offset
pub fn pack(text: &str, offset: u8) -> Result<Vec<u8>, CodecError> {
    check_offset(offset)?;
    Ok(pack_septets(&septets(text)?, offset))
}

/// Decode `units` alphabet units of packed 7-bit text starting at the given bit offset
pub fn unpack(bytes: &[u8], offset: u8, units: usize) -> Result<String, CodecError> {
    check_offset(offset)?;
    Ok(text_from_septets(&unpack_septets(bytes, offset, units)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_hello_world() {
        // Classic example from GSM 03.38
        let packed = pack("hellohello", 0).unwrap();
        assert_eq!(
            packed,
            vec![0xE8, 0x32, 0x9B, 0xFD, 0x46, 0x97, 0xD9, 0xEC, 0x37]
        );
        assert_eq!(unpack(&packed, 0, 10).unwrap(), "hellohello");
    }

    #[test]
    fn eight_units_fill_seven_octets() {
        let packed = pack("ABCDEFGH", 0).unwrap();
        assert_eq!(packed.len(), 7);
        assert_eq!(unpack(&packed, 0, 8).unwrap(), "ABCDEFGH");
    }

    #[test]
    fn seven_spare_bits_carry_filler() {
        // 7 units is 49 bits, leaving seven spare bits in the last octet
        let packed = pack("1234567", 0).unwrap();
        assert_eq!(packed.len(), 7);
        assert_eq!(packed[6] >> 1, FILLER);
        assert_eq!(unpack(&packed, 0, 7).unwrap(), "1234567");
        assert_eq!(unpack(&packed, 0, 8).unwrap(), "1234567Ξ");
    }

    #[test]
    fn offset_leaves_low_bits_clear() {
        let packed = pack("A", 1).unwrap();
        assert_eq!(packed, vec![0x41 << 1]);
        assert_eq!(unpack(&packed, 1, 1).unwrap(), "A");
    }

    #[test]
    fn extension_characters_cost_two_units() {
        assert_eq!(unit_count("a{b}€").unwrap(), 8);
        assert_eq!(septets("€").unwrap(), vec![ESCAPE, 0x65]);
        let packed = pack("[x]", 3).unwrap();
        assert_eq!(unpack(&packed, 3, 5).unwrap(), "[x]");
    }

    #[test]
    fn unmappable_character_fails() {
        assert_eq!(pack("héllo あ", 0), Err(CodecError::UnmappableCharacter('あ')));
        assert!(!is_encodable('あ'));
        assert!(is_encodable('Ø'));
    }

    #[test]
    fn unknown_escape_falls_back_to_basic() {
        assert_eq!(text_from_septets(&[ESCAPE, 0x41]), "A");
        assert_eq!(text_from_septets(&[0x41, ESCAPE]), "A ");
        assert_eq!(text_from_septets(&[ESCAPE, ESCAPE, 0x42]), " B");
    }

    #[test]
    fn unpack_rejects_short_input() {
        assert_eq!(unpack(&[0x41], 0, 2), Err(CodecError::Incomplete));
    }

    #[test]
    fn offset_out_of_range() {
        assert!(pack("A", 7).is_err());
        assert!(unpack(&[0x00], 7, 0).is_err());
    }

    #[test]
    fn empty_text_packs_to_nothing() {
        assert!(pack("", 0).unwrap().is_empty());
        assert_eq!(unpack(&[], 0, 0).unwrap(), "");
    }
}

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ndr::NdrType;
use crate::pdu::read_slice_bytes;
use crate::Error;

/// An NDR conformant-varying string: maximum count, offset and actual count
/// headers followed by UTF-16LE code units.
///
/// Counts are in code units and include the single NUL terminator appended
/// on the wire. Decoding removes exactly that terminator; NULs embedded in
/// the payload survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformantVaryingString {
    representation: String,
    offset: u32,
    maximum_count: u32,
}

impl ConformantVaryingString {
    /// Constructs a new string with offset 0 and the maximum count equal to
    /// the actual count.
    pub fn new(representation: impl Into<String>) -> Self {
        let representation = representation.into();
        let maximum_count = count_with_terminator(&representation);

        Self {
            representation,
            offset: 0,
            maximum_count,
        }
    }

    /// Overrides the maximum count, for conformant buffers larger than their
    /// contents.
    pub fn with_maximum_count(mut self, maximum_count: u32) -> Self {
        self.maximum_count = maximum_count;
        self
    }

    /// Returns the actual count: code units including the terminator.
    pub fn actual_count(&self) -> u32 {
        count_with_terminator(&self.representation)
    }

    /// Returns the maximum count of the conformant buffer.
    pub fn maximum_count(&self) -> u32 {
        self.maximum_count
    }

    /// Returns the string value, without the terminator.
    pub fn as_str(&self) -> &str {
        &self.representation
    }

    /// Consumes self, returning the string value.
    pub fn into_string(self) -> String {
        self.representation
    }
}

impl From<&str> for ConformantVaryingString {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl NdrType for ConformantVaryingString {
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let maximum_count = r.read_u32::<LittleEndian>()?;
        let offset = r.read_u32::<LittleEndian>()?;
        let actual_count = r.read_u32::<LittleEndian>()?;

        let byte_len = (actual_count as usize)
            .checked_mul(2)
            .ok_or(Error::InvalidLength)?;
        let payload = read_slice_bytes(r, byte_len)?;

        let mut units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        // Strip exactly one trailing terminator; embedded NULs survive.
        if units.last() == Some(&0) {
            units.pop();
        }

        Ok(Self {
            representation: String::from_utf16(&units).map_err(|_| Error::InvalidString)?,
            offset,
            maximum_count,
        })
    }

    fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u32::<LittleEndian>(self.maximum_count)?;
        buf.write_u32::<LittleEndian>(self.offset)?;
        buf.write_u32::<LittleEndian>(self.actual_count())?;

        for unit in self.representation.encode_utf16() {
            buf.write_u16::<LittleEndian>(unit)?;
        }
        buf.write_u16::<LittleEndian>(0)
    }

    fn serialised_len(&self) -> u32 {
        12 + 2 * self.actual_count()
    }
}

fn count_with_terminator(s: &str) -> u32 {
    s.encode_utf16().count() as u32 + 1
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_hello_golden_bytes() {
        // "hello": maximum count 6, offset 0, actual count 6 (five
        // characters plus the terminator), then UTF-16LE code units.
        const RAW: [u8; 24] = hex!(
            "06 00 00 00 00 00 00 00 06 00 00 00
             68 00 65 00 6c 00 6c 00 6f 00 00 00"
        );

        let s = ConformantVaryingString::new("hello");
        assert_eq!(s.actual_count(), 6);
        assert_eq!(s.maximum_count(), 6);
        assert_eq!(s.serialised_len(), 24);

        let mut buf = Cursor::new(Vec::new());
        s.serialise_into(&mut buf).expect("failed to serialise");
        assert_eq!(buf.get_ref().as_slice(), RAW.as_ref());

        let mut r = Cursor::new(RAW.as_ref());
        let got = ConformantVaryingString::from_cursor(&mut r).expect("failed to parse string");
        assert_eq!(got, s);
        assert_eq!(r.position(), 24);
    }

    #[test]
    fn test_empty_string() {
        let s = ConformantVaryingString::new("");
        assert_eq!(s.actual_count(), 1);

        let mut buf = Cursor::new(Vec::new());
        s.serialise_into(&mut buf).expect("failed to serialise");
        assert_eq!(
            buf.get_ref().as_slice(),
            hex!("01 00 00 00 00 00 00 00 01 00 00 00 00 00")
        );

        let mut r = Cursor::new(buf.get_ref().as_slice());
        let got = ConformantVaryingString::from_cursor(&mut r).expect("failed to parse string");
        assert_eq!(got.as_str(), "");
    }

    #[test]
    fn test_embedded_nuls_survive() {
        // Only the single trailing terminator is removed on decode.
        let s = ConformantVaryingString::new("a\0b\0");

        let mut buf = Cursor::new(Vec::new());
        s.serialise_into(&mut buf).expect("failed to serialise");

        let mut r = Cursor::new(buf.get_ref().as_slice());
        let got = ConformantVaryingString::from_cursor(&mut r).expect("failed to parse string");
        assert_eq!(got.as_str(), "a\0b\0");
    }

    #[test]
    fn test_non_bmp_characters_count_code_units() {
        // One astral character is two UTF-16 code units.
        let s = ConformantVaryingString::new("\u{1f980}");
        assert_eq!(s.actual_count(), 3);

        let mut buf = Cursor::new(Vec::new());
        s.serialise_into(&mut buf).expect("failed to serialise");
        assert_eq!(buf.get_ref().len() as u32, s.serialised_len());

        let mut r = Cursor::new(buf.get_ref().as_slice());
        let got = ConformantVaryingString::from_cursor(&mut r).expect("failed to parse string");
        assert_eq!(got.as_str(), "\u{1f980}");
    }

    #[test]
    fn test_truncated_payload() {
        let raw = hex!("06 00 00 00 00 00 00 00 06 00 00 00 68 00");

        let mut r = Cursor::new(raw.as_ref());
        assert_eq!(
            ConformantVaryingString::from_cursor(&mut r).unwrap_err(),
            Error::InvalidLength
        );
    }

    #[test]
    fn test_unpaired_surrogate_rejected() {
        // Maximum 2, offset 0, actual 2: a lone high surrogate and the
        // terminator.
        let raw = hex!("02 00 00 00 00 00 00 00 02 00 00 00 00 d8 00 00");

        let mut r = Cursor::new(raw.as_ref());
        assert_eq!(
            ConformantVaryingString::from_cursor(&mut r).unwrap_err(),
            Error::InvalidString
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(s in "\\PC*") {
            let value = ConformantVaryingString::new(s.as_str());

            let mut buf = Cursor::new(Vec::new());
            value.serialise_into(&mut buf).unwrap();
            prop_assert_eq!(buf.get_ref().len() as u32, value.serialised_len());

            let mut r = Cursor::new(buf.get_ref().as_slice());
            let got = ConformantVaryingString::from_cursor(&mut r).unwrap();
            prop_assert_eq!(got.as_str(), s.as_str());
            prop_assert_eq!(got, value);
        }
    }
}

use std::io::{Cursor, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::Error;

/// The character representation selected by the low nibble of the first
/// DRep byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterRepresentation {
    /// ASCII, the only representation this crate produces.
    #[default]
    Ascii,
    /// EBCDIC, recognised but never produced.
    Ebcdic,
}

/// The integer byte order selected by the high nibble of the first DRep
/// byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegerRepresentation {
    /// Big-endian, recognised but never produced.
    BigEndian,
    /// Little-endian, the only representation this crate produces.
    #[default]
    LittleEndian,
}

/// The floating point format selected by the second DRep byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatingPointRepresentation {
    /// IEEE, the only representation this crate produces.
    #[default]
    Ieee,
    /// VAX, recognised but never produced.
    Vax,
    /// Cray, recognised but never produced.
    Cray,
    /// IBM, recognised but never produced.
    Ibm,
}

/// The 4-byte data representation format label in the common header.
///
/// The last two bytes are reserved and must be zero; decoding rejects
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataRepresentation {
    /// The character set for wire strings.
    pub character: CharacterRepresentation,
    /// The byte order for wire integers.
    pub integer: IntegerRepresentation,
    /// The format for wire floating point values.
    pub floating_point: FloatingPointRepresentation,
}

impl DataRepresentation {
    /// Constructs a new `DataRepresentation` by parsing the wire format read
    /// from `r`, advancing the cursor by 4 bytes.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let first = r.read_u8()?;

        let character = match first & 0b1111 {
            0 => CharacterRepresentation::Ascii,
            1 => CharacterRepresentation::Ebcdic,
            _ => return Err(Error::InvalidDataRepresentation),
        };
        let integer = match (first >> 4) & 0b1111 {
            0 => IntegerRepresentation::BigEndian,
            1 => IntegerRepresentation::LittleEndian,
            _ => return Err(Error::InvalidDataRepresentation),
        };
        let floating_point = match r.read_u8()? {
            0 => FloatingPointRepresentation::Ieee,
            1 => FloatingPointRepresentation::Vax,
            2 => FloatingPointRepresentation::Cray,
            3 => FloatingPointRepresentation::Ibm,
            _ => return Err(Error::InvalidDataRepresentation),
        };

        // The trailing two bytes are reserved and must be zero.
        if r.read_u16::<byteorder::LittleEndian>()? != 0 {
            return Err(Error::InvalidDataRepresentation);
        }

        Ok(Self {
            character,
            integer,
            floating_point,
        })
    }

    /// Serialises this format label into `buf`, advancing the cursor
    /// position by 4 bytes.
    pub(crate) fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        let character = match self.character {
            CharacterRepresentation::Ascii => 0u8,
            CharacterRepresentation::Ebcdic => 1,
        };
        let integer = match self.integer {
            IntegerRepresentation::BigEndian => 0u8,
            IntegerRepresentation::LittleEndian => 1,
        };
        let floating_point = match self.floating_point {
            FloatingPointRepresentation::Ieee => 0u8,
            FloatingPointRepresentation::Vax => 1,
            FloatingPointRepresentation::Cray => 2,
            FloatingPointRepresentation::Ibm => 3,
        };

        buf.write_u8((integer << 4) | character)?;
        buf.write_u8(floating_point)?;
        buf.write_u8(0)?;
        buf.write_u8(0)
    }
}

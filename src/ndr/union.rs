use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ndr::NdrType;
use crate::Error;

/// An NDR discriminated union: a 32-bit discriminant followed by the variant
/// body.
///
/// The body's shape depends on the discriminant per the owning interface's
/// variant table, so decoding yields the discriminant plus the residual
/// bytes and leaves body parsing to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdrUnion {
    /// The discriminant selecting the variant.
    pub tag: u32,
    /// The marshalled variant body.
    pub representation: Vec<u8>,
}

impl NdrUnion {
    /// Constructs a new union with the given discriminant and marshalled
    /// body.
    pub fn new(tag: u32, representation: Vec<u8>) -> Self {
        Self {
            tag,
            representation,
        }
    }
}

impl NdrType for NdrUnion {
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let tag = r.read_u32::<LittleEndian>()?;

        let data = *r.get_ref();
        let start = r.position() as usize;
        r.set_position(data.len() as u64);

        Ok(Self {
            tag,
            representation: data[start..].to_vec(),
        })
    }

    fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u32::<LittleEndian>(self.tag)?;
        buf.write_all(&self.representation)
    }

    fn serialised_len(&self) -> u32 {
        4 + self.representation.len() as u32
    }
}

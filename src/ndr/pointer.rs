use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ndr::{next_referent_id, NdrType};
use crate::Error;

/// An NDR full pointer: a referent id followed by the marshalled referent.
///
/// Referent id 0 is the canonical null pointer and carries no payload, so
/// the null pointer is a distinguished value of this sum rather than a
/// referent. Non-null ids come from a process-wide monotonic source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointer<T> {
    /// The null pointer: four zero bytes on the wire, nothing after them.
    Null,
    /// A pointer to a marshalled referent.
    Ref {
        /// The id disambiguating this referent within the stream.
        referent_id: u32,
        /// The pointed-to value.
        referent: T,
    },
}

impl<T> Pointer<T> {
    /// Constructs a pointer to `referent`, drawing a fresh referent id.
    pub fn new(referent: T) -> Result<Self, Error> {
        Ok(Self::Ref {
            referent_id: next_referent_id()?,
            referent,
        })
    }

    /// Returns true for the null pointer.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the referent id, 0 for the null pointer.
    pub fn referent_id(&self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Ref { referent_id, .. } => *referent_id,
        }
    }

    /// Returns the referent, or `None` for the null pointer.
    pub fn referent(&self) -> Option<&T> {
        match self {
            Self::Null => None,
            Self::Ref { referent, .. } => Some(referent),
        }
    }

    /// Consumes self, returning the referent, or `None` for the null
    /// pointer.
    pub fn into_referent(self) -> Option<T> {
        match self {
            Self::Null => None,
            Self::Ref { referent, .. } => Some(referent),
        }
    }
}

impl<T> NdrType for Pointer<T>
where
    T: NdrType,
{
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let referent_id = r.read_u32::<LittleEndian>()?;

        // A zero referent id is null regardless of any trailing bytes, which
        // belong to whatever follows the pointer.
        if referent_id == 0 {
            return Ok(Self::Null);
        }

        Ok(Self::Ref {
            referent_id,
            referent: T::from_cursor(r)?,
        })
    }

    fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        match self {
            Self::Null => buf.write_u32::<LittleEndian>(0),
            Self::Ref {
                referent_id,
                referent,
            } => {
                buf.write_u32::<LittleEndian>(*referent_id)?;
                referent.serialise_into(buf)
            }
        }
    }

    fn serialised_len(&self) -> u32 {
        match self {
            Self::Null => 4,
            Self::Ref { referent, .. } => 4 + referent.serialised_len(),
        }
    }
}

/// Uninterpreted referent bytes: the rest of the buffer, verbatim.
///
/// Used for pointer referents whose shape only the owning interface knows,
/// such as not-yet-decoded union bodies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBytes(pub Vec<u8>);

impl NdrType for RawBytes {
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let data = *r.get_ref();
        let start = r.position() as usize;
        r.set_position(data.len() as u64);
        Ok(Self(data[start..].to_vec()))
    }

    fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_all(&self.0)
    }

    fn serialised_len(&self) -> u32 {
        self.0.len() as u32
    }
}

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ndr::NdrType;
use crate::pdu::read_slice_bytes;
use crate::Error;

/// An NDR unidimensional conformant array: a maximum count followed by that
/// many fixed-width elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnidimensionalConformantArray {
    element_size: usize,
    data: Vec<u8>,
}

impl UnidimensionalConformantArray {
    /// Constructs a new array of single-byte elements.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            element_size: 1,
            data,
        }
    }

    /// Constructs a new array of `element_size`-byte elements.
    ///
    /// # Panics
    ///
    /// Panics if `element_size` is 0 or does not divide the data length.
    pub fn with_element_size(data: Vec<u8>, element_size: usize) -> Self {
        assert!(
            element_size != 0 && data.len() % element_size == 0,
            "data must hold a whole number of elements"
        );

        Self { element_size, data }
    }

    /// Constructs a new array of `element_size`-byte elements by parsing the
    /// wire format read from `r`, advancing the cursor to the end of the
    /// array.
    pub fn from_cursor_with_element_size(
        r: &mut Cursor<&[u8]>,
        element_size: usize,
    ) -> Result<Self, Error> {
        if element_size == 0 {
            return Err(Error::InvalidLength);
        }

        let maximum_count = r.read_u32::<LittleEndian>()?;
        let byte_len = (maximum_count as usize)
            .checked_mul(element_size)
            .ok_or(Error::InvalidLength)?;

        Ok(Self {
            element_size,
            data: read_slice_bytes(r, byte_len)?.to_vec(),
        })
    }

    /// Returns the element count declared on the wire.
    pub fn maximum_count(&self) -> u32 {
        (self.data.len() / self.element_size) as u32
    }

    /// Returns the raw element bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes self, returning the raw element bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Iterates over the elements as fixed-width byte slices.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.element_size)
    }
}

impl NdrType for UnidimensionalConformantArray {
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::from_cursor_with_element_size(r, 1)
    }

    fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u32::<LittleEndian>(self.maximum_count())?;
        buf.write_all(&self.data)
    }

    fn serialised_len(&self) -> u32 {
        4 + self.data.len() as u32
    }
}

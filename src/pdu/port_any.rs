use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::read_slice_bytes;
use crate::Error;

/// The secondary address carried by a [`BindAck`](crate::pdu::BindAck): a
/// NUL-terminated ASCII endpoint string prefixed with its length (terminator
/// included).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortAny {
    port_spec: String,
}

impl PortAny {
    /// Constructs a new `PortAny` from the given endpoint string.
    ///
    /// # Panics
    ///
    /// Panics if `port_spec` contains non-ASCII characters or embedded NUL
    /// bytes.
    pub fn new(port_spec: impl Into<String>) -> Self {
        let port_spec = port_spec.into();
        assert!(
            port_spec.is_ascii() && !port_spec.contains('\0'),
            "port spec must be ASCII without embedded NULs"
        );
        Self { port_spec }
    }

    /// Returns the endpoint string, without the terminator.
    pub fn port_spec(&self) -> &str {
        &self.port_spec
    }

    /// Constructs a new `PortAny` by parsing the wire format read from `r`,
    /// advancing the cursor to the end of the structure.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let length = r.read_u16::<LittleEndian>()?;
        if length == 0 {
            return Err(Error::InvalidLength);
        }

        // The length counts the terminator, which is not part of the string.
        let bytes = read_slice_bytes(r, usize::from(length))?;
        let spec = &bytes[..bytes.len() - 1];
        if !spec.is_ascii() {
            return Err(Error::InvalidPortSpec);
        }

        Ok(Self {
            // ASCII was just validated.
            port_spec: String::from_utf8_lossy(spec).into_owned(),
        })
    }

    /// Serialises this `PortAny` into `buf`, advancing the cursor position
    /// by [`serialised_len`](PortAny::serialised_len) bytes.
    pub fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u16::<LittleEndian>(self.port_spec.len() as u16 + 1)?;
        buf.write_all(self.port_spec.as_bytes())?;
        buf.write_u8(0)
    }

    /// Returns the on-wire length of this structure once serialised.
    pub fn serialised_len(&self) -> u32 {
        2 + self.port_spec.len() as u32 + 1
    }
}

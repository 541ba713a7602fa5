use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::pdu::read_slice_bytes;
use crate::Error;

/// The NDR transfer syntax, version 2 - the only transfer syntax this crate
/// marshals stub data in.
pub const NDR_TRANSFER_SYNTAX: PresentationSyntax = PresentationSyntax {
    if_uuid: Uuid::from_u128(0x8a885d04_1ceb_11c9_9fe8_08002b104860),
    if_version: 2,
};

/// A (UUID, version) pair identifying either an abstract interface or a
/// transfer syntax.
///
/// The UUID is serialised in the mixed-endian `bytes_le` form: the first
/// three fields little-endian, the last two big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationSyntax {
    /// The interface (or transfer syntax) identifier.
    pub if_uuid: Uuid,
    /// The interface (or transfer syntax) version.
    pub if_version: u32,
}

impl PresentationSyntax {
    /// The serialised length of a presentation syntax.
    pub(crate) const LEN: usize = 20;

    /// Constructs a new `PresentationSyntax` by parsing the wire format read
    /// from `r`, advancing the cursor by 20 bytes.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let uuid_bytes = read_slice_bytes(r, 16)?;
        let mut buf = [0u8; 16];
        buf.copy_from_slice(uuid_bytes);

        Ok(Self {
            if_uuid: Uuid::from_bytes_le(buf),
            if_version: r.read_u32::<LittleEndian>()?,
        })
    }

    /// Serialises this `PresentationSyntax` into `buf`, advancing the cursor
    /// position by 20 bytes.
    pub(crate) fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_all(&self.if_uuid.to_bytes_le())?;
        buf.write_u32::<LittleEndian>(self.if_version)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_ndr_syntax_wire_form() {
        // 8a885d04-1ceb-11c9-9fe8-08002b104860 v2: time fields byte-swapped,
        // clock sequence and node verbatim.
        let raw = hex!(
            "04 5d 88 8a eb 1c c9 11 9f e8 08 00 2b 10 48 60
             02 00 00 00"
        );

        let mut r = Cursor::new(raw.as_ref());
        let syntax = PresentationSyntax::from_cursor(&mut r).expect("failed to parse syntax");
        assert_eq!(syntax, NDR_TRANSFER_SYNTAX);
        assert_eq!(r.position(), PresentationSyntax::LEN as u64);

        let mut buf = Cursor::new(Vec::new());
        syntax.serialise_into(&mut buf).expect("failed to serialise");
        assert_eq!(buf.into_inner().as_slice(), raw.as_ref());
    }

    #[test]
    fn test_short_buffer() {
        let raw = hex!("04 5d 88 8a eb 1c");

        let mut r = Cursor::new(raw.as_ref());
        assert_eq!(
            PresentationSyntax::from_cursor(&mut r).unwrap_err(),
            Error::InvalidLength
        );
    }
}

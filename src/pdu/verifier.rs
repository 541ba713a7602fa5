use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::Error;

/// The fixed part of the verifier trailer preceding the credential bytes.
pub(crate) const AUTH_TRAILER_LEN: usize = 8;

/// The authentication verifier trailer (`sec_trailer`) optionally appended
/// to a PDU body.
///
/// The credential bytes are carried opaquely: this crate reserves the space
/// and accounts for it in `auth_length`, but performs no cryptography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthVerifier {
    /// The authentication service the credential belongs to.
    pub auth_type: u8,
    /// The protection level negotiated for the connection.
    pub auth_level: u8,
    /// The number of padding bytes inserted before the trailer to align the
    /// stub.
    pub auth_pad_length: u8,
    /// The authentication context handle.
    pub auth_context_id: u32,
    /// The opaque credential bytes produced by the security provider.
    pub auth_value: Vec<u8>,
}

impl AuthVerifier {
    /// Constructs a new `AuthVerifier` by parsing the wire format of `data`,
    /// which must hold exactly one verifier.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < AUTH_TRAILER_LEN {
            return Err(Error::InvalidLength);
        }

        let mut r = Cursor::new(data);
        let auth_type = r.read_u8()?;
        let auth_level = r.read_u8()?;
        let auth_pad_length = r.read_u8()?;
        let _reserved = r.read_u8()?;
        let auth_context_id = r.read_u32::<LittleEndian>()?;

        Ok(Self {
            auth_type,
            auth_level,
            auth_pad_length,
            auth_context_id,
            auth_value: data[AUTH_TRAILER_LEN..].to_vec(),
        })
    }

    /// Serialises this `AuthVerifier` into `buf`, advancing the cursor
    /// position by [`serialised_len`](AuthVerifier::serialised_len) bytes.
    pub fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u8(self.auth_type)?;
        buf.write_u8(self.auth_level)?;
        buf.write_u8(self.auth_pad_length)?;
        buf.write_u8(0)?;
        buf.write_u32::<LittleEndian>(self.auth_context_id)?;
        buf.write_all(&self.auth_value)
    }

    /// Returns the on-wire length of this verifier once serialised. This is
    /// the value declared in the common header's `auth_length`.
    pub fn serialised_len(&self) -> u32 {
        (AUTH_TRAILER_LEN + self.auth_value.len()) as u32
    }
}

/// Carves the declared verifier off the tail of a PDU body, returning the
/// remaining head and the verifier (if any).
pub(crate) fn split_verifier(
    body: &[u8],
    auth_length: u16,
) -> Result<(&[u8], Option<AuthVerifier>), Error> {
    if auth_length == 0 {
        return Ok((body, None));
    }

    let auth_length = usize::from(auth_length);
    if auth_length < AUTH_TRAILER_LEN || auth_length > body.len() {
        return Err(Error::InvalidLength);
    }

    let split = body.len() - auth_length;
    let verifier = AuthVerifier::from_bytes(&body[split..])?;

    Ok((&body[..split], Some(verifier)))
}

/// Returns the `auth_length` value for an optional verifier.
pub(crate) fn auth_length(verifier: &Option<AuthVerifier>) -> u16 {
    verifier.as_ref().map_or(0, |v| v.serialised_len() as u16)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_verifier_round_trip() {
        // NTLMSSP (10), privacy level (6), no pad, context id 0, then the
        // opaque credential.
        let raw = hex!("0a 06 00 00 00 00 00 00 de ad be ef");

        let verifier = AuthVerifier::from_bytes(&raw).expect("failed to parse verifier");
        assert_eq!(verifier.auth_type, 10);
        assert_eq!(verifier.auth_level, 6);
        assert_eq!(verifier.auth_pad_length, 0);
        assert_eq!(verifier.auth_context_id, 0);
        assert_eq!(verifier.auth_value, hex!("de ad be ef"));
        assert_eq!(verifier.serialised_len(), raw.len() as u32);

        let mut buf = Cursor::new(Vec::new());
        verifier.serialise_into(&mut buf).expect("failed to serialise");
        assert_eq!(buf.into_inner().as_slice(), raw.as_ref());
    }

    #[test]
    fn test_split_without_verifier() {
        let body = hex!("01 02 03 04");

        let (stub, verifier) = split_verifier(&body, 0).expect("failed to split");
        assert_eq!(stub, body.as_ref());
        assert_eq!(verifier, None);
    }

    #[test]
    fn test_split_carves_trailing_bytes() {
        let body = hex!("01 02 03 04 0a 06 00 00 00 00 00 00 de ad be ef");

        let (stub, verifier) = split_verifier(&body, 12).expect("failed to split");
        assert_eq!(stub, hex!("01 02 03 04").as_ref());
        assert_eq!(verifier.expect("no verifier").auth_value, hex!("de ad be ef"));
    }

    #[test]
    fn test_split_rejects_short_auth_length() {
        let body = hex!("01 02 03 04 05 06 07 08");

        assert_eq!(split_verifier(&body, 4).unwrap_err(), Error::InvalidLength);
    }

    #[test]
    fn test_split_rejects_oversized_auth_length() {
        let body = hex!("01 02 03 04");

        assert_eq!(split_verifier(&body, 12).unwrap_err(), Error::InvalidLength);
    }
}

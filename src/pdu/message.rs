use std::io::Cursor;

use crate::pdu::{
    Bind, BindAck, Fault, PduHeader, PduType, Request, Response, COMMON_HEADER_LEN,
};
use crate::Error;

/// One framed connection-oriented DCE/RPC message of any type this crate
/// decodes.
///
/// Decoding branches on the PDU type byte of the common header; each variant
/// carries only its own body fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    /// A presentation negotiation proposal.
    Bind(Bind),
    /// The server's answer to a [`Bind`].
    BindAck(BindAck),
    /// A client call.
    Request(Request),
    /// The server's answer to a [`Request`].
    Response(Response),
    /// A per-call failure report.
    Fault(Fault),
}

impl Pdu {
    /// Deserialises a new [`Pdu`] from `buf`.
    ///
    /// Buf must contain exactly 1 PDU - if the fragment length declared in
    /// the common header disagrees with the buffer length,
    /// [`Error::IncompleteMessage`] is returned.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let header = checked_header(buf)?;

        match header.pdu_type {
            PduType::Bind => Ok(Self::Bind(Bind::decode(&header, buf)?)),
            PduType::BindAck => Ok(Self::BindAck(BindAck::decode(&header, buf)?)),
            PduType::Request => Ok(Self::Request(Request::decode(&header, buf)?)),
            PduType::Response => Ok(Self::Response(Response::decode(&header, buf)?)),
            PduType::Fault => Ok(Self::Fault(Fault::decode(&header, buf)?)),
        }
    }

    /// Serialises this `Pdu` into a new [`Vec`], computing the fragment and
    /// auth length header fields from the current body.
    ///
    /// [`Vec`]: std::vec::Vec
    pub fn serialise(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Bind(b) => b.serialise(),
            Self::BindAck(b) => b.serialise(),
            Self::Request(b) => b.serialise(),
            Self::Response(b) => b.serialise(),
            Self::Fault(b) => b.serialise(),
        }
    }

    /// Returns the on-wire length of this message once serialised, including
    /// the common header.
    pub fn serialised_len(&self) -> u32 {
        match self {
            Self::Bind(b) => b.serialised_len(),
            Self::BindAck(b) => b.serialised_len(),
            Self::Request(b) => b.serialised_len(),
            Self::Response(b) => b.serialised_len(),
            Self::Fault(b) => b.serialised_len(),
        }
    }

    /// Returns the type code variant of this message.
    pub fn pdu_type(&self) -> PduType {
        match self {
            Self::Bind(_) => PduType::Bind,
            Self::BindAck(_) => PduType::BindAck,
            Self::Request(_) => PduType::Request,
            Self::Response(_) => PduType::Response,
            Self::Fault(_) => PduType::Fault,
        }
    }

    /// Returns the call id correlating this message with its peer.
    pub fn call_id(&self) -> u32 {
        match self {
            Self::Bind(b) => b.call_id,
            Self::BindAck(b) => b.call_id,
            Self::Request(b) => b.call_id,
            Self::Response(b) => b.call_id,
            Self::Fault(b) => b.call_id,
        }
    }

    /// Overwrites the call id of this message.
    pub(crate) fn set_call_id(&mut self, call_id: u32) {
        match self {
            Self::Bind(b) => b.call_id = call_id,
            Self::BindAck(b) => b.call_id = call_id,
            Self::Request(b) => b.call_id = call_id,
            Self::Response(b) => b.call_id = call_id,
            Self::Fault(b) => b.call_id = call_id,
        }
    }
}

impl TryFrom<&[u8]> for Pdu {
    type Error = Error;

    fn try_from(v: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(v)
    }
}

/// Reads the common header from the head of `data` and returns the expected
/// on-wire length of the whole PDU.
///
/// Returns `None` when fewer bytes than the fixed header prefix holding the
/// fragment length are available. Used by stream transports to frame
/// inbound PDUs.
pub fn expected_pdu_len(data: &[u8]) -> Option<usize> {
    // The fragment length field sits at offset 8 of the common header.
    if data.len() < 10 {
        return None;
    }

    Some(usize::from(u16::from_le_bytes([data[8], data[9]])))
}

/// Parses the common header of `data` and validates the declared fragment
/// length against the buffer.
pub(crate) fn checked_header(data: &[u8]) -> Result<PduHeader, Error> {
    let mut r = Cursor::new(data);
    let header = PduHeader::from_cursor(&mut r)?;

    if data.len() != usize::from(header.frag_length) {
        return Err(Error::IncompleteMessage {
            buffer_len: data.len(),
            expected: usize::from(header.frag_length),
        });
    }

    // The verifier must fit after the common header; body decoders validate
    // the tighter bound against their fixed fields.
    if usize::from(header.auth_length) + COMMON_HEADER_LEN > data.len() {
        return Err(Error::InvalidLength);
    }

    Ok(header)
}

/// Parses the common header as [`checked_header`], additionally requiring
/// the PDU type to be `expected`.
pub(crate) fn checked_header_of_type(data: &[u8], expected: PduType) -> Result<PduHeader, Error> {
    let header = checked_header(data)?;

    if header.pdu_type != expected {
        return Err(Error::UnexpectedPduType {
            expected,
            got: header.pdu_type,
        });
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_expected_pdu_len() {
        let raw = hex!("05 00 00 03 10 00 00 00 2c 00 00 00 07 00 00 00");

        assert_eq!(expected_pdu_len(&raw), Some(0x2c));
        assert_eq!(expected_pdu_len(&raw[..9]), None);
        assert_eq!(expected_pdu_len(&[]), None);
    }

    #[test]
    fn test_from_bytes_rejects_unknown_type() {
        let raw = hex!("05 00 63 03 10 00 00 00 10 00 00 00 01 00 00 00");

        assert_eq!(Pdu::from_bytes(&raw).unwrap_err(), Error::InvalidPduType(0x63));
    }

    #[test]
    fn test_from_bytes_rejects_frag_length_mismatch() {
        // Header declares 0x2c bytes but only the header is present.
        let raw = hex!("05 00 00 03 10 00 00 00 2c 00 00 00 07 00 00 00");

        assert_eq!(
            Pdu::from_bytes(&raw).unwrap_err(),
            Error::IncompleteMessage {
                buffer_len: 16,
                expected: 0x2c,
            }
        );
    }

    #[test]
    fn test_from_bytes_rejects_oversized_auth_length() {
        // A request with auth_length larger than the whole PDU.
        let raw = hex!(
            "05 00 00 03 10 00 00 00 18 00 40 00 07 00 00 00
             00 00 00 00 00 00 00 00"
        );

        assert_eq!(Pdu::from_bytes(&raw).unwrap_err(), Error::InvalidLength);
    }
}

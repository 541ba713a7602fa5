use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::verifier::{auth_length, split_verifier};
use crate::pdu::{
    checked_header_of_type, AuthVerifier, DataRepresentation, PduHeader, PduType, PfcFlags,
    COMMON_HEADER_LEN, RPC_VERS, RPC_VERS_MINOR,
};
use crate::Error;

const FIXED_BODY_LEN: usize = 8;

/// The server's answer to a [`Request`](crate::pdu::Request), carrying the
/// marshalled output parameters as stub data.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The protocol major version, 5 unless overridden.
    pub rpc_vers: u8,
    /// The protocol minor version, 0 unless overridden.
    pub rpc_vers_minor: u8,
    /// The PFC flag bitset of the common header.
    pub pfc_flags: PfcFlags,
    /// The data representation label of the common header.
    pub drep: DataRepresentation,
    /// The call id of the [`Request`](crate::pdu::Request) being answered.
    pub call_id: u32,
    /// A hint of the total stub size, or 0 when not provided.
    pub alloc_hint: u32,
    /// The presentation context the stub is marshalled for.
    pub context_id: u16,
    /// How many times the call was cancelled while in progress.
    pub cancel_count: u8,
    /// The marshalled output parameters, opaque to this layer.
    pub stub_data: Vec<u8>,
    /// The optional authentication verifier trailer.
    pub auth_verifier: Option<AuthVerifier>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            rpc_vers: RPC_VERS,
            rpc_vers_minor: RPC_VERS_MINOR,
            pfc_flags: PfcFlags::default(),
            drep: DataRepresentation::default(),
            call_id: 0,
            alloc_hint: 0,
            context_id: 0,
            cancel_count: 0,
            stub_data: Vec::new(),
            auth_verifier: None,
        }
    }
}

impl Response {
    /// Deserialises a new [`Response`] from `buf`, which must contain
    /// exactly one PDU of this type.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let header = checked_header_of_type(buf, PduType::Response)?;
        Self::decode(&header, buf)
    }

    pub(crate) fn decode(header: &PduHeader, data: &[u8]) -> Result<Self, Error> {
        let (body, auth_verifier) = split_verifier(&data[COMMON_HEADER_LEN..], header.auth_length)?;

        let mut r = Cursor::new(body);
        let alloc_hint = r.read_u32::<LittleEndian>()?;
        let context_id = r.read_u16::<LittleEndian>()?;
        let cancel_count = r.read_u8()?;
        let _reserved = r.read_u8()?;

        let stub_data = body[r.position() as usize..].to_vec();

        Ok(Self {
            rpc_vers: header.rpc_vers,
            rpc_vers_minor: header.rpc_vers_minor,
            pfc_flags: header.pfc_flags,
            drep: header.drep,
            call_id: header.call_id,
            alloc_hint,
            context_id,
            cancel_count,
            stub_data,
            auth_verifier,
        })
    }

    /// Serialises this `Response` into a new [`Vec`], computing the fragment
    /// and auth length header fields from the current body.
    ///
    /// [`Vec`]: std::vec::Vec
    pub fn serialise(&self) -> Result<Vec<u8>, Error> {
        let frag_length = self.serialised_len();
        let frag_length =
            u16::try_from(frag_length).map_err(|_| Error::OversizedPdu(frag_length as usize))?;

        let header = PduHeader {
            rpc_vers: self.rpc_vers,
            rpc_vers_minor: self.rpc_vers_minor,
            pdu_type: PduType::Response,
            pfc_flags: self.pfc_flags,
            drep: self.drep,
            frag_length,
            auth_length: auth_length(&self.auth_verifier),
            call_id: self.call_id,
        };

        let mut buf = Cursor::new(Vec::with_capacity(usize::from(frag_length)));
        header.serialise_into(&mut buf)?;
        buf.write_u32::<LittleEndian>(self.alloc_hint)?;
        buf.write_u16::<LittleEndian>(self.context_id)?;
        buf.write_u8(self.cancel_count)?;
        buf.write_u8(0)?;
        buf.write_all(&self.stub_data)?;
        if let Some(verifier) = &self.auth_verifier {
            verifier.serialise_into(&mut buf)?;
        }

        Ok(buf.into_inner())
    }

    /// Returns the on-wire length of this PDU once serialised, including the
    /// common header.
    pub fn serialised_len(&self) -> u32 {
        (COMMON_HEADER_LEN + FIXED_BODY_LEN) as u32
            + self.stub_data.len() as u32
            + u32::from(auth_length(&self.auth_verifier))
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::pdu::Pdu;

    #[test]
    fn test_response_golden_bytes() {
        // Response, frag length 32, call id 2, alloc hint 8, context 0,
        // cancel count 0, 8 bytes of stub.
        const RAW: [u8; 32] = hex!(
            "05 00 02 03 10 00 00 00 20 00 00 00 02 00 00 00
             08 00 00 00 00 00 00 00
             00 00 00 00 05 00 00 00"
        );

        let response = Response {
            call_id: 2,
            alloc_hint: 8,
            stub_data: hex!("00 00 00 00 05 00 00 00").to_vec(),
            ..Response::default()
        };
        assert_eq!(response.serialised_len(), 32);

        let serialised = response.serialise().expect("failed to serialise");
        assert_eq!(serialised.as_slice(), RAW.as_ref());

        let got = Response::from_bytes(&serialised).expect("failed to parse response");
        assert_eq!(got, response);
    }

    #[test]
    fn test_verifier_carved_from_stub() {
        let response = Response {
            stub_data: hex!("aa bb").to_vec(),
            auth_verifier: Some(AuthVerifier {
                auth_type: 10,
                auth_level: 6,
                auth_pad_length: 2,
                auth_context_id: 1,
                auth_value: hex!("00 11 22").to_vec(),
            }),
            ..Response::default()
        };

        let serialised = response.serialise().expect("failed to serialise");
        assert_eq!(u16::from_le_bytes([serialised[10], serialised[11]]), 11);

        let got = Response::from_bytes(&serialised).expect("failed to parse response");
        assert_eq!(got, response);
    }

    #[test]
    fn test_response_polymorphic_decode() {
        let response = Response {
            call_id: 9,
            stub_data: vec![7; 12],
            ..Response::default()
        };
        let serialised = response.serialise().expect("failed to serialise");

        match Pdu::from_bytes(&serialised).expect("failed to parse PDU") {
            Pdu::Response(got) => assert_eq!(got, response),
            v => panic!("unexpected pdu variant {v:?}"),
        }
    }
}

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::pdu::verifier::{auth_length, split_verifier};
use crate::pdu::{
    checked_header_of_type, read_slice_bytes, AuthVerifier, DataRepresentation, PduHeader, PduType,
    PfcFlags, COMMON_HEADER_LEN, RPC_VERS, RPC_VERS_MINOR,
};
use crate::Error;

const FIXED_BODY_LEN: usize = 8;

/// A client call: the operation number to invoke on a bound context, and the
/// marshalled stub data for its input parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The protocol major version, 5 unless overridden.
    pub rpc_vers: u8,
    /// The protocol minor version, 0 unless overridden.
    pub rpc_vers_minor: u8,
    /// The PFC flag bitset of the common header.
    ///
    /// The object UUID bit is derived from [`object_uuid`](Self::object_uuid)
    /// on serialisation, so the flag cannot disagree with the field.
    pub pfc_flags: PfcFlags,
    /// The data representation label of the common header.
    pub drep: DataRepresentation,
    /// The call id; assigned by the connection on send.
    pub call_id: u32,
    /// A hint of the total stub size, or 0 when not provided.
    pub alloc_hint: u32,
    /// The presentation context the stub is marshalled for.
    pub context_id: u16,
    /// The operation number within the bound interface.
    pub opnum: u16,
    /// The optional object UUID qualifying the call.
    pub object_uuid: Option<Uuid>,
    /// The marshalled input parameters, opaque to this layer.
    pub stub_data: Vec<u8>,
    /// The optional authentication verifier trailer.
    pub auth_verifier: Option<AuthVerifier>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            rpc_vers: RPC_VERS,
            rpc_vers_minor: RPC_VERS_MINOR,
            pfc_flags: PfcFlags::default(),
            drep: DataRepresentation::default(),
            call_id: 0,
            alloc_hint: 0,
            context_id: 0,
            opnum: 0,
            object_uuid: None,
            stub_data: Vec::new(),
            auth_verifier: None,
        }
    }
}

impl Request {
    /// Deserialises a new [`Request`] from `buf`, which must contain exactly
    /// one PDU of this type.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let header = checked_header_of_type(buf, PduType::Request)?;
        Self::decode(&header, buf)
    }

    pub(crate) fn decode(header: &PduHeader, data: &[u8]) -> Result<Self, Error> {
        let (body, auth_verifier) = split_verifier(&data[COMMON_HEADER_LEN..], header.auth_length)?;

        let mut r = Cursor::new(body);
        let alloc_hint = r.read_u32::<LittleEndian>()?;
        let context_id = r.read_u16::<LittleEndian>()?;
        let opnum = r.read_u16::<LittleEndian>()?;

        // The object UUID is present if and only if the header flag says so.
        let object_uuid = if header.pfc_flags.contains(PfcFlags::OBJECT_UUID) {
            let uuid_bytes = read_slice_bytes(&mut r, 16)?;
            let mut uuid = [0u8; 16];
            uuid.copy_from_slice(uuid_bytes);
            Some(Uuid::from_bytes_le(uuid))
        } else {
            None
        };

        // Everything between the fixed body and the verifier is stub data.
        let stub_data = body[r.position() as usize..].to_vec();

        Ok(Self {
            rpc_vers: header.rpc_vers,
            rpc_vers_minor: header.rpc_vers_minor,
            pfc_flags: header.pfc_flags,
            drep: header.drep,
            call_id: header.call_id,
            alloc_hint,
            context_id,
            opnum,
            object_uuid,
            stub_data,
            auth_verifier,
        })
    }

    /// Serialises this `Request` into a new [`Vec`], computing the fragment
    /// and auth length header fields from the current body.
    ///
    /// [`Vec`]: std::vec::Vec
    pub fn serialise(&self) -> Result<Vec<u8>, Error> {
        let frag_length = self.serialised_len();
        let frag_length =
            u16::try_from(frag_length).map_err(|_| Error::OversizedPdu(frag_length as usize))?;

        let mut pfc_flags = self.pfc_flags;
        pfc_flags.set(PfcFlags::OBJECT_UUID, self.object_uuid.is_some());

        let header = PduHeader {
            rpc_vers: self.rpc_vers,
            rpc_vers_minor: self.rpc_vers_minor,
            pdu_type: PduType::Request,
            pfc_flags,
            drep: self.drep,
            frag_length,
            auth_length: auth_length(&self.auth_verifier),
            call_id: self.call_id,
        };

        let mut buf = Cursor::new(Vec::with_capacity(usize::from(frag_length)));
        header.serialise_into(&mut buf)?;
        buf.write_u32::<LittleEndian>(self.alloc_hint)?;
        buf.write_u16::<LittleEndian>(self.context_id)?;
        buf.write_u16::<LittleEndian>(self.opnum)?;
        if let Some(uuid) = &self.object_uuid {
            buf.write_all(&uuid.to_bytes_le())?;
        }
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
            + self.object_uuid.map_or(0, |_| 16)
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
    fn test_request_golden_bytes() {
        // Request, frag length 28, call id 2, alloc hint 4, context 0,
        // opnum 9, 4 bytes of stub.
        const RAW: [u8; 28] = hex!(
            "05 00 00 03 10 00 00 00 1c 00 00 00 02 00 00 00
             04 00 00 00 00 00 09 00
             de ad be ef"
        );

        let request = Request {
            call_id: 2,
            alloc_hint: 4,
            opnum: 9,
            stub_data: hex!("de ad be ef").to_vec(),
            ..Request::default()
        };
        assert_eq!(request.serialised_len(), 28);

        let serialised = request.serialise().expect("failed to serialise");
        assert_eq!(serialised.as_slice(), RAW.as_ref());

        let got = Request::from_bytes(&serialised).expect("failed to parse request");
        assert_eq!(got, request);
    }

    #[test]
    fn test_object_uuid_offsets_stub() {
        let request = Request {
            call_id: 3,
            opnum: 1,
            object_uuid: Some(Uuid::from_u128(0x99fcfec4_5260_101b_bbcb_00aa0021347a)),
            stub_data: hex!("01 02 03 04").to_vec(),
            ..Request::default()
        };

        let serialised = request.serialise().expect("failed to serialise");

        // The object UUID flag is derived on serialisation, and the stub
        // begins at offset 24 of the body.
        assert_eq!(serialised[3] & 0x80, 0x80);
        let body = &serialised[COMMON_HEADER_LEN..];
        assert_eq!(&body[24..], hex!("01 02 03 04"));

        let got = Request::from_bytes(&serialised).expect("failed to parse request");
        assert_eq!(got.object_uuid, request.object_uuid);
        assert_eq!(got.stub_data, request.stub_data);
        assert_eq!(
            got.pfc_flags,
            PfcFlags::FIRST_FRAG | PfcFlags::LAST_FRAG | PfcFlags::OBJECT_UUID
        );
    }

    #[test]
    fn test_no_auth_stub_takes_all_trailing_bytes() {
        let request = Request {
            stub_data: vec![0xaa; 37],
            ..Request::default()
        };

        let serialised = request.serialise().expect("failed to serialise");
        let got = Request::from_bytes(&serialised).expect("failed to parse request");
        assert_eq!(got.stub_data.len(), 37);
        assert_eq!(got.auth_verifier, None);
    }

    #[test]
    fn test_verifier_carved_from_stub() {
        let request = Request {
            stub_data: hex!("01 02 03 04").to_vec(),
            auth_verifier: Some(AuthVerifier {
                auth_type: 10,
                auth_level: 6,
                auth_pad_length: 0,
                auth_context_id: 0,
                auth_value: hex!("fe ed fa ce").to_vec(),
            }),
            ..Request::default()
        };

        let serialised = request.serialise().expect("failed to serialise");

        // auth_length covers the 8 byte trailer and the credential.
        assert_eq!(u16::from_le_bytes([serialised[10], serialised[11]]), 12);

        let got = Request::from_bytes(&serialised).expect("failed to parse request");
        assert_eq!(got.stub_data, hex!("01 02 03 04"));
        assert_eq!(got.auth_verifier, request.auth_verifier);
    }

    #[test]
    fn test_request_polymorphic_decode() {
        let request = Request {
            opnum: 7,
            stub_data: vec![1, 2, 3],
            ..Request::default()
        };
        let serialised = request.serialise().expect("failed to serialise");

        match Pdu::from_bytes(&serialised).expect("failed to parse PDU") {
            Pdu::Request(got) => assert_eq!(got, request),
            v => panic!("unexpected pdu variant {v:?}"),
        }
    }
}

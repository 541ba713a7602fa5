use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::verifier::{auth_length, split_verifier};
use crate::pdu::{
    checked_header_of_type, AuthVerifier, DataRepresentation, PduHeader, PduType, PfcFlags,
    COMMON_HEADER_LEN, RPC_VERS, RPC_VERS_MINOR,
};
use crate::Error;

const FIXED_BODY_LEN: usize = 16;

/// A per-call failure report from the server, carrying a 32-bit status code
/// and optionally the partial results marshalled before the failure.
///
/// A fault ends one call; it does not invalidate the connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// The protocol major version, 5 unless overridden.
    pub rpc_vers: u8,
    /// The protocol minor version, 0 unless overridden.
    pub rpc_vers_minor: u8,
    /// The PFC flag bitset of the common header.
    pub pfc_flags: PfcFlags,
    /// The data representation label of the common header.
    pub drep: DataRepresentation,
    /// The call id of the failed call.
    pub call_id: u32,
    /// A hint of the total stub size, or 0 when not provided.
    pub alloc_hint: u32,
    /// The presentation context of the failed call.
    pub context_id: u16,
    /// How many times the call was cancelled while in progress.
    pub cancel_count: u8,
    /// The fault status code.
    pub status: u32,
    /// Partial output parameters, if the server marshalled any.
    pub stub_data: Vec<u8>,
    /// The optional authentication verifier trailer.
    pub auth_verifier: Option<AuthVerifier>,
}

impl Default for Fault {
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
            status: 0,
            stub_data: Vec::new(),
            auth_verifier: None,
        }
    }
}

impl Fault {
    /// Deserialises a new [`Fault`] from `buf`, which must contain exactly
    /// one PDU of this type.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let header = checked_header_of_type(buf, PduType::Fault)?;
        Self::decode(&header, buf)
    }

    pub(crate) fn decode(header: &PduHeader, data: &[u8]) -> Result<Self, Error> {
        let (body, auth_verifier) = split_verifier(&data[COMMON_HEADER_LEN..], header.auth_length)?;

        let mut r = Cursor::new(body);
        let alloc_hint = r.read_u32::<LittleEndian>()?;
        let context_id = r.read_u16::<LittleEndian>()?;
        let cancel_count = r.read_u8()?;
        let _reserved = r.read_u8()?;
        let status = r.read_u32::<LittleEndian>()?;
        let _reserved2 = r.read_u32::<LittleEndian>()?;

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
            status,
            stub_data,
            auth_verifier,
        })
    }

    /// Serialises this `Fault` into a new [`Vec`], computing the fragment
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
            pdu_type: PduType::Fault,
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
        buf.write_u32::<LittleEndian>(self.status)?;
        buf.write_u32::<LittleEndian>(0)?;
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

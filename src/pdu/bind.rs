use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::verifier::{auth_length, split_verifier};
use crate::pdu::{
    checked_header_of_type, AuthVerifier, ContextList, DataRepresentation, PduHeader, PduType,
    PfcFlags, COMMON_HEADER_LEN, RPC_VERS, RPC_VERS_MINOR,
};
use crate::Error;

/// The default maximum fragment size advertised in both directions.
pub const DEFAULT_MAX_FRAG: u16 = 4280;

const FIXED_BODY_LEN: usize = 8;

/// The presentation negotiation proposal opening a connection: the contexts
/// the client wants the association to carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    /// The protocol major version, 5 unless overridden.
    pub rpc_vers: u8,
    /// The protocol minor version, 0 unless overridden.
    pub rpc_vers_minor: u8,
    /// The PFC flag bitset of the common header.
    pub pfc_flags: PfcFlags,
    /// The data representation label of the common header.
    pub drep: DataRepresentation,
    /// The call id; assigned by the connection on send.
    pub call_id: u32,
    /// The largest fragment the client will transmit.
    pub max_xmit_frag: u16,
    /// The largest fragment the client will accept.
    pub max_recv_frag: u16,
    /// The association group to join, or 0 to open a new one.
    pub assoc_group_id: u32,
    /// The proposed presentation contexts.
    pub context_list: ContextList,
    /// The optional authentication verifier trailer.
    pub auth_verifier: Option<AuthVerifier>,
}

impl Default for Bind {
    fn default() -> Self {
        Self {
            rpc_vers: RPC_VERS,
            rpc_vers_minor: RPC_VERS_MINOR,
            pfc_flags: PfcFlags::default(),
            drep: DataRepresentation::default(),
            call_id: 0,
            max_xmit_frag: DEFAULT_MAX_FRAG,
            max_recv_frag: DEFAULT_MAX_FRAG,
            assoc_group_id: 0,
            context_list: ContextList::default(),
            auth_verifier: None,
        }
    }
}

impl Bind {
    /// Deserialises a new [`Bind`] from `buf`, which must contain exactly
    /// one PDU of this type.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let header = checked_header_of_type(buf, PduType::Bind)?;
        Self::decode(&header, buf)
    }

    pub(crate) fn decode(header: &PduHeader, data: &[u8]) -> Result<Self, Error> {
        let (body, auth_verifier) = split_verifier(&data[COMMON_HEADER_LEN..], header.auth_length)?;

        let mut r = Cursor::new(body);
        let max_xmit_frag = r.read_u16::<LittleEndian>()?;
        let max_recv_frag = r.read_u16::<LittleEndian>()?;
        let assoc_group_id = r.read_u32::<LittleEndian>()?;
        let context_list = ContextList::from_cursor(&mut r)?;

        Ok(Self {
            rpc_vers: header.rpc_vers,
            rpc_vers_minor: header.rpc_vers_minor,
            pfc_flags: header.pfc_flags,
            drep: header.drep,
            call_id: header.call_id,
            max_xmit_frag,
            max_recv_frag,
            assoc_group_id,
            context_list,
            auth_verifier,
        })
    }

    /// Serialises this `Bind` into a new [`Vec`], computing the fragment and
    /// auth length header fields from the current body.
    ///
    /// [`Vec`]: std::vec::Vec
    pub fn serialise(&self) -> Result<Vec<u8>, Error> {
        let frag_length = self.serialised_len();
        let frag_length =
            u16::try_from(frag_length).map_err(|_| Error::OversizedPdu(frag_length as usize))?;

        let header = PduHeader {
            rpc_vers: self.rpc_vers,
            rpc_vers_minor: self.rpc_vers_minor,
            pdu_type: PduType::Bind,
            pfc_flags: self.pfc_flags,
            drep: self.drep,
            frag_length,
            auth_length: auth_length(&self.auth_verifier),
            call_id: self.call_id,
        };

        let mut buf = Cursor::new(Vec::with_capacity(usize::from(frag_length)));
        header.serialise_into(&mut buf)?;
        buf.write_u16::<LittleEndian>(self.max_xmit_frag)?;
        buf.write_u16::<LittleEndian>(self.max_recv_frag)?;
        buf.write_u32::<LittleEndian>(self.assoc_group_id)?;
        self.context_list.serialise_into(&mut buf)?;
        if let Some(verifier) = &self.auth_verifier {
            verifier.serialise_into(&mut buf)?;
        }

        Ok(buf.into_inner())
    }

    /// Returns the on-wire length of this PDU once serialised, including the
    /// common header.
    pub fn serialised_len(&self) -> u32 {
        (COMMON_HEADER_LEN + FIXED_BODY_LEN) as u32
            + self.context_list.serialised_len()
            + u32::from(auth_length(&self.auth_verifier))
    }
}

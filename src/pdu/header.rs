use std::io::{Cursor, Write};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::DataRepresentation;
use crate::Error;

/// The length of the PDU common header shared by every PDU type.
pub const COMMON_HEADER_LEN: usize = 16;

/// The protocol major version carried by every locally built PDU.
pub const RPC_VERS: u8 = 5;

/// The protocol minor version carried by every locally built PDU.
pub const RPC_VERS_MINOR: u8 = 0;

const PDU_TYPE_REQUEST: u8 = 0;
const PDU_TYPE_RESPONSE: u8 = 2;
const PDU_TYPE_FAULT: u8 = 3;
const PDU_TYPE_BIND: u8 = 11;
const PDU_TYPE_BIND_ACK: u8 = 12;

/// The PDU type code carried in the third byte of the common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduType {
    /// A client call invoking an operation.
    Request,
    /// The server's answer to a [`Request`](PduType::Request).
    Response,
    /// A per-call failure report from the server.
    Fault,
    /// The presentation negotiation handshake opener.
    Bind,
    /// The server's acceptance (full or partial) of a
    /// [`Bind`](PduType::Bind).
    BindAck,
}

impl PduType {
    /// Returns the wire code for this PDU type.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Request => PDU_TYPE_REQUEST,
            Self::Response => PDU_TYPE_RESPONSE,
            Self::Fault => PDU_TYPE_FAULT,
            Self::Bind => PDU_TYPE_BIND,
            Self::BindAck => PDU_TYPE_BIND_ACK,
        }
    }
}

impl TryFrom<u8> for PduType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            PDU_TYPE_REQUEST => Ok(Self::Request),
            PDU_TYPE_RESPONSE => Ok(Self::Response),
            PDU_TYPE_FAULT => Ok(Self::Fault),
            PDU_TYPE_BIND => Ok(Self::Bind),
            PDU_TYPE_BIND_ACK => Ok(Self::BindAck),
            v => Err(Error::InvalidPduType(v)),
        }
    }
}

bitflags! {
    /// The PFC flag bitset in the fourth byte of the common header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PfcFlags: u8 {
        /// This PDU is the first fragment of the call.
        const FIRST_FRAG = 0x01;
        /// This PDU is the last fragment of the call.
        const LAST_FRAG = 0x02;
        /// Cancel was pending at sender.
        const PENDING_CANCEL = 0x04;
        /// Reserved bit, carried verbatim.
        const RESERVED_1 = 0x08;
        /// The sender supports concurrent multiplexing of one association.
        const CONC_MPX = 0x10;
        /// The call did not execute (fault PDUs only).
        const DID_NOT_EXECUTE = 0x20;
        /// "Maybe" call semantics requested.
        const MAYBE = 0x40;
        /// A non-nil object UUID follows the fixed request body.
        const OBJECT_UUID = 0x80;
    }
}

impl Default for PfcFlags {
    fn default() -> Self {
        Self::FIRST_FRAG | Self::LAST_FRAG
    }
}

/// The decoded PDU common header, threaded through body decoders as a
/// pre-parsed parameter bundle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PduHeader {
    pub(crate) rpc_vers: u8,
    pub(crate) rpc_vers_minor: u8,
    pub(crate) pdu_type: PduType,
    pub(crate) pfc_flags: PfcFlags,
    pub(crate) drep: DataRepresentation,
    pub(crate) frag_length: u16,
    pub(crate) auth_length: u16,
    pub(crate) call_id: u32,
}

impl PduHeader {
    /// Constructs a new `PduHeader` by parsing the wire format read from
    /// `r`, advancing the cursor by [`COMMON_HEADER_LEN`] bytes.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let remaining = r
            .get_ref()
            .len()
            .saturating_sub(r.position() as usize);
        if remaining < COMMON_HEADER_LEN {
            return Err(Error::IncompleteHeader);
        }

        let rpc_vers = r.read_u8()?;
        let rpc_vers_minor = r.read_u8()?;
        let pdu_type = PduType::try_from(r.read_u8()?)?;
        // All eight flag bits are defined, so every byte value is a valid
        // bitset.
        let pfc_flags = PfcFlags::from_bits_retain(r.read_u8()?);
        let drep = DataRepresentation::from_cursor(r)?;
        let frag_length = r.read_u16::<LittleEndian>()?;
        let auth_length = r.read_u16::<LittleEndian>()?;
        let call_id = r.read_u32::<LittleEndian>()?;

        Ok(Self {
            rpc_vers,
            rpc_vers_minor,
            pdu_type,
            pfc_flags,
            drep,
            frag_length,
            auth_length,
            call_id,
        })
    }

    /// Serialises this header into `buf`, advancing the cursor position by
    /// [`COMMON_HEADER_LEN`] bytes.
    pub(crate) fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u8(self.rpc_vers)?;
        buf.write_u8(self.rpc_vers_minor)?;
        buf.write_u8(self.pdu_type.as_u8())?;
        buf.write_u8(self.pfc_flags.bits())?;
        self.drep.serialise_into(&mut buf)?;
        buf.write_u16::<LittleEndian>(self.frag_length)?;
        buf.write_u16::<LittleEndian>(self.auth_length)?;
        buf.write_u32::<LittleEndian>(self.call_id)
    }
}

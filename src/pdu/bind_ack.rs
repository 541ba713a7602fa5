use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::verifier::{auth_length, split_verifier};
use crate::pdu::{
    checked_header_of_type, AuthVerifier, DataRepresentation, PduHeader, PduType, PfcFlags,
    PortAny, ResultList, COMMON_HEADER_LEN, DEFAULT_MAX_FRAG, RPC_VERS, RPC_VERS_MINOR,
};
use crate::Error;

const FIXED_BODY_LEN: usize = 8;

/// The server's answer to a [`Bind`](crate::pdu::Bind): negotiated fragment
/// sizes, the association group joined, the server's secondary address, and
/// a verdict for every proposed context.
#[derive(Debug, Clone, PartialEq)]
pub struct BindAck {
    /// The protocol major version, 5 unless overridden.
    pub rpc_vers: u8,
    /// The protocol minor version, 0 unless overridden.
    pub rpc_vers_minor: u8,
    /// The PFC flag bitset of the common header.
    pub pfc_flags: PfcFlags,
    /// The data representation label of the common header.
    pub drep: DataRepresentation,
    /// The call id of the [`Bind`](crate::pdu::Bind) being answered.
    pub call_id: u32,
    /// The largest fragment the server will transmit.
    pub max_xmit_frag: u16,
    /// The largest fragment the server will accept.
    pub max_recv_frag: u16,
    /// The association group the connection now belongs to.
    pub assoc_group_id: u32,
    /// The server's secondary address.
    ///
    /// Zero padding aligning the address string (terminator included) to a
    /// 4-byte boundary separates it from the result list on the wire.
    pub sec_addr: PortAny,
    /// The per-context verdicts, index-aligned with the proposed contexts.
    pub result_list: ResultList,
    /// The optional authentication verifier trailer.
    pub auth_verifier: Option<AuthVerifier>,
}

impl Default for BindAck {
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
            sec_addr: PortAny::default(),
            result_list: ResultList::default(),
            auth_verifier: None,
        }
    }
}

impl BindAck {
    /// Deserialises a new [`BindAck`] from `buf`, which must contain exactly
    /// one PDU of this type.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let header = checked_header_of_type(buf, PduType::BindAck)?;
        Self::decode(&header, buf)
    }

    pub(crate) fn decode(header: &PduHeader, data: &[u8]) -> Result<Self, Error> {
        let (body, auth_verifier) = split_verifier(&data[COMMON_HEADER_LEN..], header.auth_length)?;

        let mut r = Cursor::new(body);
        let max_xmit_frag = r.read_u16::<LittleEndian>()?;
        let max_recv_frag = r.read_u16::<LittleEndian>()?;
        let assoc_group_id = r.read_u32::<LittleEndian>()?;

        let sec_addr = PortAny::from_cursor(&mut r)?;

        // Skip the padding between the secondary address and the result
        // list.
        let pos = r.position() + u64::from(sec_addr_pad(&sec_addr));
        if pos > body.len() as u64 {
            return Err(Error::InvalidLength);
        }
        r.set_position(pos);

        let result_list = ResultList::from_cursor(&mut r)?;

        Ok(Self {
            rpc_vers: header.rpc_vers,
            rpc_vers_minor: header.rpc_vers_minor,
            pfc_flags: header.pfc_flags,
            drep: header.drep,
            call_id: header.call_id,
            max_xmit_frag,
            max_recv_frag,
            assoc_group_id,
            sec_addr,
            result_list,
            auth_verifier,
        })
    }

    /// Serialises this `BindAck` into a new [`Vec`], computing the fragment
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
            pdu_type: PduType::BindAck,
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
        self.sec_addr.serialise_into(&mut buf)?;

        const PADDING: [u8; 3] = [0; 3];
        buf.write_all(&PADDING[..sec_addr_pad(&self.sec_addr) as usize])?;

        self.result_list.serialise_into(&mut buf)?;
        if let Some(verifier) = &self.auth_verifier {
            verifier.serialise_into(&mut buf)?;
        }

        Ok(buf.into_inner())
    }

    /// Returns the on-wire length of this PDU once serialised, including the
    /// common header.
    pub fn serialised_len(&self) -> u32 {
        (COMMON_HEADER_LEN + FIXED_BODY_LEN) as u32
            + self.sec_addr.serialised_len()
            + sec_addr_pad(&self.sec_addr)
            + self.result_list.serialised_len()
            + u32::from(auth_length(&self.auth_verifier))
    }
}

/// Zero bytes inserted after the secondary address, aligning the address
/// string (terminator included) to the next 4-byte boundary.
fn sec_addr_pad(sec_addr: &PortAny) -> u32 {
    // The string and terminator, without the 2-byte length prefix.
    let len = sec_addr.serialised_len() - 2;
    (4 - (len % 4)) % 4
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::pdu::{ContextNegotiationResult, Pdu, NDR_TRANSFER_SYNTAX};

    fn lsass_bind_ack() -> BindAck {
        BindAck {
            call_id: 1,
            sec_addr: PortAny::new("\\PIPE\\lsass"),
            result_list: ResultList::from(vec![ContextNegotiationResult::acceptance(
                NDR_TRANSFER_SYNTAX,
            )]),
            ..BindAck::default()
        }
    }

    #[test]
    fn test_bind_ack_golden_bytes() {
        // BindAck, frag length 66, call id 1.
        //     Max Xmit Frag: 4280
        //     Max Recv Frag: 4280
        //     Assoc Group: 0x00000000
        //     Scndry Addr len: 12, "\PIPE\lsass\0" (aligned, no padding)
        //     Num results: 1
        //         Acceptance, NDR transfer syntax V2
        const RAW: [u8; 66] = hex!(
            "05 00 0c 03 10 00 00 00 42 00 00 00 01 00 00 00
             b8 10 b8 10 00 00 00 00
             0c 00 5c 50 49 50 45 5c 6c 73 61 73 73 00
             01 00 00 00
             00 00 00 00
             04 5d 88 8a eb 1c c9 11 9f e8 08 00 2b 10 48 60 02 00 00 00"
        );

        let ack = lsass_bind_ack();
        assert_eq!(ack.serialised_len(), 66);

        let serialised = ack.serialise().expect("failed to serialise");
        assert_eq!(serialised.as_slice(), RAW.as_ref());

        let got = BindAck::from_bytes(&serialised).expect("failed to parse bind ack");
        assert_eq!(got, ack);
    }

    #[test]
    fn test_sec_addr_padding_boundaries() {
        // An address string of length 3 ("AB\0") takes 1 pad byte, length 4
        // ("ABC\0") none, length 5 ("ABCD\0") 3.
        for (spec, pad) in [("AB", 1u32), ("ABC", 0), ("ABCD", 3)] {
            let ack = BindAck {
                sec_addr: PortAny::new(spec),
                ..lsass_bind_ack()
            };

            let serialised = ack.serialise().expect("failed to serialise");
            assert_eq!(serialised.len() as u32, ack.serialised_len());

            let base = (COMMON_HEADER_LEN + FIXED_BODY_LEN) as u32;
            let expect =
                base + ack.sec_addr.serialised_len() + pad + ack.result_list.serialised_len();
            assert_eq!(serialised.len() as u32, expect);

            let got = BindAck::from_bytes(&serialised).expect("failed to parse bind ack");
            assert_eq!(got, ack);
        }
    }

    #[test]
    fn test_bind_ack_polymorphic_decode() {
        let serialised = lsass_bind_ack().serialise().expect("failed to serialise");

        match Pdu::from_bytes(&serialised).expect("failed to parse PDU") {
            Pdu::BindAck(ack) => assert_eq!(ack, lsass_bind_ack()),
            v => panic!("unexpected pdu variant {v:?}"),
        }
    }
}

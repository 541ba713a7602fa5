use thiserror::Error;

use crate::pdu::PduType;

/// Error types returned by this crate.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// The fragment length in the common header disagrees with the amount of
    /// data in the buffer.
    ///
    /// This error may also be returned if a body decoder consumed a
    /// different amount of data than the header declared - in this case,
    /// `buffer_len` will be more than `expected` and may indicate a parsing
    /// error.
    #[error("incomplete PDU (got {buffer_len} bytes, expected {expected})")]
    IncompleteMessage {
        /// The length of the buffer provided.
        buffer_len: usize,

        /// The length declared by the PDU common header.
        expected: usize,
    },

    /// The buffer is too small to contain the 16-byte PDU common header.
    #[error("incomplete PDU common header")]
    IncompleteHeader,

    /// The PDU type code in the common header is not one this crate decodes.
    ///
    /// Unknown type codes are rejected as malformed rather than skipped:
    /// without a decodable header the byte stream is no longer
    /// self-synchronising.
    #[error("invalid PDU type {0}")]
    InvalidPduType(u8),

    /// A PDU decoded successfully, but it is not the type the caller (or the
    /// protocol exchange) required.
    #[error("unexpected PDU type {got:?} (expected {expected:?})")]
    UnexpectedPduType {
        /// The PDU type required at this point of the exchange.
        expected: PduType,

        /// The PDU type actually decoded.
        got: PduType,
    },

    /// The data representation format label contains a representation this
    /// crate does not recognise, or its reserved bytes are non-zero.
    #[error("invalid data representation format label")]
    InvalidDataRepresentation,

    /// A variable length type has a malformed length value which would
    /// exceed the length of the buffer, or a non-zero auth length too small
    /// to hold the verifier trailer.
    #[error("invalid length in PDU")]
    InvalidLength,

    /// The context negotiation result code is not one of the specified
    /// [result codes](crate::pdu::NegotiationResultCode).
    ///
    /// This is a violation of the protocol.
    #[error("invalid context negotiation result {0}")]
    InvalidNegotiationResult(u16),

    /// The context negotiation reason code is not one of the specified
    /// [reason codes](crate::pdu::ProviderReason).
    ///
    /// This is a violation of the protocol.
    #[error("invalid context negotiation reason {0}")]
    InvalidNegotiationReason(u16),

    /// An NDR string payload is not valid UTF-16.
    #[error("string payload is not valid UTF-16")]
    InvalidString,

    /// A port specification contains non-ASCII bytes.
    #[error("port specification is not ASCII")]
    InvalidPortSpec,

    /// A call was issued with a call id that already has a response
    /// outstanding on the same connection.
    #[error("call id {0} already has an outstanding call")]
    DuplicateCallId(u32),

    /// The connection was torn down (transport failure, undecodable inbound
    /// PDU, or explicit close) while the call was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// The strictly monotonic call id counter reached the end of the u32
    /// space, aborting the connection.
    #[error("call id space exhausted")]
    CallIdExhausted,

    /// The process-wide NDR referent id counter reached the end of its
    /// space. No further pointers can be marshalled by this process.
    #[error("referent id space exhausted")]
    ReferentIdExhausted,

    /// The serialised PDU would not fit the 16-bit fragment length field.
    ///
    /// Fragmenting one logical call across multiple PDUs is not supported,
    /// so such a PDU cannot be sent.
    #[error("PDU of {0} bytes exceeds the fragment length field")]
    OversizedPdu(usize),

    /// The server answered the call with a fault PDU.
    #[error("fault response with status {status:#010x}")]
    Fault {
        /// The fault status code reported by the server.
        status: u32,
    },

    /// A client-protocol operation completed with a non-zero return code.
    #[error("operation failed with return code {code:#010x} ({})", description.unwrap_or("unrecognised"))]
    Operation {
        /// The raw return code from the response stub.
        code: u32,

        /// The name given to this code by the protocol's return-code table,
        /// if it has an entry.
        description: Option<&'static str>,
    },

    /// An I/O error occurred when trying to parse the buffer.
    #[error("i/o error ({0:?}): {1}")]
    IOError(std::io::ErrorKind, String),
}

impl From<std::io::Error> for Error {
    fn from(v: std::io::Error) -> Self {
        Self::IOError(v.kind(), v.to_string())
    }
}

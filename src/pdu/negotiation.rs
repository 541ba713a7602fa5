use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::PresentationSyntax;
use crate::Error;

const RESULT_ACCEPTANCE: u16 = 0;
const RESULT_USER_REJECTION: u16 = 1;
const RESULT_PROVIDER_REJECTION: u16 = 2;

const REASON_NOT_SPECIFIED: u16 = 0;
const REASON_ABSTRACT_SYNTAX_NOT_SUPPORTED: u16 = 1;
const REASON_PROPOSED_TRANSFER_SYNTAXES_NOT_SUPPORTED: u16 = 2;
const REASON_LOCAL_LIMIT_EXCEEDED: u16 = 3;

/// The server's verdict on one proposed presentation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationResultCode {
    /// The context was accepted with one of the proposed transfer syntaxes.
    Acceptance,
    /// The context was rejected on behalf of the user.
    UserRejection,
    /// The context was rejected by the provider itself.
    ProviderRejection,
}

impl TryFrom<u16> for NegotiationResultCode {
    type Error = Error;

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            RESULT_ACCEPTANCE => Ok(Self::Acceptance),
            RESULT_USER_REJECTION => Ok(Self::UserRejection),
            RESULT_PROVIDER_REJECTION => Ok(Self::ProviderRejection),
            v => Err(Error::InvalidNegotiationResult(v)),
        }
    }
}

impl NegotiationResultCode {
    fn as_u16(self) -> u16 {
        match self {
            Self::Acceptance => RESULT_ACCEPTANCE,
            Self::UserRejection => RESULT_USER_REJECTION,
            Self::ProviderRejection => RESULT_PROVIDER_REJECTION,
        }
    }
}

/// The provider's reason for rejecting a presentation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderReason {
    /// No reason given (also carried on acceptance).
    #[default]
    NotSpecified,
    /// The server does not expose the proposed abstract syntax.
    AbstractSyntaxNotSupported,
    /// None of the proposed transfer syntaxes are acceptable.
    ProposedTransferSyntaxesNotSupported,
    /// A server-local limit was exceeded.
    LocalLimitExceeded,
}

impl TryFrom<u16> for ProviderReason {
    type Error = Error;

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            REASON_NOT_SPECIFIED => Ok(Self::NotSpecified),
            REASON_ABSTRACT_SYNTAX_NOT_SUPPORTED => Ok(Self::AbstractSyntaxNotSupported),
            REASON_PROPOSED_TRANSFER_SYNTAXES_NOT_SUPPORTED => {
                Ok(Self::ProposedTransferSyntaxesNotSupported)
            }
            REASON_LOCAL_LIMIT_EXCEEDED => Ok(Self::LocalLimitExceeded),
            v => Err(Error::InvalidNegotiationReason(v)),
        }
    }
}

impl ProviderReason {
    fn as_u16(self) -> u16 {
        match self {
            Self::NotSpecified => REASON_NOT_SPECIFIED,
            Self::AbstractSyntaxNotSupported => REASON_ABSTRACT_SYNTAX_NOT_SUPPORTED,
            Self::ProposedTransferSyntaxesNotSupported => {
                REASON_PROPOSED_TRANSFER_SYNTAXES_NOT_SUPPORTED
            }
            Self::LocalLimitExceeded => REASON_LOCAL_LIMIT_EXCEEDED,
        }
    }
}

/// One entry of a [`BindAck`](crate::pdu::BindAck) result list: the verdict
/// on the context element at the same index of the proposed context list.
///
/// The selected transfer syntax is present on the wire if and only if the
/// result is [`NegotiationResultCode::Acceptance`]; otherwise it contributes
/// zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextNegotiationResult {
    /// The verdict for the context.
    pub result: NegotiationResultCode,
    /// The reason for a rejection.
    pub reason: ProviderReason,
    /// The transfer syntax selected on acceptance.
    pub transfer_syntax: Option<PresentationSyntax>,
}

impl ContextNegotiationResult {
    /// Constructs an accepting result selecting `transfer_syntax`.
    pub fn acceptance(transfer_syntax: PresentationSyntax) -> Self {
        Self {
            result: NegotiationResultCode::Acceptance,
            reason: ProviderReason::NotSpecified,
            transfer_syntax: Some(transfer_syntax),
        }
    }

    /// Constructs a rejecting result with the given verdict and reason.
    pub fn rejection(result: NegotiationResultCode, reason: ProviderReason) -> Self {
        Self {
            result,
            reason,
            transfer_syntax: None,
        }
    }

    /// Constructs a new `ContextNegotiationResult` by parsing the wire
    /// format read from `r`, advancing the cursor to the end of the result.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let result = NegotiationResultCode::try_from(r.read_u16::<LittleEndian>()?)?;
        let reason = ProviderReason::try_from(r.read_u16::<LittleEndian>()?)?;

        let transfer_syntax = match result {
            NegotiationResultCode::Acceptance => Some(PresentationSyntax::from_cursor(r)?),
            _ => None,
        };

        Ok(Self {
            result,
            reason,
            transfer_syntax,
        })
    }

    /// Serialises this result into `buf`, advancing the cursor position by
    /// [`serialised_len`](ContextNegotiationResult::serialised_len) bytes.
    pub fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        buf.write_u16::<LittleEndian>(self.result.as_u16())?;
        buf.write_u16::<LittleEndian>(self.reason.as_u16())?;

        if let Some(syntax) = &self.transfer_syntax {
            syntax.serialise_into(&mut buf)?;
        }

        Ok(())
    }

    /// Returns the on-wire length of this result once serialised.
    pub fn serialised_len(&self) -> u32 {
        match self.transfer_syntax {
            Some(_) => (4 + PresentationSyntax::LEN) as u32,
            None => 4,
        }
    }
}

/// The list of per-context verdicts in a [`BindAck`](crate::pdu::BindAck).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultList {
    /// The verdicts, index-aligned with the proposed context list.
    pub results: Vec<ContextNegotiationResult>,
}

impl ResultList {
    /// Constructs a new `ResultList` by parsing the wire format read from
    /// `r`, advancing the cursor to the end of the list.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let n_results = r.read_u8()?;
        let _reserved = r.read_u8()?;
        let _reserved2 = r.read_u16::<LittleEndian>()?;

        let mut results = Vec::with_capacity(usize::from(n_results));
        for _ in 0..n_results {
            results.push(ContextNegotiationResult::from_cursor(r)?);
        }

        Ok(Self { results })
    }

    /// Serialises this `ResultList` into `buf`, advancing the cursor
    /// position by [`serialised_len`](ResultList::serialised_len) bytes.
    ///
    /// # Panics
    ///
    /// Panics if more than 255 results are provided.
    pub fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        let n_results = u8::try_from(self.results.len()).expect("more than 255 results");

        buf.write_u8(n_results)?;
        buf.write_u8(0)?;
        buf.write_u16::<LittleEndian>(0)?;

        for result in &self.results {
            result.serialise_into(&mut buf)?;
        }

        Ok(())
    }

    /// Returns the on-wire length of this list once serialised.
    pub fn serialised_len(&self) -> u32 {
        4 + self
            .results
            .iter()
            .map(ContextNegotiationResult::serialised_len)
            .sum::<u32>()
    }
}

impl From<Vec<ContextNegotiationResult>> for ResultList {
    fn from(results: Vec<ContextNegotiationResult>) -> Self {
        Self { results }
    }
}

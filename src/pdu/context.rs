use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::pdu::PresentationSyntax;
use crate::Error;

/// A single presentation context proposed in a [`Bind`](crate::pdu::Bind):
/// one abstract syntax paired with the transfer syntaxes the client is
/// willing to marshal it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextElement {
    /// The context id later used to select this context on a per-call basis.
    pub context_id: u16,
    /// The interface the client wants to talk.
    pub abstract_syntax: PresentationSyntax,
    /// The transfer syntaxes proposed for the interface, in preference
    /// order.
    pub transfer_syntaxes: Vec<PresentationSyntax>,
}

impl ContextElement {
    /// Constructs a new context element.
    pub fn new(
        context_id: u16,
        abstract_syntax: PresentationSyntax,
        transfer_syntaxes: Vec<PresentationSyntax>,
    ) -> Self {
        Self {
            context_id,
            abstract_syntax,
            transfer_syntaxes,
        }
    }

    /// Constructs a new `ContextElement` by parsing the wire format read
    /// from `r`, advancing the cursor to the end of the element.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let context_id = r.read_u16::<LittleEndian>()?;
        let n_transfer_syn = r.read_u8()?;
        let _reserved = r.read_u8()?;

        let abstract_syntax = PresentationSyntax::from_cursor(r)?;

        let mut transfer_syntaxes = Vec::with_capacity(usize::from(n_transfer_syn));
        for _ in 0..n_transfer_syn {
            transfer_syntaxes.push(PresentationSyntax::from_cursor(r)?);
        }

        Ok(Self {
            context_id,
            abstract_syntax,
            transfer_syntaxes,
        })
    }

    /// Serialises this `ContextElement` into `buf`, advancing the cursor
    /// position by [`serialised_len`](ContextElement::serialised_len) bytes.
    ///
    /// # Panics
    ///
    /// Panics if more than 255 transfer syntaxes are provided.
    pub fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        let n_transfer_syn =
            u8::try_from(self.transfer_syntaxes.len()).expect("more than 255 transfer syntaxes");

        buf.write_u16::<LittleEndian>(self.context_id)?;
        buf.write_u8(n_transfer_syn)?;
        buf.write_u8(0)?;

        self.abstract_syntax.serialise_into(&mut buf)?;
        for syntax in &self.transfer_syntaxes {
            syntax.serialise_into(&mut buf)?;
        }

        Ok(())
    }

    /// Returns the on-wire length of this element once serialised.
    pub fn serialised_len(&self) -> u32 {
        (4 + PresentationSyntax::LEN * (1 + self.transfer_syntaxes.len())) as u32
    }
}

/// The list of presentation contexts proposed by a
/// [`Bind`](crate::pdu::Bind).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextList {
    /// The proposed contexts, in context id order by convention.
    pub elements: Vec<ContextElement>,
}

impl ContextList {
    /// Constructs a new `ContextList` by parsing the wire format read from
    /// `r`, advancing the cursor to the end of the list.
    pub(crate) fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let n_context_elem = r.read_u8()?;
        let _reserved = r.read_u8()?;
        let _reserved2 = r.read_u16::<LittleEndian>()?;

        let mut elements = Vec::with_capacity(usize::from(n_context_elem));
        for _ in 0..n_context_elem {
            elements.push(ContextElement::from_cursor(r)?);
        }

        Ok(Self { elements })
    }

    /// Serialises this `ContextList` into `buf`, advancing the cursor
    /// position by [`serialised_len`](ContextList::serialised_len) bytes.
    ///
    /// # Panics
    ///
    /// Panics if more than 255 elements are provided.
    pub fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        let n_context_elem = u8::try_from(self.elements.len()).expect("more than 255 contexts");

        buf.write_u8(n_context_elem)?;
        buf.write_u8(0)?;
        buf.write_u16::<LittleEndian>(0)?;

        for element in &self.elements {
            element.serialise_into(&mut buf)?;
        }

        Ok(())
    }

    /// Returns the on-wire length of this list once serialised.
    pub fn serialised_len(&self) -> u32 {
        4 + self
            .elements
            .iter()
            .map(ContextElement::serialised_len)
            .sum::<u32>()
    }
}

impl From<Vec<ContextElement>> for ContextList {
    fn from(elements: Vec<ContextElement>) -> Self {
        Self { elements }
    }
}

//! Network Data Representation (NDR) transfer syntax primitives used to
//! marshal stub data.
//!
//! These types perform no I/O: they translate between Rust values and the
//! little-endian NDR wire form. Structures are padded with NUL bytes to a
//! 4-byte boundary at the enclosing boundary; [`pad`] and [`pad_length`]
//! implement that rule for callers assembling stubs.

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::Error;

mod array;
pub use array::*;

mod pointer;
pub use pointer::*;

mod string;
pub use string::*;

mod union;
pub use union::*;

/// The NDR structure alignment boundary.
pub const ALIGNMENT: usize = 4;

/// A value encodable in the NDR transfer syntax.
pub trait NdrType: Sized {
    /// Constructs the value by parsing the wire format read from `r`.
    ///
    /// `from_cursor` advances the position of `r` by exactly the number of
    /// bytes consumed.
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error>;

    /// Serialises this value into `buf`, advancing the cursor position by
    /// [`serialised_len`](NdrType::serialised_len) bytes.
    fn serialise_into<W: Write>(&self, buf: W) -> Result<(), std::io::Error>;

    /// Returns the on-wire length of this value once serialised, before any
    /// enclosing-boundary padding.
    fn serialised_len(&self) -> u32;

    /// Serialises this value into a new [`Vec`] padded with NUL bytes to the
    /// next [`ALIGNMENT`] boundary.
    ///
    /// [`Vec`]: std::vec::Vec
    fn serialise_padded(&self) -> Result<Vec<u8>, std::io::Error> {
        let mut buf = Vec::with_capacity(pad_length(self.serialised_len() as usize, ALIGNMENT));
        self.serialise_into(&mut buf)?;
        pad(&mut buf, ALIGNMENT);
        Ok(buf)
    }
}

// `DWORD` fields and pointer referents thereof.
impl NdrType for u32 {
    fn from_cursor(r: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        use byteorder::{LittleEndian, ReadBytesExt};
        Ok(r.read_u32::<LittleEndian>()?)
    }

    fn serialise_into<W: Write>(&self, mut buf: W) -> Result<(), std::io::Error> {
        use byteorder::{LittleEndian, WriteBytesExt};
        buf.write_u32::<LittleEndian>(*self)
    }

    fn serialised_len(&self) -> u32 {
        4
    }
}

/// Returns `len` rounded up to the next multiple of `multiple`.
pub fn pad_length(len: usize, multiple: usize) -> usize {
    len + (multiple - len % multiple) % multiple
}

/// Right-pads `data` with NUL bytes to the next multiple of `multiple`.
pub fn pad(data: &mut Vec<u8>, multiple: usize) {
    data.resize(pad_length(data.len(), multiple), 0);
}

// Referent ids must be unique within a marshalling stream, so they are drawn
// from one process-wide counter that is never reset.
static NEXT_REFERENT_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates the next referent id from the process-wide source.
///
/// Ids are strictly monotonic over the life of the process, in
/// `[1, u32::MAX)`; 0 is reserved for the null pointer. Exhausting the space
/// is fatal for further pointer marshalling.
pub(crate) fn next_referent_id() -> Result<u32, Error> {
    let mut current = NEXT_REFERENT_ID.load(Ordering::Relaxed);
    loop {
        if current == u32::MAX {
            return Err(Error::ReferentIdExhausted);
        }

        match NEXT_REFERENT_ID.compare_exchange_weak(
            current,
            current + 1,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return Ok(current),
            Err(observed) => current = observed,
        }
    }
}

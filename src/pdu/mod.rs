//! Connection-oriented DCE/RPC PDU types and their wire serialisation.
//!
//! Every multi-byte integer is little-endian and every UUID is carried in
//! the mixed-endian `bytes_le` form, per the Microsoft profile of DCE 1.1.

use std::io::Cursor;

use crate::Error;

mod header;
pub use header::*;

mod message;
pub use message::*;

mod drep;
pub use drep::*;

mod syntax;
pub use syntax::*;

mod context;
pub use context::*;

mod negotiation;
pub use negotiation::*;

mod port_any;
pub use port_any::*;

mod verifier;
pub use verifier::*;

mod bind;
pub use bind::*;

mod bind_ack;
pub use bind_ack::*;

mod request;
pub use request::*;

mod response;
pub use response::*;

mod fault;
pub use fault::*;

/// Returns a subslice of len bytes from c without copying if it is safe to
/// do so.
pub(crate) fn read_slice_bytes<'a>(c: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8], Error> {
    let data = *c.get_ref();
    let start = c.position() as usize;
    let end = start
        .checked_add(len)
        .ok_or(Error::InvalidLength)?;

    // Validate the subslice is within the data buffer
    if end > data.len() {
        return Err(Error::InvalidLength);
    }

    c.set_position(end as u64);
    Ok(&data[start..end])
}

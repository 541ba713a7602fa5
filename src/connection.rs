use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::pdu::{Bind, BindAck, ContextList, Pdu, PduType};
use crate::transport::{ReadTransport, WriteTransport};
use crate::Error;

/// Depth of the outbound and inbound PDU queues.
const QUEUE_DEPTH: usize = 32;

type CompletionSender = oneshot::Sender<Result<Pdu, Error>>;

/// The outstanding calls of one connection, keyed by call id.
#[derive(Debug, Default)]
struct PendingCalls {
    calls: HashMap<u32, CompletionSender>,
    closed: bool,
}

/// Shared handle to the call map, mutated by caller tasks (insert, cancel)
/// and the correlator (remove on completion).
#[derive(Debug, Clone, Default)]
struct SharedCalls(Arc<Mutex<PendingCalls>>);

impl SharedCalls {
    fn with<T>(&self, f: impl FnOnce(&mut PendingCalls) -> T) -> T {
        // The map stays consistent even if a holder panicked mid-update.
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Registers a new outstanding call, returning the receiver its response
    /// will be delivered on.
    fn register(&self, call_id: u32) -> Result<oneshot::Receiver<Result<Pdu, Error>>, Error> {
        let (tx, rx) = oneshot::channel();

        self.with(|pending| {
            if pending.closed {
                return Err(Error::ConnectionClosed);
            }
            if pending.calls.contains_key(&call_id) {
                return Err(Error::DuplicateCallId(call_id));
            }

            pending.calls.insert(call_id, tx);
            Ok(())
        })?;

        Ok(rx)
    }

    /// Completes the call registered under `call_id`, returning false when
    /// no such call is outstanding.
    fn complete(&self, call_id: u32, result: Result<Pdu, Error>) -> bool {
        match self.with(|pending| pending.calls.remove(&call_id)) {
            // The caller may have been cancelled since; dropping the result
            // is fine.
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Detaches the call registered under `call_id`, if still outstanding.
    fn unregister(&self, call_id: u32) {
        self.with(|pending| {
            pending.calls.remove(&call_id);
        });
    }

    /// Marks the connection closed and completes every outstanding call with
    /// [`Error::ConnectionClosed`].
    fn close(&self) {
        let outstanding = self.with(|pending| {
            pending.closed = true;
            pending.calls.drain().collect::<Vec<_>>()
        });

        for (call_id, tx) in outstanding {
            trace!(call_id, "completing outstanding call on close");
            let _ = tx.send(Err(Error::ConnectionClosed));
        }
    }
}

/// A response not yet received: the suspension handle returned by
/// [`Connection::send_message`].
///
/// Await [`response`](PendingResponse::response) to receive the correlated
/// PDU. Dropping the handle cancels the call: its entry is removed from the
/// correlator and a late response is discarded with a warning.
#[derive(Debug)]
pub struct PendingResponse {
    call_id: u32,
    rx: oneshot::Receiver<Result<Pdu, Error>>,
    calls: SharedCalls,
}

impl PendingResponse {
    /// The call id this handle is keyed under.
    pub fn call_id(&self) -> u32 {
        self.call_id
    }

    /// Waits for the response PDU correlated to this call.
    pub async fn response(mut self) -> Result<Pdu, Error> {
        match (&mut self.rx).await {
            Ok(result) => result,
            // The sender was dropped without completing the call.
            Err(_) => Err(Error::ConnectionClosed),
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.calls.unregister(self.call_id);
    }
}

/// A call-multiplexing client connection over one PDU transport.
///
/// Opening a connection spawns three cooperative tasks: an outbound pump
/// serialising and writing queued PDUs in order, an inbound pump reading and
/// decoding PDUs from the transport, and a correlator completing the pending
/// call keyed by each inbound PDU's call id. Any number of calls may be in
/// flight concurrently; responses may arrive in any order.
///
/// An undecodable inbound PDU or a transport failure closes the connection
/// and completes every outstanding call with [`Error::ConnectionClosed`], as
/// does dropping the `Connection`. Per-call failures (a fault, an unexpected
/// PDU type) reach only the caller that issued the call.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::Sender<Pdu>,
    calls: SharedCalls,
    next_call_id: AtomicU32,
    pumps: Vec<JoinHandle<()>>,
}

impl Connection {
    /// Opens a connection over the given transport halves, spawning its
    /// pump tasks on the current tokio runtime.
    pub fn open<R, W>(reader: R, writer: W) -> Self
    where
        R: ReadTransport + 'static,
        W: WriteTransport + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_DEPTH);
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_DEPTH);
        let calls = SharedCalls::default();

        let pumps = vec![
            tokio::spawn(outbound_pump(writer, outbound_rx, calls.clone())),
            tokio::spawn(inbound_pump(reader, inbound_tx, calls.clone())),
            tokio::spawn(correlate(inbound_rx, calls.clone())),
        ];

        Self {
            outbound: outbound_tx,
            calls,
            next_call_id: AtomicU32::new(1),
            pumps,
        }
    }

    /// Negotiates the presentation contexts in `context_list`, returning the
    /// server's [`BindAck`].
    ///
    /// Fails with [`Error::UnexpectedPduType`] if the server answers with
    /// anything other than a bind ack; the connection stays open.
    pub async fn bind(&self, context_list: ContextList) -> Result<BindAck, Error> {
        self.bind_with(Bind {
            context_list,
            ..Bind::default()
        })
        .await
    }

    /// As [`bind`](Connection::bind), sending the caller-built `bind` PDU
    /// to override negotiation defaults. The call id is assigned on send.
    pub async fn bind_with(&self, bind: Bind) -> Result<BindAck, Error> {
        let pending = self.send_message(Pdu::Bind(bind)).await?;

        match pending.response().await? {
            Pdu::BindAck(ack) => Ok(ack),
            Pdu::Fault(fault) => Err(Error::Fault {
                status: fault.status,
            }),
            other => Err(Error::UnexpectedPduType {
                expected: PduType::BindAck,
                got: other.pdu_type(),
            }),
        }
    }

    /// Assigns the next call id to `pdu`, enqueues it for the outbound pump,
    /// and returns the handle its response will resolve.
    pub async fn send_message(&self, mut pdu: Pdu) -> Result<PendingResponse, Error> {
        let call_id = self.allocate_call_id()?;
        pdu.set_call_id(call_id);
        self.enqueue(pdu, call_id).await
    }

    /// As [`send_message`](Connection::send_message), keeping the call id
    /// already present in `pdu`.
    ///
    /// Fails with [`Error::DuplicateCallId`] if that call id already has a
    /// response outstanding.
    pub async fn send_message_with_call_id(&self, pdu: Pdu) -> Result<PendingResponse, Error> {
        let call_id = pdu.call_id();
        self.enqueue(pdu, call_id).await
    }

    /// Closes the connection: cancels the pump tasks and completes every
    /// outstanding call with [`Error::ConnectionClosed`].
    pub fn close(&self) {
        for pump in &self.pumps {
            pump.abort();
        }
        self.calls.close();
    }

    async fn enqueue(&self, pdu: Pdu, call_id: u32) -> Result<PendingResponse, Error> {
        let rx = self.calls.register(call_id)?;

        trace!(call_id, pdu_type = ?pdu.pdu_type(), "enqueueing PDU");
        if self.outbound.send(pdu).await.is_err() {
            self.calls.unregister(call_id);
            return Err(Error::ConnectionClosed);
        }

        Ok(PendingResponse {
            call_id,
            rx,
            calls: self.calls.clone(),
        })
    }

    /// Draws the next call id. Call ids are strictly monotonic from 1;
    /// running out aborts the connection.
    fn allocate_call_id(&self) -> Result<u32, Error> {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        if call_id == u32::MAX {
            self.close();
            return Err(Error::CallIdExhausted);
        }

        Ok(call_id)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Dequeues outbound PDUs, serialises them and writes them to the transport
/// in enqueue order.
async fn outbound_pump<W: WriteTransport>(
    mut writer: W,
    mut queue: mpsc::Receiver<Pdu>,
    calls: SharedCalls,
) {
    while let Some(pdu) = queue.recv().await {
        let call_id = pdu.call_id();

        let frame = match pdu.serialise() {
            Ok(frame) => frame,
            Err(error) => {
                // An unserialisable PDU fails its own call, not the
                // connection.
                warn!(call_id, %error, "failed to serialise outbound PDU");
                calls.complete(call_id, Err(error));
                continue;
            }
        };

        trace!(call_id, length = frame.len(), "writing PDU");
        if let Err(error) = writer.write_pdu(&frame).await {
            debug!(%error, "transport write failed");
            break;
        }
    }

    calls.close();
}

/// Reads one PDU at a time from the transport, decodes it and forwards it to
/// the correlator.
async fn inbound_pump<R: ReadTransport>(
    mut reader: R,
    queue: mpsc::Sender<Pdu>,
    calls: SharedCalls,
) {
    loop {
        let frame = match reader.read_pdu().await {
            Ok(frame) => frame,
            Err(error) => {
                debug!(%error, "transport read failed");
                break;
            }
        };

        // A PDU that does not decode leaves the inbound stream without a
        // trustworthy framing reference, so it ends the connection.
        let pdu = match Pdu::from_bytes(&frame) {
            Ok(pdu) => pdu,
            Err(error) => {
                warn!(%error, "malformed inbound PDU, closing connection");
                break;
            }
        };

        trace!(call_id = pdu.call_id(), pdu_type = ?pdu.pdu_type(), "PDU received");
        if queue.send(pdu).await.is_err() {
            break;
        }
    }

    calls.close();
}

/// Dequeues inbound PDUs and completes the pending call keyed by their call
/// id.
async fn correlate(mut queue: mpsc::Receiver<Pdu>, calls: SharedCalls) {
    while let Some(pdu) = queue.recv().await {
        let call_id = pdu.call_id();
        if !calls.complete(call_id, Ok(pdu)) {
            // Completed, cancelled, or never issued here.
            warn!(call_id, "discarding response with no outstanding call");
        }
    }
}

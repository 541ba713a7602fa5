use std::future::Future;
use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::pdu::expected_pdu_len;

/// The receive half of a PDU transport: each call yields exactly one PDU's
/// worth of bytes.
///
/// Message framing is the transport's responsibility, typically by honoring
/// the fragment length field of the common header (see [`FramedReader`]) or
/// by an outer message boundary such as a named pipe transaction.
pub trait ReadTransport: Send {
    /// Reads exactly one PDU from the peer.
    fn read_pdu(&mut self) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// The send half of a PDU transport: each call writes one whole PDU.
pub trait WriteTransport: Send {
    /// Writes one PDU atomically, returning the number of bytes written.
    fn write_pdu(&mut self, pdu: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

/// A [`ReadTransport`] over any byte stream, framing inbound PDUs by the
/// fragment length field of the common header.
#[derive(Debug)]
pub struct FramedReader<S> {
    stream: S,
    buf: BytesMut,
}

impl<S> FramedReader<S> {
    /// Wraps `stream` with an empty read buffer.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
        }
    }

    /// Consumes self, returning the stream and any buffered leftover bytes.
    pub fn into_inner(self) -> (S, BytesMut) {
        (self.stream, self.buf)
    }
}

impl<S> ReadTransport for FramedReader<S>
where
    S: AsyncRead + Unpin + Send,
{
    async fn read_pdu(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(length) = expected_pdu_len(&self.buf) {
                if self.buf.len() >= length {
                    return Ok(self.buf.split_to(length).to_vec());
                }
                self.buf.reserve(length - self.buf.len());
            }

            let read = self.stream.read_buf(&mut self.buf).await?;

            // Handle EOF
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "transport closed",
                ));
            }
        }
    }
}

/// A [`WriteTransport`] over any byte stream.
#[derive(Debug)]
pub struct FramedWriter<S> {
    stream: S,
}

impl<S> FramedWriter<S> {
    /// Wraps `stream`.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Consumes self, returning the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> WriteTransport for FramedWriter<S>
where
    S: AsyncWrite + Unpin + Send,
{
    async fn write_pdu(&mut self, pdu: &[u8]) -> io::Result<usize> {
        self.stream.write_all(pdu).await?;
        self.stream.flush().await?;
        Ok(pdu.len())
    }
}

/// Splits a duplex byte stream into the framed transport halves a
/// [`Connection`](crate::Connection) consumes.
pub fn framed<S>(stream: S) -> (FramedReader<ReadHalf<S>>, FramedWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read_half, write_half) = tokio::io::split(stream);
    (FramedReader::new(read_half), FramedWriter::new(write_half))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::pdu::{Pdu, Request};

    #[tokio::test]
    async fn test_reader_reassembles_split_pdu() {
        let request = Request {
            call_id: 1,
            stub_data: vec![0xab; 24],
            ..Request::default()
        };
        let frame = request.serialise().expect("failed to serialise");

        let (client, mut server) = tokio::io::duplex(1024);
        let (mut reader, _writer) = framed(client);

        // Dribble the PDU into the stream in two writes.
        let (first, second) = frame.split_at(7);
        server.write_all(first).await.expect("failed to write");

        let second = second.to_vec();
        let feeder = tokio::spawn(async move {
            server.write_all(&second).await.expect("failed to write");
            server
        });

        let got = reader.read_pdu().await.expect("failed to read PDU");
        assert_eq!(got, frame);
        feeder.await.expect("feeder panicked");
    }

    #[tokio::test]
    async fn test_reader_splits_back_to_back_pdus() {
        let first = Request {
            call_id: 1,
            ..Request::default()
        };
        let second = Request {
            call_id: 2,
            stub_data: hex!("01 02 03").to_vec(),
            ..Request::default()
        };

        let (client, mut server) = tokio::io::duplex(1024);
        let (mut reader, _writer) = framed(client);

        let mut wire = first.serialise().expect("failed to serialise");
        wire.extend(second.serialise().expect("failed to serialise"));
        server.write_all(&wire).await.expect("failed to write");

        let frame = reader.read_pdu().await.expect("failed to read PDU");
        assert_eq!(Pdu::from_bytes(&frame).expect("failed to parse").call_id(), 1);

        let frame = reader.read_pdu().await.expect("failed to read PDU");
        assert_eq!(Pdu::from_bytes(&frame).expect("failed to parse").call_id(), 2);
    }

    #[tokio::test]
    async fn test_reader_eof_mid_pdu() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (mut reader, _writer) = framed(client);

        server
            .write_all(&hex!("05 00 00 03 10 00 00 00 40 00"))
            .await
            .expect("failed to write");
        drop(server);

        let err = reader.read_pdu().await.expect_err("expected EOF error");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_writer_round_trip() {
        let (client, server) = tokio::io::duplex(1024);
        let (_reader, mut writer) = framed(client);
        let (mut peer_reader, _peer_writer) = framed(server);

        let frame = Request::default().serialise().expect("failed to serialise");
        let written = writer.write_pdu(&frame).await.expect("failed to write PDU");
        assert_eq!(written, frame.len());

        let got = peer_reader.read_pdu().await.expect("failed to read PDU");
        assert_eq!(got, frame);
    }
}

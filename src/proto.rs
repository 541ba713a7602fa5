use crate::connection::Connection;
use crate::pdu::{Pdu, PduType, Request};
use crate::Error;

/// One operation of an upper-layer client protocol: its operation number,
/// its stub marshalling, and the response message it pairs with.
///
/// Implementations own the protocol knowledge; this layer only moves stub
/// bytes through [`Request`] and [`Response`](crate::pdu::Response) PDUs.
pub trait ClientProtocolRequest {
    /// The operation number carried in the request PDU.
    const OPNUM: u16;

    /// The response message type for this operation.
    type Response: ClientProtocolResponse;

    /// Marshals this request into request PDU stub data.
    fn serialise_stub(&self) -> Vec<u8>;
}

/// A response message of an upper-layer client protocol, decoded from
/// response PDU stub data.
pub trait ClientProtocolResponse: Sized {
    /// Unmarshals the response from response PDU stub data.
    fn from_stub(data: &[u8]) -> Result<Self, Error>;

    /// The operation's return code; 0 is success.
    fn return_code(&self) -> u32;

    /// The protocol's return-code table: maps a return code to its name, or
    /// `None` when the table has no entry for it.
    fn error_description(return_code: u32) -> Option<&'static str>;
}

/// Sends `request` over `connection` and decodes the correlated response.
///
/// The exchange insists on a [`Response`](crate::pdu::Response) PDU: a fault
/// surfaces as [`Error::Fault`] and any other PDU type as
/// [`Error::UnexpectedPduType`]. With `raise` set, a non-zero return code in
/// the decoded response is mapped through the protocol's return-code table
/// into [`Error::Operation`]; otherwise the decoded response is returned
/// intact for the caller to inspect.
pub async fn obtain_response<R>(
    connection: &Connection,
    request: &R,
    raise: bool,
) -> Result<R::Response, Error>
where
    R: ClientProtocolRequest + Sync,
{
    let pending = connection
        .send_message(Pdu::Request(Request {
            opnum: R::OPNUM,
            stub_data: request.serialise_stub(),
            ..Request::default()
        }))
        .await?;

    let response = match pending.response().await? {
        Pdu::Response(response) => response,
        Pdu::Fault(fault) => {
            return Err(Error::Fault {
                status: fault.status,
            })
        }
        other => {
            return Err(Error::UnexpectedPduType {
                expected: PduType::Response,
                got: other.pdu_type(),
            })
        }
    };

    let message = R::Response::from_stub(&response.stub_data)?;

    if raise {
        let code = message.return_code();
        if code != 0 {
            return Err(Error::Operation {
                code,
                description: R::Response::error_description(code),
            });
        }
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

    use super::*;
    use crate::pdu::Response;
    use crate::transport::framed;
    use crate::transport::{ReadTransport, WriteTransport};

    /// A minimal test protocol: opnum 2 echoes its payload and reports a
    /// return code chosen by the scripted peer.
    struct EchoRequest {
        payload: Vec<u8>,
    }

    #[derive(Debug, PartialEq)]
    struct EchoResponse {
        payload: Vec<u8>,
        return_code: u32,
    }

    impl ClientProtocolRequest for EchoRequest {
        const OPNUM: u16 = 2;
        type Response = EchoResponse;

        fn serialise_stub(&self) -> Vec<u8> {
            self.payload.clone()
        }
    }

    impl ClientProtocolResponse for EchoResponse {
        fn from_stub(data: &[u8]) -> Result<Self, Error> {
            let mut r = Cursor::new(data);
            let return_code = r.read_u32::<LittleEndian>()?;

            Ok(Self {
                payload: data[4..].to_vec(),
                return_code,
            })
        }

        fn return_code(&self) -> u32 {
            self.return_code
        }

        fn error_description(return_code: u32) -> Option<&'static str> {
            match return_code {
                5 => Some("ACCESS_DENIED"),
                _ => None,
            }
        }
    }

    /// Serves one echo call, answering with the given return code.
    fn echo_peer(return_code: u32) -> (Connection, tokio::task::JoinHandle<()>) {
        let (client, server) = tokio::io::duplex(4096);
        let (reader, writer) = framed(client);
        let connection = Connection::open(reader, writer);

        let peer = tokio::spawn(async move {
            let (mut reader, mut writer) = framed(server);

            let frame = reader.read_pdu().await.expect("peer failed to read");
            let request = match Pdu::from_bytes(&frame).expect("peer failed to parse") {
                Pdu::Request(request) => request,
                v => panic!("peer expected a request, got {v:?}"),
            };
            assert_eq!(request.opnum, EchoRequest::OPNUM);

            let mut stub = Vec::new();
            stub.write_u32::<LittleEndian>(return_code)
                .expect("peer failed to build stub");
            stub.extend_from_slice(&request.stub_data);

            let frame = Pdu::Response(Response {
                call_id: request.call_id,
                stub_data: stub,
                ..Response::default()
            })
            .serialise()
            .expect("peer failed to serialise");
            writer.write_pdu(&frame).await.expect("peer failed to write");
        });

        (connection, peer)
    }

    #[tokio::test]
    async fn test_success_round_trip() {
        let (connection, peer) = echo_peer(0);

        let response = obtain_response(
            &connection,
            &EchoRequest {
                payload: vec![1, 2, 3],
            },
            true,
        )
        .await
        .expect("operation failed");

        assert_eq!(response.payload, vec![1, 2, 3]);
        assert_eq!(response.return_code, 0);
        peer.await.expect("peer panicked");
    }

    #[tokio::test]
    async fn test_nonzero_return_code_raises_named_error() {
        let (connection, peer) = echo_peer(5);

        let err = obtain_response(&connection, &EchoRequest { payload: vec![] }, true)
            .await
            .expect_err("operation should fail");

        assert_eq!(
            err,
            Error::Operation {
                code: 5,
                description: Some("ACCESS_DENIED"),
            }
        );
        peer.await.expect("peer panicked");
    }

    #[tokio::test]
    async fn test_unmapped_return_code_surfaces_raw() {
        let (connection, peer) = echo_peer(0xdead);

        let err = obtain_response(&connection, &EchoRequest { payload: vec![] }, true)
            .await
            .expect_err("operation should fail");

        assert_eq!(
            err,
            Error::Operation {
                code: 0xdead,
                description: None,
            }
        );
        peer.await.expect("peer panicked");
    }

    #[tokio::test]
    async fn test_raise_false_returns_response_intact() {
        let (connection, peer) = echo_peer(5);

        let response = obtain_response(
            &connection,
            &EchoRequest {
                payload: vec![9, 9],
            },
            false,
        )
        .await
        .expect("operation failed");

        assert_eq!(response.return_code, 5);
        assert_eq!(response.payload, vec![9, 9]);
        peer.await.expect("peer panicked");
    }
}

// TCP unary transport.
//
// One connection per call: connect, write the framed ciphertext, read
// until the announced frame length has arrived or the peer closes, then
// deframe and decode. The socket is owned by the call's future, so a
// timeout (which drops the future) or any error path releases it.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::{TransportConfig, into_text};
use crate::cipher::{self, HEADER_LEN};
use crate::error::Error;

const READ_CHUNK: usize = 4096;

/// Send `payload` over a fresh TCP connection and return the decoded reply.
pub async fn send(
    host: &str,
    port: u16,
    payload: &str,
    config: &TransportConfig,
) -> Result<String, Error> {
    debug!(%host, port, "tcp send");

    let exchange = exchange(host, port, payload, config);
    match tokio::time::timeout(config.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%host, port, timeout_ms = config.timeout_ms(), "tcp send timed out");
            Err(Error::Timeout {
                host: host.to_owned(),
                port,
                timeout_ms: config.timeout_ms(),
            })
        }
    }
}

async fn exchange(
    host: &str,
    port: u16,
    payload: &str,
    config: &TransportConfig,
) -> Result<String, Error> {
    let io_err = |source: std::io::Error| Error::Connection {
        host: host.to_owned(),
        port,
        source,
    };

    let framed = cipher::encode_framed(payload.as_bytes(), config.key)?;

    let mut stream = TcpStream::connect((host, port)).await.map_err(io_err)?;
    stream.set_nodelay(true).map_err(io_err)?;
    stream.write_all(&framed).await.map_err(io_err)?;
    trace!(bytes = framed.len(), "tcp request written");

    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
        let n = stream.read_buf(&mut buf).await.map_err(io_err)?;
        if n == 0 {
            trace!(bytes = buf.len(), "tcp peer closed");
            break;
        }
        if let Some(expected) = cipher::frame_len(&buf) {
            if buf.len() >= HEADER_LEN + expected {
                trace!(bytes = buf.len(), "tcp frame complete");
                break;
            }
        }
    }

    // Best effort; the device may already have closed its side.
    let _ = stream.shutdown().await;

    if buf.is_empty() {
        return Err(Error::decode("empty response", &buf));
    }

    into_text(cipher::decode_framed(&buf, config.key)?)
}

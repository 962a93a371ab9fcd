//! Relay connection
//!
//! `connect` performs the handshake and waits for the relay's first identity
//! list, which proves the identity was accepted. The two loops in `stream` then
//! run on their own tasks.

mod stream;

pub(crate) use stream::{receive_loop, send_loop};

use std::io;
use std::time::Duration;

use proxchat_common::Identity;
use proxchat_common::framing::{FrameReader, FrameWriter};
use proxchat_common::io::read_message;
use proxchat_common::protocol::Message;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use crate::error::ClientError;

/// How long to wait for the relay to acknowledge the handshake
pub const HANDSHAKE_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) type Reader = FrameReader<BufReader<OwnedReadHalf>>;
pub(crate) type Writer = FrameWriter<OwnedWriteHalf>;

/// An accepted connection and the membership at the time we joined
pub(crate) struct Connection {
    pub reader: Reader,
    pub writer: Writer,
    pub members: Vec<Identity>,
}

/// Connect to the relay and register `identity`
///
/// # Errors
///
/// Returns `ClientError::Connect` if the relay is unreachable, and
/// `ClientError::Handshake` if the relay closes the connection instead of
/// acknowledging (for example because the identity is already in use).
pub(crate) async fn connect(addr: &str, identity: &Identity) -> Result<Connection, ClientError> {
    if identity.is_empty() {
        return Err(ClientError::Handshake(io::Error::new(
            io::ErrorKind::InvalidInput,
            "identity must not be empty",
        )));
    }

    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    let _ = stream.set_nodelay(true);

    let (read, write) = stream.into_split();
    let mut reader = FrameReader::new(BufReader::new(read));
    let mut writer = FrameWriter::new(write);

    writer
        .write_handshake(identity)
        .await
        .map_err(|e| ClientError::Handshake(e.into()))?;

    let first = timeout(HANDSHAKE_REPLY_TIMEOUT, read_message(&mut reader))
        .await
        .map_err(|_| {
            ClientError::Handshake(io::Error::new(
                io::ErrorKind::TimedOut,
                "relay did not acknowledge the handshake",
            ))
        })?
        .map_err(ClientError::Handshake)?;

    match first {
        Some(Message::IdentityList { identities }) => Ok(Connection {
            reader,
            writer,
            members: identities,
        }),
        Some(other) => Err(ClientError::Handshake(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected identity list, got {:?}", other.message_type()),
        ))),
        None => Err(ClientError::Handshake(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "relay closed the connection (identity in use?)",
        ))),
    }
}

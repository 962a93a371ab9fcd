//! Shared helpers for relay integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use proxchat_common::framing::{FrameReader, FrameWriter, RawFrame};
use proxchat_common::io::read_message;
use proxchat_common::protocol::Message;
use proxchat_common::Identity;
use proxchat_server::{ConnectionRegistry, RelayConfig, serve};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// How long a test waits for something that should arrive
pub const ARRIVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a test waits to be confident something will not arrive
pub const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// Start a relay on an ephemeral port
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, ConnectionRegistry) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = ConnectionRegistry::new();
    tokio::spawn(serve(listener, registry.clone(), config));
    (addr, registry)
}

/// A raw protocol client
pub struct TestClient {
    pub reader: FrameReader<BufReader<OwnedReadHalf>>,
    pub writer: FrameWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect without sending a handshake
    pub async fn connect_raw(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        Self {
            reader: FrameReader::new(BufReader::new(read)),
            writer: FrameWriter::new(write),
        }
    }

    /// Connect and send the identity handshake
    pub async fn connect(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect_raw(addr).await;
        client
            .writer
            .write_handshake(&Identity::new(name))
            .await
            .unwrap();
        client
    }

    /// Connect, handshake, and consume the identity list announcing us
    pub async fn join(addr: SocketAddr, name: &str) -> (Self, Vec<String>) {
        let mut client = Self::connect(addr, name).await;
        let list = client.expect_list().await;
        (client, list)
    }

    /// Read the next frame, failing the test if none arrives in time
    pub async fn next_frame(&mut self) -> Option<RawFrame> {
        timeout(ARRIVAL_TIMEOUT, self.reader.read_frame())
            .await
            .expect("timed out waiting for frame")
            .unwrap()
    }

    /// Read the next message, which must be an identity list
    pub async fn expect_list(&mut self) -> Vec<String> {
        let message = timeout(ARRIVAL_TIMEOUT, read_message(&mut self.reader))
            .await
            .expect("timed out waiting for identity list")
            .unwrap();
        match message {
            Some(Message::IdentityList { identities }) => {
                identities.into_iter().map(String::from).collect()
            }
            other => panic!("expected identity list, got {:?}", other),
        }
    }

    /// Assert the relay closes this connection
    pub async fn expect_closed(&mut self) {
        let result = timeout(ARRIVAL_TIMEOUT, self.reader.read_frame())
            .await
            .expect("timed out waiting for close");
        match result {
            Ok(None) | Err(_) => {}
            Ok(Some(frame)) => panic!("expected close, got {:?}", frame),
        }
    }

    /// Assert nothing arrives within the silence window
    pub async fn expect_silence(&mut self) {
        if let Ok(result) = timeout(SILENCE_WINDOW, self.reader.read_frame()).await {
            panic!("expected silence, got {:?}", result);
        }
    }

    /// Send a frame
    pub async fn send(&mut self, frame: &RawFrame) {
        self.writer.write_frame(frame).await.unwrap();
    }
}

//! ---
//! gt_section: "04-networking"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY frame server and device report sinks."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use geotrack_common::{FramingMode, ServerConfig};
use geotrack_zy::{route, Frame, Reply, ZyFrameCodec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::sink::ReportSink;

/// Default size of a single socket read in `per-read` mode.
pub const DEFAULT_READ_BUFFER: usize = 1024;

/// Builder for the TCP server that accepts ZY frames.
#[derive(Clone)]
pub struct FrameServerBuilder {
    listen: SocketAddr,
    sink: Arc<dyn ReportSink>,
    framing: FramingMode,
    read_buffer: usize,
}

impl FrameServerBuilder {
    /// Create a builder bound to `listen` that hands reports to `sink`.
    pub fn new(listen: SocketAddr, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            listen,
            sink,
            framing: FramingMode::default(),
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }

    /// Builder populated from the `[server]` configuration section.
    pub fn from_config(config: &ServerConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self::new(config.listen, sink)
            .framing(config.framing)
            .read_buffer(config.read_buffer)
    }

    pub fn framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    pub fn read_buffer(mut self, read_buffer: usize) -> Self {
        self.read_buffer = read_buffer;
        self
    }

    /// Bind the listener and start accepting connections.
    pub async fn spawn(self) -> anyhow::Result<FrameServerHandle> {
        let listener = TcpListener::bind(self.listen)
            .await
            .with_context(|| format!("failed to bind frame server to {}", self.listen))?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, framing = %self.framing, "frame server listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(listener, self, shutdown_rx));

        Ok(FrameServerHandle {
            address: local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle for the running frame server.
pub struct FrameServerHandle {
    address: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FrameServerHandle {
    /// Return the bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stop accepting, close open connections and wait for the accept loop to exit.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    settings: FrameServerBuilder,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "failed to accept frame connection");
                    continue;
                }
            },
        };
        debug!(peer = %peer, "frame connection accepted");

        let sink = settings.sink.clone();
        let framing = settings.framing;
        let read_buffer = settings.read_buffer;
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let outcome = match framing {
                FramingMode::Reassemble => serve_reassembled(stream, sink, shutdown).await,
                FramingMode::PerRead => serve_per_read(stream, sink, read_buffer, shutdown).await,
            };
            match outcome {
                Ok(()) => debug!(peer = %peer, "frame connection closed"),
                Err(err) => warn!(peer = %peer, error = %err, "frame connection ended with error"),
            }
        });
    }
    info!("frame server stopped");
}

async fn serve_reassembled(
    stream: TcpStream,
    sink: Arc<dyn ReportSink>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut framed = Framed::new(stream, ZyFrameCodec);
    loop {
        let next = tokio::select! {
            _ = shutdown.changed() => break,
            next = framed.next() => next,
        };
        let Some(bytes) = next else {
            break;
        };
        let reply = handle_frame(&bytes?, sink.as_ref()).await;
        framed.send(reply).await?;
    }
    Ok(())
}

async fn serve_per_read(
    mut stream: TcpStream,
    sink: Arc<dyn ReportSink>,
    read_buffer: usize,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; read_buffer];
    loop {
        let read = tokio::select! {
            _ = shutdown.changed() => break,
            read = stream.read(&mut buf) => read?,
        };
        if read == 0 {
            break;
        }
        let reply = handle_frame(&buf[..read], sink.as_ref()).await;
        stream.write_all(reply.to_string().as_bytes()).await?;
    }
    Ok(())
}

/// Parse, route and apply one frame, producing the reply for the device.
pub async fn handle_frame(bytes: &[u8], sink: &dyn ReportSink) -> Reply {
    let report = match Frame::parse(bytes).and_then(|frame| route(&frame, Utc::now())) {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, bytes = bytes.len(), "frame rejected");
            return Reply::error(err);
        }
    };
    match sink.apply(&report).await {
        Ok(()) => Reply::Success,
        Err(err) => {
            warn!(device_id = %report.device_id, error = %err, "report sink failed");
            Reply::error(format!("{err:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryDeviceStore;
    use geotrack_zy::TOKEN_LEN;
    use tokio::time::{sleep, Duration};

    const NORTH_EAST: &str = "11150C151515150254FA0006EBE740112F054E74";

    fn wire(cmd: u8, device: &str) -> Vec<u8> {
        let content = hex::decode(NORTH_EAST).unwrap();
        Frame::new(cmd, [0; TOKEN_LEN], device.as_bytes(), &content)
            .to_bytes()
            .unwrap()
            .to_vec()
    }

    async fn read_reply(stream: &mut TcpStream, len: usize) -> String {
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    async fn start(framing: FramingMode) -> (FrameServerHandle, InMemoryDeviceStore) {
        let store = InMemoryDeviceStore::new();
        let handle = FrameServerBuilder::new("127.0.0.1:0".parse().unwrap(), Arc::new(store.clone()))
            .framing(framing)
            .spawn()
            .await
            .unwrap();
        (handle, store)
    }

    #[tokio::test]
    async fn split_frame_is_reassembled() {
        let (handle, store) = start(FramingMode::Reassemble).await;
        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();

        let frame = wire(0x01, "tracker-1");
        client.write_all(&frame[..10]).await.unwrap();
        client.flush().await.unwrap();
        sleep(Duration::from_millis(20)).await;
        client.write_all(&frame[10..]).await.unwrap();

        assert_eq!(read_reply(&mut client, 7).await, "SUCCESS");
        assert!(store.device("tracker-1").is_some());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn coalesced_frames_each_get_a_reply() {
        let (handle, store) = start(FramingMode::Reassemble).await;
        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();

        let mut batch = wire(0x01, "a");
        batch.extend(wire(0x01, "b"));
        client.write_all(&batch).await.unwrap();

        assert_eq!(read_reply(&mut client, 14).await, "SUCCESSSUCCESS");
        assert_eq!(store.devices().len(), 2);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_frame_keeps_connection_open() {
        let (handle, store) = start(FramingMode::Reassemble).await;
        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();

        client.write_all(&wire(0x01, "   ")).await.unwrap();
        let expected = "ERROR: empty device ID";
        assert_eq!(read_reply(&mut client, expected.len()).await, expected);

        client.write_all(&wire(0x09, "dev")).await.unwrap();
        let expected = "ERROR: unknown command code: 09";
        assert_eq!(read_reply(&mut client, expected.len()).await, expected);

        client.write_all(&wire(0x01, "dev")).await.unwrap();
        assert_eq!(read_reply(&mut client, 7).await, "SUCCESS");
        assert_eq!(store.devices().len(), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn per_read_mode_treats_each_read_as_a_frame() {
        let (handle, store) = start(FramingMode::PerRead).await;
        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();

        client.write_all(&wire(0x01, "legacy")).await.unwrap();
        assert_eq!(read_reply(&mut client, 7).await, "SUCCESS");

        client.write_all(&[0u8; 12]).await.unwrap();
        let expected = "ERROR: packet too short: 12 bytes";
        assert_eq!(read_reply(&mut client, expected.len()).await, expected);
        assert!(store.device("legacy").is_some());
        handle.shutdown().await.unwrap();
    }
}

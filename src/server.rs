//! # Listener Module
//!
//! Owns the request/reply network endpoint and drives the ingestion
//! pipeline: receive a payload, extract fields into the shared state,
//! persist the raw payload, reply with a status string.
//!
//! The protocol is strictly one request at a time. Connections are served
//! sequentially and on each connection a frame is fully received and
//! replied to before the next read is issued; there is no pipelining and
//! no per-connection task. Frames are a 4-byte big-endian length prefix
//! followed by that many bytes of payload, identical in both directions.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::error::{GeoMonitorError, Result};
use crate::extract::{PayloadExtractor, TextScanExtractor};
use crate::state::TelemetryState;
use crate::store::JsonArrayStore;

/// Reply sent when the payload was persisted.
pub const REPLY_SUCCESS: &str = "Successful sending";

/// Reply sent when the store could not be written.
pub const REPLY_ERROR: &str = "Unexpected error";

/// Upper bound on a single request frame (1 MiB). Guards the read loop
/// against a garbage length prefix.
const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Request/reply telemetry ingestion server.
pub struct TelemetryServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<TelemetryState>,
    store: JsonArrayStore,
    extractor: Box<dyn PayloadExtractor + Send + Sync>,
}

impl std::fmt::Debug for TelemetryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryServer")
            .field("local_addr", &self.local_addr)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl TelemetryServer {
    /// Bind the endpoint. A bind failure is fatal: it propagates to the
    /// caller instead of being swallowed like per-request errors.
    ///
    /// # Arguments
    ///
    /// * `addr` - `host:port` to listen on (port 0 picks a free port)
    /// * `state` - shared telemetry state updated on every request
    /// * `store` - append-only store receiving every raw payload
    pub async fn bind(
        addr: &str,
        state: Arc<TelemetryState>,
        store: JsonArrayStore,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GeoMonitorError::Transport(format!("Failed to bind {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| GeoMonitorError::Transport(format!("Failed to resolve local addr: {e}")))?;

        info!("Listening on {local_addr}");

        Ok(Self {
            listener,
            local_addr,
            state,
            store,
            extractor: Box::new(TextScanExtractor),
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Drive the accept loop forever.
    ///
    /// A failure on one connection or request is logged and the loop moves
    /// on to the next; only the future being dropped stops the server.
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Client connected from {peer}");
                    if let Err(e) = self.serve_connection(stream).await {
                        warn!("Connection from {peer} ended with error: {e}");
                    }
                }
                Err(e) => {
                    error!("Failed to accept connection: {e}");
                }
            }
        }
    }

    /// Serve one connection: strict receive/reply alternation until the
    /// peer disconnects.
    async fn serve_connection(&self, mut stream: TcpStream) -> Result<()> {
        loop {
            let payload = match read_frame(&mut stream).await? {
                Some(payload) => payload,
                None => {
                    debug!("Client disconnected");
                    return Ok(());
                }
            };

            info!("Received payload ({} bytes)", payload.len());
            let reply = self.process_request(&payload);
            write_frame(&mut stream, reply).await?;
            debug!("Sent reply: {reply}");
        }
    }

    /// Run one payload through extraction and persistence.
    ///
    /// Extraction can never fail the request; only a store write failure
    /// turns the reply into [`REPLY_ERROR`]. The shared state is updated
    /// either way (no rollback on persistence failure).
    fn process_request(&self, payload: &str) -> &'static str {
        self.state.update(|record| self.extractor.apply(payload, record));

        match self.store.append(payload) {
            Ok(()) => {
                info!("Payload persisted");
                REPLY_SUCCESS
            }
            Err(e) => {
                error!("Failed to persist payload: {e}");
                REPLY_ERROR
            }
        }
    }
}

/// Read one length-prefixed frame. Returns `None` on a clean disconnect
/// before the length prefix.
async fn read_frame(stream: &mut TcpStream) -> Result<Option<String>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(GeoMonitorError::Transport(format!(
            "Frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
        )));
    }

    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;

    // The payload is nominally JSON text but nothing on the wire enforces
    // that; invalid UTF-8 is carried through lossily rather than rejected.
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Write one length-prefixed frame.
async fn write_frame(stream: &mut TcpStream, payload: &str) -> Result<()> {
    let len = payload.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(payload.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

//! Relay protocol engine
//!
//! Owns one connection to a relay network node: the connect/reconnect loop,
//! the framed receive loop, and the admission-filtered send paths for
//! transactions and compressed blocks.
//!
//! Concurrency model: a single tokio task per connection owns the read half
//! and the receive cache; one mutex guards the write half together with the
//! send cache, so outbound frames from arbitrary tasks never interleave and
//! the cache tracks exactly what reached the wire.

use std::sync::Arc;

use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;

use super::block_codec::{self, BLOCK_HEADER_LEN};
use super::error::{ProtocolViolation, RelayError};
use super::frame::{
    FrameHeader, MessageType, FRAME_HEADER_LEN, MAX_BLOCK_TRANSACTIONS,
    MAX_EXTRA_OVERSIZE_TRANSACTIONS, MAX_RELAY_OVERSIZE_TRANSACTION_BYTES,
    MAX_RELAY_TRANSACTION_BYTES, RELAY_CACHE_CAPACITY, VERSION_STRING,
};
use super::tx_cache::FlaggedTxCache;
use super::txhash::payload_id;
use super::RelayConsumer;

/// Send-side state guarded by the send mutex.
///
/// The writer and the send cache live behind one lock: frame bytes stay
/// atomic on the wire, and the cache only records transactions that were
/// actually written.
struct SendState {
    writer: Option<OwnedWriteHalf>,
    cache: FlaggedTxCache,
}

struct Shared {
    config: RelayConfig,
    consumer: Arc<dyn RelayConsumer>,
    send: Mutex<SendState>,
}

/// Client engine for the compact block-relay protocol.
///
/// Construction connects (and keeps reconnecting) to the configured relay
/// node and drives inbound traffic into the consumer. The handle's
/// `provide_*` methods feed outbound traffic; they are best-effort and never
/// surface connection errors to the caller. Any session failure funnels into
/// one recovery path: close the socket, discard both caches, sleep, redial.
pub struct RelayClient {
    shared: Arc<Shared>,
    connection: JoinHandle<()>,
}

impl RelayClient {
    /// Start the engine against `config.server`.
    ///
    /// The engine owns its lifecycle from here on; dropping the handle tears
    /// the connection down.
    pub fn new(config: RelayConfig, consumer: Arc<dyn RelayConsumer>) -> Self {
        let shared = Arc::new(Shared {
            config,
            consumer,
            send: Mutex::new(SendState {
                writer: None,
                cache: FlaggedTxCache::new(RELAY_CACHE_CAPACITY),
            }),
        });
        let connection = tokio::spawn(Self::run(Arc::clone(&shared)));
        Self { shared, connection }
    }

    async fn run(shared: Arc<Shared>) {
        loop {
            if let Err(err) = Self::session(&shared).await {
                match &err {
                    RelayError::Transport(_) => warn!("Lost connection to relay node: {err}"),
                    RelayError::Protocol(_) => {
                        warn!("Error processing data from relay node: {err}")
                    }
                    RelayError::Consumer(_) => {
                        warn!("Error handing relay data downstream: {err}")
                    }
                }
            }
            // Drop the write half and both caches; the next session starts
            // clean and the peer does the same.
            {
                let mut send = shared.send.lock().await;
                send.writer = None;
                send.cache = FlaggedTxCache::new(RELAY_CACHE_CAPACITY);
            }
            tokio::time::sleep(shared.config.reconnect_delay()).await;
        }
    }

    /// Run one connection to completion. Only ever returns an error; every
    /// session ends by transport, protocol, or consumer failure.
    async fn session(shared: &Shared) -> Result<(), RelayError> {
        let stream =
            TcpStream::connect((shared.config.server.as_str(), shared.config.port)).await?;
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();

        // The handshake goes out under the send mutex so no outbound frame
        // can beat the VERSION message onto the wire.
        {
            let mut send = shared.send.lock().await;
            send.cache = FlaggedTxCache::new(RELAY_CACHE_CAPACITY);
            let mut hello = Vec::with_capacity(FRAME_HEADER_LEN + VERSION_STRING.len());
            FrameHeader::new(MessageType::Version, VERSION_STRING.len() as u32).put(&mut hello);
            hello.put_slice(VERSION_STRING);
            writer.write_all(&hello).await?;
            send.writer = Some(writer);
        }

        let mut recv_cache = FlaggedTxCache::new(RELAY_CACHE_CAPACITY);
        let mut handshaken = false;
        loop {
            let mut raw = [0u8; FRAME_HEADER_LEN];
            reader.read_exact(&mut raw).await?;
            let header = FrameHeader::decode(&raw)?;
            Self::dispatch(shared, &mut reader, &mut recv_cache, &mut handshaken, header).await?;
        }
    }

    async fn dispatch<R>(
        shared: &Shared,
        reader: &mut R,
        recv_cache: &mut FlaggedTxCache,
        handshaken: &mut bool,
        header: FrameHeader,
    ) -> Result<(), RelayError>
    where
        R: AsyncRead + Unpin,
    {
        // Equal version tags must be observed before any relay data.
        if !*handshaken
            && !matches!(header.msg_type, MessageType::Version | MessageType::MaxVersion)
        {
            return Err(ProtocolViolation::DataBeforeVersion.into());
        }

        match header.msg_type {
            MessageType::Version => {
                let version = read_payload(reader, header.length).await?;
                if version != VERSION_STRING {
                    return Err(ProtocolViolation::VersionMismatch.into());
                }
                *handshaken = true;
                info!(
                    "Connected to relay node with protocol version {}",
                    String::from_utf8_lossy(&version)
                );
                Ok(())
            }
            MessageType::MaxVersion => {
                let version = read_payload(reader, header.length).await?;
                warn!(
                    "Relay network now uses version {} (PLEASE UPGRADE)",
                    String::from_utf8_lossy(&version)
                );
                Ok(())
            }
            MessageType::Transaction => {
                let length = header.length as usize;
                if length > MAX_RELAY_TRANSACTION_BYTES
                    && (length > MAX_RELAY_OVERSIZE_TRANSACTION_BYTES
                        || recv_cache.flag_count() >= MAX_EXTRA_OVERSIZE_TRANSACTIONS)
                {
                    return Err(ProtocolViolation::OversizedTransaction(header.length).into());
                }
                let transaction = read_payload(reader, header.length).await?;
                recv_cache.add(transaction.clone(), length > MAX_RELAY_TRANSACTION_BYTES);
                debug!(
                    "Got transaction {} of length {}",
                    payload_id(&transaction),
                    length
                );
                shared
                    .consumer
                    .provide_transaction(transaction)
                    .await
                    .map_err(RelayError::Consumer)
            }
            MessageType::Block => {
                if header.length > MAX_BLOCK_TRANSACTIONS {
                    return Err(ProtocolViolation::TooManyTransactions(header.length).into());
                }
                let mut block_header = [0u8; BLOCK_HEADER_LEN];
                reader.read_exact(&mut block_header).await?;
                shared
                    .consumer
                    .provide_block_header(&block_header)
                    .await
                    .map_err(RelayError::Consumer)?;

                let block =
                    block_codec::reconstruct_block(reader, &block_header, header.length, recv_cache)
                        .await?;
                info!(
                    "Got full block {} with {} transactions, {} bytes",
                    payload_id(&block_header),
                    header.length,
                    block.len()
                );
                shared
                    .consumer
                    .provide_block(block)
                    .await
                    .map_err(RelayError::Consumer)
            }
            MessageType::EndBlock => Err(ProtocolViolation::UnexpectedEndBlock.into()),
        }
    }

    /// Relay a freely-broadcast transaction to the relay network.
    ///
    /// Duplicates and transactions over the oversize admission rule are
    /// dropped silently; relay is best-effort and write failures surface
    /// only on the reconnect path.
    pub async fn provide_transaction(&self, transaction: &[u8]) {
        let mut send = self.shared.send.lock().await;
        let SendState { writer, cache } = &mut *send;

        if cache.contains(transaction) {
            return;
        }
        if transaction.len() > MAX_RELAY_TRANSACTION_BYTES
            && (transaction.len() > MAX_RELAY_OVERSIZE_TRANSACTION_BYTES
                || cache.flag_count() >= MAX_EXTRA_OVERSIZE_TRANSACTIONS)
        {
            debug!(
                "Dropping transaction of {} bytes over relay size limits",
                transaction.len()
            );
            return;
        }
        let Some(out) = writer.as_mut() else {
            debug!("Not connected to relay node, dropping transaction");
            return;
        };

        let mut relay_data = Vec::with_capacity(FRAME_HEADER_LEN + transaction.len());
        FrameHeader::new(MessageType::Transaction, transaction.len() as u32).put(&mut relay_data);
        relay_data.put_slice(transaction);

        match out.write_all(&relay_data).await {
            Ok(()) => {
                cache.add(
                    transaction.to_vec(),
                    transaction.len() > MAX_RELAY_TRANSACTION_BYTES,
                );
                debug!(
                    "Sent transaction {} of size {}",
                    payload_id(transaction),
                    transaction.len()
                );
            }
            Err(err) => {
                warn!("Failed to send to relay node: {err}");
                // Dropping the write half closes our direction; the receive
                // task observes the resulting close and reconnects.
                *writer = None;
            }
        }
    }

    /// Relay a full canonical block, compressed against the send cache.
    ///
    /// This method blocks until sending is complete.
    pub async fn provide_block(&self, block: &[u8]) {
        let mut send = self.shared.send.lock().await;
        let SendState { writer, cache } = &mut *send;

        let Some(out) = writer.as_mut() else {
            debug!("Not connected to relay node, dropping block");
            return;
        };

        let relay_data = match block_codec::compress_block(block, cache) {
            Ok(data) => data,
            Err(err) => {
                warn!("Failed to compress block for relay: {err}");
                *writer = None;
                return;
            }
        };

        match out.write_all(&relay_data).await {
            Ok(()) => {
                info!(
                    "Sent block {} of size {} with {} bytes on the wire",
                    payload_id(&block[..BLOCK_HEADER_LEN]),
                    block.len(),
                    relay_data.len()
                );
            }
            Err(err) => {
                warn!("Failed to send to relay node: {err}");
                *writer = None;
            }
        }
    }
}

/// The engine speaks the consumer contract itself, so a peer-to-peer node
/// client can feed it through the same interface it is fed by.
#[async_trait::async_trait]
impl RelayConsumer for RelayClient {
    async fn provide_block_header(&self, _header: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn provide_block(&self, block: Vec<u8>) -> anyhow::Result<()> {
        RelayClient::provide_block(self, &block).await;
        Ok(())
    }

    async fn provide_transaction(&self, transaction: Vec<u8>) -> anyhow::Result<()> {
        RelayClient::provide_transaction(self, &transaction).await;
        Ok(())
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

async fn read_payload<R>(reader: &mut R, length: u32) -> Result<Vec<u8>, RelayError>
where
    R: AsyncRead + Unpin,
{
    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

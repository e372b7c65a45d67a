//! Relay network layer
//!
//! Framed relay protocol, the synchronized transaction caches, block
//! compression, and the client engine that ties them to a downstream
//! consumer.

pub mod block_codec;
pub mod error;
pub mod frame;
pub mod relay_client;
pub mod tx_cache;
pub mod txhash;

use anyhow::Result;

/// Downstream consumer of relay traffic.
///
/// Implemented by the peer-to-peer node client on the receive side. The
/// relay engine implements it as well, so a node client can feed blocks and
/// transactions back through the same three-method contract.
///
/// A returned error is fatal to the current relay connection: the engine
/// drops the session and reconnects rather than continue in a half-processed
/// state.
#[async_trait::async_trait]
pub trait RelayConsumer: Send + Sync {
    /// Called once per inbound block as soon as the 80-byte header is read,
    /// before reconstruction begins. May be a no-op.
    async fn provide_block_header(&self, header: &[u8]) -> Result<()>;

    /// Called once per inbound block after reconstruction and END_BLOCK,
    /// with the full canonical block bytes.
    async fn provide_block(&self, block: Vec<u8>) -> Result<()>;

    /// Called once per inbound transaction after cache admission.
    async fn provide_transaction(&self, transaction: Vec<u8>) -> Result<()>;
}

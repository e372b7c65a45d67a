//! Error taxonomy for relay sessions
//!
//! Every error here is fatal to the connection it occurred on; the engine
//! funnels all of them into one recovery path (close, discard caches, sleep,
//! reconnect). Nothing is retried in place.

use thiserror::Error;

/// A violation of the relay wire protocol by the remote peer (or of the
/// canonical block layout by a local producer).
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("invalid magic bytes: {0:#010x}")]
    BadMagic(u32),

    #[error("unknown message type: {0}")]
    UnknownMessageType(u32),

    #[error("got message too large: {0} bytes")]
    OversizedMessage(u32),

    #[error("got a BLOCK message with far too many transactions: {0}")]
    TooManyTransactions(u32),

    #[error("got back unknown version from relay peer")]
    VersionMismatch,

    #[error("got relay data before the version handshake completed")]
    DataBeforeVersion,

    #[error("got a freely relayed transaction too large: {0} bytes")]
    OversizedTransaction(u32),

    #[error("got in-block transaction of size {0} > maximum block size")]
    OversizedInlineTransaction(u32),

    #[error("in-block transaction of {0} bytes does not fit the length directive")]
    UnencodableTransaction(usize),

    #[error("got index {0} for a transaction we didn't have")]
    UnknownCacheIndex(u16),

    #[error("invalid END_BLOCK message after block")]
    BadEndBlock,

    #[error("unexpected END_BLOCK outside a block")]
    UnexpectedEndBlock,

    #[error("malformed block bytes at offset {0}")]
    MalformedBlock(usize),
}

/// Connection-fatal error for a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The peer broke the wire protocol, or a local block failed to parse.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// Socket read/write failure or abrupt close.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The downstream consumer rejected data we handed it.
    #[error("consumer error: {0}")]
    Consumer(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;

//! relay-bridge - Compact block-relay engine for Bitcoin nodes
//!
//! Bridges a bandwidth-efficient block relay network to a standard Bitcoin
//! peer-to-peer node. Blocks cross the relay link as an 80-byte header plus
//! one small directive per transaction; both sides maintain a synchronized
//! transaction cache so transactions the receiver already holds are named by
//! a two-byte index instead of being re-transmitted.
//!
//! The crate provides the three core pieces of the bridge:
//!
//! 1. **Relay protocol engine** ([`network::relay_client`]): framed TCP
//!    protocol, message loop, and the close/discard/reconnect recovery
//!    discipline.
//! 2. **Synchronized transaction cache** ([`network::tx_cache`]): a bounded,
//!    indexed, flag-aware set both peers maintain in lockstep.
//! 3. **Block compressor/reconstructor** ([`network::block_codec`]): walks
//!    the canonical block serialization and swaps cached transactions for
//!    indices on send, re-materializing full blocks on receive.
//!
//! The peer-to-peer node client sits outside this crate and talks to the
//! engine through the [`RelayConsumer`] contract in both directions. Block
//! and transaction payloads are treated as opaque bytes throughout; the only
//! structural parsing is the transaction-boundary walk the compressor needs.

pub mod config;
pub mod network;
pub mod utils;

pub use config::{LoggingConfig, RelayConfig};
pub use network::relay_client::RelayClient;
pub use network::RelayConsumer;

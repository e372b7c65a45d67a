//! Shared helpers for relay engine tests: canonical byte builders, raw frame
//! construction, and a recording consumer.

use std::sync::Arc;

use relay_bridge::network::block_codec::write_compact_size;
use relay_bridge::RelayConsumer;
use tokio::sync::mpsc;

/// Builds canonical transaction bytes without interpreting them, matching
/// the layout the block codec walks.
pub struct TestTransactionBuilder {
    version: u32,
    inputs: Vec<Vec<u8>>,
    outputs: Vec<(u64, Vec<u8>)>,
    lock_time: u32,
}

impl TestTransactionBuilder {
    pub fn new() -> Self {
        Self {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn add_input(mut self, script_sig: Vec<u8>) -> Self {
        self.inputs.push(script_sig);
        self
    }

    pub fn add_output(mut self, value: u64, script_pubkey: Vec<u8>) -> Self {
        self.outputs.push((value, script_pubkey));
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut tx = Vec::new();
        tx.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(&mut tx, self.inputs.len() as u64);
        for script_sig in &self.inputs {
            tx.extend_from_slice(&[0u8; 36]);
            write_compact_size(&mut tx, script_sig.len() as u64);
            tx.extend_from_slice(script_sig);
            tx.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        }
        write_compact_size(&mut tx, self.outputs.len() as u64);
        for (value, script_pubkey) in &self.outputs {
            tx.extend_from_slice(&value.to_le_bytes());
            write_compact_size(&mut tx, script_pubkey.len() as u64);
            tx.extend_from_slice(script_pubkey);
        }
        tx.extend_from_slice(&self.lock_time.to_le_bytes());
        tx
    }
}

/// Distinct small transaction; `seed` varies the script bytes.
pub fn test_transaction(seed: u8) -> Vec<u8> {
    TestTransactionBuilder::new()
        .add_input(vec![seed, seed, 0x42])
        .add_output(50_000, vec![0x51, seed])
        .build()
}

/// Builds canonical block bytes: 80-byte header, compact-size count,
/// concatenated transactions.
pub struct TestBlockBuilder {
    header: [u8; 80],
    transactions: Vec<Vec<u8>>,
}

impl TestBlockBuilder {
    pub fn new() -> Self {
        Self {
            header: [0u8; 80],
            transactions: Vec::new(),
        }
    }

    pub fn with_header_byte(mut self, byte: u8) -> Self {
        self.header = [byte; 80];
        self
    }

    pub fn add_transaction(mut self, tx: Vec<u8>) -> Self {
        self.transactions.push(tx);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&self.header);
        write_compact_size(&mut block, self.transactions.len() as u64);
        for tx in &self.transactions {
            block.extend_from_slice(tx);
        }
        block
    }
}

/// Raw relay frame, built by hand so tests stay independent of the crate's
/// encoder. The length field is a free parameter: BLOCK frames carry a
/// transaction count there, and some tests deliberately lie.
pub fn frame(msg_type: u32, length: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + payload.len());
    out.extend_from_slice(&0xF2BE_EF42u32.to_be_bytes());
    out.extend_from_slice(&msg_type.to_be_bytes());
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// What a [`RecordingConsumer`] observed, in call order.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsumerEvent {
    Header(Vec<u8>),
    Block(Vec<u8>),
    Transaction(Vec<u8>),
}

/// Consumer that forwards every callback into a channel.
pub struct RecordingConsumer {
    events: mpsc::UnboundedSender<ConsumerEvent>,
}

#[async_trait::async_trait]
impl RelayConsumer for RecordingConsumer {
    async fn provide_block_header(&self, header: &[u8]) -> anyhow::Result<()> {
        self.events
            .send(ConsumerEvent::Header(header.to_vec()))
            .map_err(|_| anyhow::anyhow!("event receiver dropped"))
    }

    async fn provide_block(&self, block: Vec<u8>) -> anyhow::Result<()> {
        self.events
            .send(ConsumerEvent::Block(block))
            .map_err(|_| anyhow::anyhow!("event receiver dropped"))
    }

    async fn provide_transaction(&self, transaction: Vec<u8>) -> anyhow::Result<()> {
        self.events
            .send(ConsumerEvent::Transaction(transaction))
            .map_err(|_| anyhow::anyhow!("event receiver dropped"))
    }
}

pub fn recording_consumer() -> (
    Arc<RecordingConsumer>,
    mpsc::UnboundedReceiver<ConsumerEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingConsumer { events: tx }), rx)
}

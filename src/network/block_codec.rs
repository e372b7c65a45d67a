//! Block compression against the synchronized transaction caches
//!
//! A compressed block is the 80-byte header followed by one directive per
//! transaction: either a two-byte cache index, or `0xFFFF` plus a 24-bit
//! big-endian length and the raw transaction bytes. The codec walks the
//! canonical serialization to find transaction boundaries but never
//! interprets the bytes beyond that.

use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::error::{ProtocolViolation, RelayError};
use super::frame::{
    FrameHeader, MessageType, FRAME_HEADER_LEN, INLINE_TX_INDEX, MAX_BLOCK_TRANSACTIONS,
};
use super::tx_cache::FlaggedTxCache;

/// Canonical block header size.
pub const BLOCK_HEADER_LEN: usize = 80;

/// Largest transaction accepted inline inside a compressed block.
pub const MAX_INLINE_TX_BYTES: u32 = 1_000_000;

/// Largest length representable in the 3-byte inline directive.
pub const MAX_ENCODABLE_TX_BYTES: usize = 0xFF_FFFF;

/// Decode a canonical compact-size integer at `pos`.
///
/// Returns the value and the position just past it.
pub fn read_compact_size(data: &[u8], pos: usize) -> Result<(u64, usize), ProtocolViolation> {
    let first = *data
        .get(pos)
        .ok_or(ProtocolViolation::MalformedBlock(pos))?;
    let (width, value) = match first {
        0xFD => (2, take_le(data, pos + 1, 2)?),
        0xFE => (4, take_le(data, pos + 1, 4)?),
        0xFF => (8, take_le(data, pos + 1, 8)?),
        byte => (0, u64::from(byte)),
    };
    Ok((value, pos + 1 + width))
}

fn take_le(data: &[u8], pos: usize, width: usize) -> Result<u64, ProtocolViolation> {
    let end = pos
        .checked_add(width)
        .filter(|&end| end <= data.len())
        .ok_or(ProtocolViolation::MalformedBlock(pos))?;
    let mut value = 0u64;
    for (shift, byte) in data[pos..end].iter().enumerate() {
        value |= u64::from(*byte) << (8 * shift);
    }
    Ok(value)
}

/// Append a canonical compact-size integer.
pub fn write_compact_size(buf: &mut impl BufMut, value: u64) {
    if value < 0xFD {
        buf.put_u8(value as u8);
    } else if value <= 0xFFFF {
        buf.put_u8(0xFD);
        buf.put_u16_le(value as u16);
    } else if value <= 0xFFFF_FFFF {
        buf.put_u8(0xFE);
        buf.put_u32_le(value as u32);
    } else {
        buf.put_u8(0xFF);
        buf.put_u64_le(value);
    }
}

fn skip(data: &[u8], pos: usize, count: usize) -> Result<usize, ProtocolViolation> {
    pos.checked_add(count)
        .filter(|&end| end <= data.len())
        .ok_or(ProtocolViolation::MalformedBlock(pos))
}

/// Walk one canonical transaction starting at `start` and return the offset
/// just past it. Only boundaries are computed; scripts stay opaque.
pub fn transaction_end(block: &[u8], start: usize) -> Result<usize, ProtocolViolation> {
    let mut pos = skip(block, start, 4)?; // version

    let (input_count, next) = read_compact_size(block, pos)?;
    pos = next;
    for _ in 0..input_count {
        pos = skip(block, pos, 36)?; // outpoint
        let (script_len, next) = read_compact_size(block, pos)?;
        let script_len =
            usize::try_from(script_len).map_err(|_| ProtocolViolation::MalformedBlock(pos))?;
        pos = skip(block, next, script_len)?;
        pos = skip(block, pos, 4)?; // sequence
    }

    let (output_count, next) = read_compact_size(block, pos)?;
    pos = next;
    for _ in 0..output_count {
        pos = skip(block, pos, 8)?; // value
        let (script_len, next) = read_compact_size(block, pos)?;
        let script_len =
            usize::try_from(script_len).map_err(|_| ProtocolViolation::MalformedBlock(pos))?;
        pos = skip(block, next, script_len)?;
    }

    skip(block, pos, 4) // lock time
}

/// Compress a canonical block against the send cache.
///
/// Returns the complete wire image: the BLOCK frame header (whose length
/// field carries the transaction count), the block header, one directive per
/// transaction, and the trailing END_BLOCK frame. Transactions found in the
/// cache are emitted as bare indices and removed; the rest go inline and are
/// not inserted.
pub fn compress_block(
    block: &[u8],
    cache: &mut FlaggedTxCache,
) -> Result<Vec<u8>, ProtocolViolation> {
    if block.len() < BLOCK_HEADER_LEN {
        return Err(ProtocolViolation::MalformedBlock(block.len()));
    }
    let (tx_count, mut pos) = read_compact_size(block, BLOCK_HEADER_LEN)?;
    let tx_count =
        u32::try_from(tx_count).map_err(|_| ProtocolViolation::MalformedBlock(BLOCK_HEADER_LEN))?;

    let mut relay_data = Vec::with_capacity(block.len() + 2 * FRAME_HEADER_LEN);
    FrameHeader::new(MessageType::Block, tx_count).put(&mut relay_data);
    relay_data.put_slice(&block[..BLOCK_HEADER_LEN]);

    for _ in 0..tx_count {
        let start = pos;
        pos = transaction_end(block, start)?;
        let transaction = &block[start..pos];

        let cached = cache
            .get_index(transaction)
            .and_then(|index| u16::try_from(index).ok())
            .filter(|&index| index != INLINE_TX_INDEX);
        match cached {
            Some(index) => {
                relay_data.put_u16(index);
                cache.remove(transaction);
            }
            None => {
                if transaction.len() > MAX_ENCODABLE_TX_BYTES {
                    return Err(ProtocolViolation::UnencodableTransaction(transaction.len()));
                }
                relay_data.put_u16(INLINE_TX_INDEX);
                relay_data.put_u8((transaction.len() >> 16) as u8);
                relay_data.put_u16((transaction.len() & 0xFFFF) as u16);
                relay_data.put_slice(transaction);
            }
        }
    }

    FrameHeader::new(MessageType::EndBlock, 0).put(&mut relay_data);
    Ok(relay_data)
}

/// Rebuild a canonical block from BLOCK frame directives.
///
/// `reader` must be positioned just past the 80-byte header. Directives are
/// variable-length, so they are parsed straight off the stream; cache hits
/// are spliced in and consumed. The trailing END_BLOCK frame is read and
/// verified here, before the block is handed anywhere.
pub async fn reconstruct_block<R>(
    reader: &mut R,
    header: &[u8; BLOCK_HEADER_LEN],
    tx_count: u32,
    cache: &mut FlaggedTxCache,
) -> Result<Vec<u8>, RelayError>
where
    R: AsyncRead + Unpin,
{
    if tx_count > MAX_BLOCK_TRANSACTIONS {
        return Err(ProtocolViolation::TooManyTransactions(tx_count).into());
    }

    let mut block = Vec::with_capacity(BLOCK_HEADER_LEN + 9 + tx_count as usize * 64);
    block.put_slice(header);
    write_compact_size(&mut block, u64::from(tx_count));

    for _ in 0..tx_count {
        let index = reader.read_u16().await?;
        if index == INLINE_TX_INDEX {
            let mut raw = [0u8; 3];
            reader.read_exact(&mut raw).await?;
            let length = u32::from(raw[0]) << 16 | u32::from(raw[1]) << 8 | u32::from(raw[2]);
            if length > MAX_INLINE_TX_BYTES {
                return Err(ProtocolViolation::OversizedInlineTransaction(length).into());
            }
            let start = block.len();
            block.resize(start + length as usize, 0);
            reader.read_exact(&mut block[start..]).await?;
            debug!(length, "got in-block full transaction");
        } else {
            let transaction = cache
                .get_by_index(usize::from(index))
                .ok_or(ProtocolViolation::UnknownCacheIndex(index))?
                .to_vec();
            block.put_slice(&transaction);
            cache.remove(&transaction);
        }
    }

    let mut raw = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut raw).await?;
    let trailer = FrameHeader::decode(&raw).map_err(|_| ProtocolViolation::BadEndBlock)?;
    if trailer.msg_type != MessageType::EndBlock || trailer.length != 0 {
        return Err(ProtocolViolation::BadEndBlock.into());
    }

    Ok(block)
}

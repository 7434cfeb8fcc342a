use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read};
use thiserror::Error;

use super::MINMATCH;

/// Errors when decoding a raw LZ4 block.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DecodeError {
    /// Expected more bytes, but found none.
    /// Either your input was truncated or you're trying to decompress garbage.
    #[error("the block ended in the middle of a sequence")]
    UnexpectedEnd,
    /// The offset for a deduplication is out of bounds.
    /// This may be caused by a missing or incomplete dictionary.
    #[error("a match references data before the start of the output")]
    InvalidDeduplicationOffset,
    /// The block decodes to more bytes than the caller allowed.
    #[error("the block decompresses to more than {0} bytes")]
    OutputTooLarge(usize),
}
type Error = DecodeError;

/// This is how LZ4 encodes varints.
/// Just keep reading and adding while it's all F
fn read_lsic(initial: u8, cursor: &mut Cursor<&[u8]>) -> Result<usize, Error> {
    let mut value = initial as usize;
    if value == 0xF {
        loop {
            let more = cursor.read_u8().map_err(|_| Error::UnexpectedEnd)?;
            value = value.checked_add(more as usize).ok_or(Error::UnexpectedEnd)?;
            if more != 0xFF {
                break;
            }
        }
    }
    Ok(value)
}

/// Decompress an LZ4-compressed block.
///
/// Note that LZ4 heavily relies on a lookback mechanism where bytes earlier in the output stream are referenced.
/// You may either pre-initialize the output buffer with this data or pass it separately in `prefix`.
/// In particular, an LZ4 "dictionary" should be implemented as a `prefix` because you obviously
/// don't want the dictionary to appear at the beginning of the output.
///
/// At most `max_size` bytes are appended to `output`; a block that would produce more is rejected
/// before anything beyond the limit is allocated.
pub fn decompress_block(input: &[u8], prefix: &[u8], output: &mut Vec<u8>, max_size: usize) -> Result<(), Error> {
    let limit = output.len().saturating_add(max_size);
    let mut reader = Cursor::new(input);
    loop {
        let token = match reader.read_u8() {
            Ok(x) => x,
            _ => break,
        };

        // read literals
        let literal_length = read_lsic(token >> 4, &mut reader)?;
        if literal_length > limit - output.len() {
            return Err(Error::OutputTooLarge(max_size));
        }
        let remaining_input = input.len() - reader.position() as usize;
        if literal_length > remaining_input {
            return Err(Error::UnexpectedEnd);
        }

        let output_pos_pre_literal = output.len();
        output.resize(output_pos_pre_literal + literal_length, 0);
        reader.read_exact(&mut output[output_pos_pre_literal..]).map_err(|_| Error::UnexpectedEnd)?;

        // the last sequence has no match part
        if reader.position() as usize == input.len() {
            break;
        }

        // read duplicates
        let offset = reader.read_u16::<LE>().map_err(|_| Error::UnexpectedEnd)? as usize;
        let match_len = read_lsic(token & 0xF, &mut reader)?
            .checked_add(MINMATCH)
            .ok_or(Error::UnexpectedEnd)?;
        if match_len > limit - output.len() {
            return Err(Error::OutputTooLarge(max_size));
        }
        copy_overlapping(offset, match_len, prefix, output)?;
    }
    Ok(())
}

fn copy_overlapping(
    offset: usize,
    match_len: usize,
    prefix: &[u8],
    output: &mut Vec<u8>,
) -> Result<(), Error> {
    let old_len = output.len();
    match offset {
        0 => return Err(Error::InvalidDeduplicationOffset),
        i if i > old_len => {
            // need prefix for this
            let prefix_needed = i - old_len;
            if prefix_needed > prefix.len() {
                return Err(Error::InvalidDeduplicationOffset);
            }
            let how_many_bytes_from_prefix = std::cmp::min(prefix_needed, match_len);
            output.extend_from_slice(
                &prefix[prefix.len() - prefix_needed..][..how_many_bytes_from_prefix],
            );
            let remaining_len = match_len - how_many_bytes_from_prefix;
            if remaining_len != 0 {
                // offset stays the same because our cursor moved forward by the amount of bytes we took from prefix
                return copy_overlapping(offset, remaining_len, &[], output);
            }
        }

        // fastpath: memset if we repeat the same byte forever
        1 => output.resize(old_len + match_len, output[old_len - 1]),

        o if match_len <= o => {
            // fastpath: nonoverlapping
            // for borrowck reasons we have to extend with zeroes first and then memcpy
            // instead of simply using extend_from_slice
            output.resize(old_len + match_len, 0);
            let (head, tail) = output.split_at_mut(old_len);
            tail.copy_from_slice(&head[old_len - offset..][..match_len]);
        }
        2 | 4 | 8 => {
            // fastpath: overlapping but small
            // build a 16 byte pattern so we can handle 16 bytes each iteration instead of one
            let mut buf = [0u8; 16];
            for chunk in buf.chunks_mut(offset) {
                chunk.copy_from_slice(&output[old_len - offset..][..offset]);
            }
            output.resize(old_len + match_len, 0);
            for target in output[old_len..].chunks_mut(buf.len()) {
                target.copy_from_slice(&buf[..target.len()]);
            }
        }
        _ => {
            // slowest path: copy single bytes
            output.reserve(match_len);
            for i in 0..match_len {
                let b = output[old_len - offset + i];
                output.push(b);
            }
        }
    }
    Ok(())
}

/// Decompress all bytes of `input`, producing at most `max_size` bytes.
pub fn decompress(input: &[u8], max_size: usize) -> Result<Vec<u8>, Error> {
    let mut vec = Vec::new();
    decompress_block(input, &[], &mut vec, max_size)?;
    Ok(vec)
}

/// Decompress a block written by [`compress_prepend_size`](super::compress_prepend_size).
pub fn decompress_size_prepended(input: &[u8]) -> Result<Vec<u8>, Error> {
    let mut reader = Cursor::new(input);
    let size = reader.read_u32::<LE>().map_err(|_| Error::UnexpectedEnd)? as usize;
    let mut vec = Vec::with_capacity(std::cmp::min(size, super::max_compressed_size(input.len()) * 255));
    decompress_block(&input[4..], &[], &mut vec, size)?;
    if vec.len() != size {
        return Err(Error::UnexpectedEnd);
    }
    Ok(vec)
}

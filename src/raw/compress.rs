use std::mem;
use std::cmp;
use std::io::{self, Write};
use byteorder::{ByteOrder, NativeEndian, WriteBytesExt, LE};
use cfg_if::cfg_if;
use fehler::throws;

use super::{MINMATCH, MAX_OFFSET};

type Error = io::Error;

/// Duplication dictionary size.
///
/// Every four bytes is assigned an entry. When this number is lower, fewer entries exists, and
/// thus collisions are more likely, hurting the compression ratio.
const DICTIONARY_SIZE: usize = 1 << HASHLOG;
const HASHLOG: usize = 12;

/// Once a table has been shifted this far, its entries are rebased so positions keep fitting in 32 bits.
const REBASE_THRESHOLD: usize = 1 << 30;

/// The last match must start at least this many bytes before the end of the block.
const MFLIMIT: usize = 12;
/// The last five bytes of every block are always encoded as literals.
const LAST_LITERALS: usize = 5;

/// A hash table mapping 4-byte sequences to the position where they were last seen.
pub trait EncoderTable {
    fn payload_size_limit() -> usize;
    /// Remember `input[offset..]` and return the position previously stored in its slot.
    // offset is declared as usize but must not be above payload_size_limit
    fn replace(&mut self, input: &[u8], offset: usize) -> usize;

    /// The caller dropped `offset` bytes from the front of its buffer.
    fn offset(&mut self, offset: usize);
}

#[derive(Clone)]
pub struct U32Table {
    dict: [u32; DICTIONARY_SIZE],
    offset: usize,
}
impl Default for U32Table {
    fn default() -> Self {
        U32Table { dict: [0; DICTIONARY_SIZE], offset: 0 }
    }
}

cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        // on 64 bit systems, we read 64 bits and hash 5 bytes instead of 4
        fn hash_for_u32(input: &[u8]) -> usize {
            // read 64 bits if possible
            let v = input.get(..8).map(NativeEndian::read_u64).unwrap_or(0);
            // we end up only needing 5 bytes but the only case where this becomes
            // zero is at the very end, where we're not allowed to produce matches anyway

            #[cfg(target_endian = "little")] fn checksum_u64(v: u64) -> u64 { (v << 24).wrapping_mul(889523592379) }
            #[cfg(target_endian = "big")] fn checksum_u64(v: u64) -> u64 { (v >> 24).wrapping_mul(11400714785074694791) }
            (checksum_u64(v) >> (64 - HASHLOG)) as usize
        }
    } else {
        // shift by one more because we have half as many slots as the u16 table
        fn hash_for_u32(input: &[u8]) -> usize {
            hash_for_u16(input) >> 1
        }
    }
}

fn hash_for_u16(input: &[u8]) -> usize {
    let v = NativeEndian::read_u32(input);
    (v.wrapping_mul(2654435761) >> (32 - HASHLOG - 1)) as usize // twice as many slots
}

impl EncoderTable for U32Table {
    fn replace(&mut self, input: &[u8], offset: usize) -> usize {
        let o = offset + self.offset; // apply positive offset on input
        debug_assert!(o <= u32::MAX as usize, "EncoderTable contract violated");

        let value = mem::replace(&mut self.dict[hash_for_u32(&input[offset..])], o as u32);
        (value as usize).saturating_sub(self.offset) // apply negative offset on output
    }
    fn offset(&mut self, offset: usize) {
        self.offset += offset;
        if self.offset >= REBASE_THRESHOLD {
            let shift = self.offset;
            for slot in self.dict.iter_mut() {
                *slot = (*slot as usize).saturating_sub(shift) as u32;
            }
            self.offset = 0;
        }
    }
    fn payload_size_limit() -> usize { u32::MAX as usize - REBASE_THRESHOLD }
}

#[derive(Clone)]
pub struct U16Table {
    dict: [u16; DICTIONARY_SIZE * 2], // u16 fits twice as many slots into the same amount of memory
    offset: usize,
}
impl Default for U16Table {
    fn default() -> Self {
        U16Table { dict: [0; DICTIONARY_SIZE * 2], offset: 0 }
    }
}
impl EncoderTable for U16Table {
    fn replace(&mut self, input: &[u8], offset: usize) -> usize {
        let o = offset + self.offset;
        debug_assert!(o <= u16::MAX as usize, "EncoderTable contract violated");

        let value = mem::replace(&mut self.dict[hash_for_u16(&input[offset..])], o as u16);
        (value as usize).saturating_sub(self.offset)
    }
    fn offset(&mut self, offset: usize) {
        self.offset += offset;
    }
    fn payload_size_limit() -> usize { u16::MAX as usize }
}


#[derive(Copy, Clone, Debug)]
struct Duplicate {
    /// The number of bytes before our cursor, where the duplicate starts.
    offset: u16,

    /// The length beyond the four first bytes.
    ///
    /// Adding four to this number yields the actual length.
    extra_bytes: usize,
}


fn count_matching_bytes(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_usize(b: &[u8]) -> usize { // sadly byteorder doesn't have this
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&b[..REGSIZE]);
        usize::from_le_bytes(buf)
    }

    let mut matching_bytes = 0;
    // match in chunks of usize so we process a full register at a time instead of single bytes
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_usize(a) ^ read_usize(b);
        if xor == 0 {
            matching_bytes += REGSIZE;
        } else {
            // read_usize is little endian on every platform
            matching_bytes += (xor.trailing_zeros() / 8) as usize;
            return matching_bytes;
        }
    }

    // we only get here if we ran out of full registers, there may be a few more bytes to check
    let trailing_matches = a.iter().zip(b).skip(matching_bytes).take_while(|&(a, b)| a == b).count();
    matching_bytes + trailing_matches
}

const ACCELERATION: usize = 1;
const SKIP_TRIGGER: usize = 6; // for each 64 steps, skip in bigger increments

#[throws]
fn write_group<W: Write>(mut writer: &mut W, literal: &[u8], duplicate: Duplicate) {
    let literal_len = literal.len();

    let mut token = 0;
    write_lsic_head(&mut token, 4, literal_len);
    write_lsic_head(&mut token, 0, duplicate.extra_bytes);

    writer.write_u8(token)?;
    write_lsic_tail(&mut writer, literal_len)?;
    writer.write_all(literal)?;
    writer.write_u16::<LE>(duplicate.offset)?;
    write_lsic_tail(&mut writer, duplicate.extra_bytes)?;
}

#[throws]
fn write_literals<W: Write>(mut writer: &mut W, literal: &[u8]) {
    let mut token = 0;
    write_lsic_head(&mut token, 4, literal.len());
    writer.write_u8(token)?;
    write_lsic_tail(&mut writer, literal.len())?;
    writer.write_all(literal)?;
}

/// Compress `input[cursor..]` into a single LZ4 block.
///
/// Everything before `cursor` is the lookback window: matches may reference it, but it is not
/// encoded itself. This is how dictionaries and linked blocks are implemented.
/// The table must describe the window (or be empty), see [`EncoderTable`].
#[throws]
pub fn compress2<W: Write, T: EncoderTable>(input: &[u8], cursor: usize, table: &mut T, mut writer: W) {
    assert!(input.len() <= T::payload_size_limit());

    let init_cursor = cursor;
    let mut cursor = cursor;
    while cursor < input.len() {
        let literal_start = cursor;

        let mut step_counter = ACCELERATION << SKIP_TRIGGER;
        let mut step = 1;
        // look for a duplicate
        let duplicate = loop {
            if input.len().saturating_sub(cursor) < MFLIMIT {
                // end with a literal-only section
                write_literals(&mut writer, &input[literal_start..])?;
                return;
            }

            // the trailing literals are never part of a match
            let current_batch = &input[cursor..(input.len() - LAST_LITERALS)];
            let candidate = table.replace(input, cursor);

            // can never match on the very first byte, and the offset must be addressable
            if cursor != init_cursor && candidate < cursor && cursor - candidate <= MAX_OFFSET {
                let candidate_batch = &input[candidate..];
                let matching_bytes = count_matching_bytes(current_batch, candidate_batch);

                if let Some(mut extra_bytes) = matching_bytes.checked_sub(MINMATCH) {
                    // if it wasn't, this was just a hash collision :(
                    let offset = (cursor - candidate) as u16;

                    // backtrack
                    let max_backtrack = cursor - literal_start;
                    let backtrack = input[..cursor].iter().rev()
                        .zip(input[..candidate].iter().rev())
                        .take(max_backtrack)
                        .take_while(|&(a, b)| a == b)
                        .count();
                    // offset remains unchanged
                    extra_bytes += backtrack;
                    cursor += matching_bytes;

                    table.replace(input, cursor - 2);

                    break Duplicate { offset, extra_bytes };
                }
            }

            // no match, keep looping
            cursor += step;
            step = step_counter >> SKIP_TRIGGER;

            // the first byte of each iteration doesn't count
            if literal_start + 1 != cursor {
                step_counter += 1
            }
        };

        // cursor is now pointing past the match
        let literal_end = cursor - duplicate.extra_bytes - MINMATCH;
        write_group(&mut writer, &input[literal_start..literal_end], duplicate)?;
    }
}

fn write_lsic_head(token: &mut u8, shift: usize, value: usize) {
    let i = cmp::min(value, 0xF) as u8;
    *token |= i << shift;
}

#[throws]
fn write_lsic_tail<W: Write>(writer: &mut W, mut value: usize) {
    if value < 0xF {
        return;
    }

    value -= 0xF;

    while value >= 4 * 0xFF {
        writer.write_u32::<NativeEndian>(u32::MAX)?;
        value -= 4 * 0xFF;
    }
    while value >= 0xFF {
        writer.write_u8(0xFF)?;
        value -= 0xFF;
    }
    writer.write_u8(value as u8)?;
}

/// Compress all bytes of `input` into a single block.
pub fn compress(input: &[u8]) -> Vec<u8> {
    compress_with_dictionary(&[], input)
}

/// Compress `input` into a single block that may reference `dict`.
///
/// Only the trailing 64 KiB of the dictionary are reachable. The same dictionary has to be passed
/// as the prefix when decompressing.
pub fn compress_with_dictionary(dict: &[u8], input: &[u8]) -> Vec<u8> {
    let dict = &dict[dict.len().saturating_sub(super::WINDOW_SIZE)..];
    let mut buffer = Vec::with_capacity(dict.len() + input.len());
    buffer.extend_from_slice(dict);
    buffer.extend_from_slice(input);

    let mut output = Vec::with_capacity(max_compressed_size(input.len()));
    let result = if buffer.len() <= U16Table::payload_size_limit() {
        let mut table = U16Table::default();
        prime_table(&mut table, dict);
        compress2(&buffer, dict.len(), &mut table, &mut output)
    } else {
        let mut table = U32Table::default();
        prime_table(&mut table, dict);
        compress2(&buffer, dict.len(), &mut table, &mut output)
    };
    result.expect("writing into a Vec never fails");
    output
}

/// Enter (a sample of) the positions of `dict` into `table` so that matches against it are found.
pub fn prime_table<T: EncoderTable>(table: &mut T, dict: &[u8]) {
    if dict.len() < MINMATCH {
        return;
    }
    for offset in (0..=dict.len() - MINMATCH).step_by(3) {
        table.replace(dict, offset);
    }
}

/// The worst-case size of a compressed block for `input_len` bytes of input.
pub fn max_compressed_size(input_len: usize) -> usize {
    input_len + input_len / 255 + 16
}

/// Compress `input` and prepend the uncompressed size as a little endian `u32`.
pub fn compress_prepend_size(input: &[u8]) -> Vec<u8> {
    let compressed = compress(input);
    let mut output = Vec::with_capacity(4 + compressed.len());
    output.extend_from_slice(&(input.len() as u32).to_le_bytes());
    output.extend_from_slice(&compressed);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_bytes_stop_at_first_difference() {
        assert_eq!(count_matching_bytes(b"abcdefghijk", b"abcdefghijz"), 10);
        assert_eq!(count_matching_bytes(b"abc", b"abd"), 2);
        assert_eq!(count_matching_bytes(b"", b"abd"), 0);
    }

    #[test]
    fn lsic_tail_lengths() {
        let mut out = Vec::new();
        write_lsic_tail(&mut out, 14).unwrap();
        assert!(out.is_empty());
        write_lsic_tail(&mut out, 15).unwrap();
        assert_eq!(out, [0]);
        out.clear();
        write_lsic_tail(&mut out, 15 + 255 + 3).unwrap();
        assert_eq!(out, [0xFF, 3]);
    }

    #[test]
    fn short_input_is_all_literals() {
        let compressed = compress(b"hello");
        assert_eq!(compressed, [0x50, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn repetitive_input_shrinks() {
        let input = vec![7u8; 10_000];
        assert!(compress(&input).len() < 100);
    }

    #[test]
    fn table_rebase_keeps_recent_positions() {
        let input = b"0123456789abcdef";
        let mut table = U32Table::default();
        table.offset(REBASE_THRESHOLD - 4);
        table.replace(input, 12);
        table.offset(8);
        assert_eq!(table.offset, 0);
        assert_eq!(table.replace(input, 12), 4);
    }
}

//! The LZ4 frame format.
//!
//! A frame wraps a sequence of raw blocks with a header describing them, optional checksums and an
//! end mark. Several frames may be concatenated into one stream, and skippable frames carrying
//! user data may be placed between them.

mod compress;
mod decompress;
mod header;

/// The four magic bytes at the start of every LZ4 frame.
const MAGIC: u32 = 0x184D2204;
/// Skippable frames use sixteen magic numbers, the low nibble is the user data frame id.
const SKIPPABLE_MAGIC: u32 = 0x184D2A50;
const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFFFFF0;
/// The magic number of the old frame format written by `lz4 -l`.
const LEGACY_MAGIC: u32 = 0x184C2102;
/// The frame format sets the high bit of every length field to indicate that the data was not compressed.
const INCOMPRESSIBLE: u32 = 1 << 31;
/// Magic, flags, block descriptor, content size, dictionary id and header checksum.
const MAX_HEADER_SIZE: usize = 4 + 2 + 8 + 4 + 1;

pub use compress::*;
pub use decompress::*;
pub use header::{BlockMode, BlockSize, ChecksumMode, Flags, FrameDescriptor, HeaderError, Unsupported, header_checksum};

use crate::raw::WINDOW_SIZE;

/// Which of the three checksums of the frame format failed to verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumKind {
    Header,
    Block,
    Content,
}

/// The contents of a skippable frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDataFrame {
    /// The low nibble of the magic number, `0..=15`.
    pub id: u8,
    pub data: Vec<u8>,
}

/// Only the last 64 KiB of a dictionary can ever be referenced.
fn dictionary_window(dict: &[u8]) -> &[u8] {
    &dict[dict.len().saturating_sub(WINDOW_SIZE)..]
}

#![allow(non_upper_case_globals)]

use byteorder::{LE, ReadBytesExt, WriteBytesExt};
use std::hash::Hasher;
use std::io::{self, Read, Write};
use thiserror::Error;
use twox_hash::XxHash32;
use fehler::{throw, throws};
use bitflags::bitflags;

use super::DecompressionError;

bitflags! {
    pub struct Flags: u8 {
        const IndependentBlocks = 0b00100000;
        const BlockChecksums    = 0b00010000;
        const ContentSize       = 0b00001000;
        const ContentChecksum   = 0b00000100;
        const DictionaryId      = 0b00000001;
    }
}

bitflags! {
    /// Which checksums a frame carries. Both may be enabled at the same time.
    pub struct ChecksumMode: u8 {
        /// A checksum over the entire decompressed content, verified at the end of the frame.
        const CONTENT = 0b01;
        /// A checksum over every block as stored, verified before the block is decoded.
        const BLOCK   = 0b10;
    }
}

/// The header is malformed: this is not an LZ4 frame, or it has been damaged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("wrong magic number in file header: {0:08x}")]
    WrongMagic(u32),
    #[error("reserved bits in flags set")]
    ReservedFlagBitsSet,
    #[error("reserved bits in bd set")]
    ReservedBdBitsSet,
    #[error("block of {0} bytes is larger than the maximum block size")]
    BlockTooLarge(u32),
}

/// The header is well-formed, but asks for something this decoder can't do.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    #[error("file version {0} not supported")]
    Version(u8),
    #[error("block size value {0} is reserved by the frame format")]
    BlockSize(u8),
    #[error("frame needs dictionary {0:08x} but none was provided")]
    MissingDictionary(u32),
    #[error("the legacy frame format is not supported")]
    LegacyFrame,
}

/// Whether blocks may reference data of the blocks before them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockMode {
    /// Blocks share a 64 KiB window with the blocks before them. Slightly better ratio.
    Linked,
    /// Every block starts with an empty window, so blocks can be decoded on their own.
    Independent,
}

/// The maximum number of uncompressed bytes in one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSize {
    Max64KB = 4,
    Max256KB = 5,
    Max1MB = 6,
    Max4MB = 7,
}

impl BlockSize {
    pub fn get_size(self) -> usize {
        1 << (self as u8 * 2 + 8)
    }

    fn bd_byte(self) -> u8 {
        (self as u8) << 4
    }

    #[throws(DecompressionError)]
    fn parse_bd(i: u8) -> Self {
        if (i & 0b10001111) != 0 {
            throw!(HeaderError::ReservedBdBitsSet);
        }
        match (i >> 4) & 0b111 {
            4 => BlockSize::Max64KB,
            5 => BlockSize::Max256KB,
            6 => BlockSize::Max1MB,
            7 => BlockSize::Max4MB,
            other => throw!(Unsupported::BlockSize(other)),
        }
    }
}

impl Flags {
    #[throws(DecompressionError)]
    pub fn parse(i: u8) -> Self {
        let version = i >> 6;
        if version != 1 {
            throw!(Unsupported::Version(version));
        }
        if (i & 0b10) != 0 {
            throw!(HeaderError::ReservedFlagBitsSet);
        }

        Flags::from_bits_truncate(i)
    }

    pub fn independent_blocks(&self) -> bool { self.contains(Flags::IndependentBlocks) }
    pub fn block_checksums(&self)    -> bool { self.contains(Flags::BlockChecksums) }
    pub fn content_size(&self)       -> bool { self.contains(Flags::ContentSize) }
    pub fn content_checksum(&self)   -> bool { self.contains(Flags::ContentChecksum) }
    pub fn dictionary_id(&self)      -> bool { self.contains(Flags::DictionaryId) }
}

/// Everything the frame header says about the frame that follows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub block_mode: BlockMode,
    pub block_size: BlockSize,
    pub block_checksums: bool,
    pub content_checksum: bool,
    pub content_size: Option<u64>,
    pub dictionary_id: Option<u32>,
}

impl FrameDescriptor {
    pub fn flags(&self) -> Flags {
        let mut flags = Flags::empty();
        if self.block_mode == BlockMode::Independent {
            flags |= Flags::IndependentBlocks;
        }
        if self.block_checksums {
            flags |= Flags::BlockChecksums;
        }
        if self.content_checksum {
            flags |= Flags::ContentChecksum;
        }
        if self.content_size.is_some() {
            flags |= Flags::ContentSize;
        }
        if self.dictionary_id.is_some() {
            flags |= Flags::DictionaryId;
        }
        flags
    }

    /// Write the descriptor including the magic number and the header checksum.
    #[throws(io::Error)]
    pub fn write<W: Write>(&self, mut writer: W) {
        let version = 1 << 6;

        let mut header = Vec::with_capacity(super::MAX_HEADER_SIZE);
        header.write_u32::<LE>(super::MAGIC)?;
        header.write_u8(version | self.flags().bits())?;
        header.write_u8(self.block_size.bd_byte())?;
        if let Some(content_size) = self.content_size {
            header.write_u64::<LE>(content_size)?;
        }
        if let Some(id) = self.dictionary_id {
            header.write_u32::<LE>(id)?;
        }

        let checksum = header_checksum(&header[4..]); // skip magic for header checksum
        header.write_u8(checksum)?;
        writer.write_all(&header)?;
    }

    /// Read the descriptor that follows an LZ4 magic number and verify its checksum.
    #[throws(DecompressionError)]
    pub fn read<R: Read>(mut reader: R) -> Self {
        let mut descriptor = Vec::with_capacity(super::MAX_HEADER_SIZE);

        let flags_byte = reader.read_u8()?;
        let bd_byte = reader.read_u8()?;
        descriptor.push(flags_byte);
        descriptor.push(bd_byte);
        let flags = Flags::parse(flags_byte)?;
        let block_size = BlockSize::parse_bd(bd_byte)?;

        let content_size = if flags.content_size() {
            let i = reader.read_u64::<LE>()?;
            descriptor.extend_from_slice(&i.to_le_bytes());
            Some(i)
        } else {
            None
        };

        let dictionary_id = if flags.dictionary_id() {
            let i = reader.read_u32::<LE>()?;
            descriptor.extend_from_slice(&i.to_le_bytes());
            Some(i)
        } else {
            None
        };

        let header_checksum_desired = reader.read_u8()?;
        if header_checksum_desired != header_checksum(&descriptor) {
            throw!(DecompressionError::ChecksumMismatch(super::ChecksumKind::Header));
        }

        FrameDescriptor {
            block_mode: if flags.independent_blocks() { BlockMode::Independent } else { BlockMode::Linked },
            block_size,
            block_checksums: flags.block_checksums(),
            content_checksum: flags.content_checksum(),
            content_size,
            dictionary_id,
        }
    }
}

/// The second byte of the xxh32 over the descriptor.
pub fn header_checksum(descriptor: &[u8]) -> u8 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(descriptor);
    (hasher.finish() >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn descriptor() -> FrameDescriptor {
        FrameDescriptor {
            block_mode: BlockMode::Linked,
            block_size: BlockSize::Max64KB,
            block_checksums: false,
            content_checksum: true,
            content_size: None,
            dictionary_id: None,
        }
    }

    #[test]
    fn block_sizes() {
        assert_eq!(BlockSize::Max64KB.get_size(), 64 * 1024);
        assert_eq!(BlockSize::Max256KB.get_size(), 256 * 1024);
        assert_eq!(BlockSize::Max1MB.get_size(), 1024 * 1024);
        assert_eq!(BlockSize::Max4MB.get_size(), 4 * 1024 * 1024);
    }

    #[test]
    fn layout_matches_reference() {
        let mut d = descriptor();
        d.block_mode = BlockMode::Independent;
        let mut out = Vec::new();
        d.write(&mut out).unwrap();
        // what `lz4 -B4` writes
        assert_eq!(out, [0x04, 0x22, 0x4D, 0x18, 0x64, 0x40, 0xA7]);
    }

    #[test]
    fn optional_fields_survive() {
        let mut d = descriptor();
        d.block_mode = BlockMode::Independent;
        d.block_size = BlockSize::Max4MB;
        d.block_checksums = true;
        d.content_size = Some(0x0102_0304_0506_0708);
        d.dictionary_id = Some(0xDEAD_BEEF);

        let mut out = Vec::new();
        d.write(&mut out).unwrap();
        assert_eq!(out.len(), 4 + 2 + 8 + 4 + 1);
        let parsed = FrameDescriptor::read(Cursor::new(&out[4..])).unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn damaged_header_is_rejected() {
        let mut out = Vec::new();
        descriptor().write(&mut out).unwrap();
        out[6] ^= 1;
        match FrameDescriptor::read(Cursor::new(&out[4..])) {
            Err(DecompressionError::ChecksumMismatch(super::super::ChecksumKind::Header)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn reserved_and_unsupported_values() {
        assert!(matches!(Flags::parse(0b1000_0000), Err(DecompressionError::UnsupportedOption(Unsupported::Version(2)))));
        assert!(matches!(Flags::parse(0b0100_0010), Err(DecompressionError::InvalidFrame(HeaderError::ReservedFlagBitsSet))));
        assert!(matches!(BlockSize::parse_bd(0x41), Err(DecompressionError::InvalidFrame(HeaderError::ReservedBdBitsSet))));
        assert!(matches!(BlockSize::parse_bd(0x30), Err(DecompressionError::UnsupportedOption(Unsupported::BlockSize(3)))));
    }
}

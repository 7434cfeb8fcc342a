//! Property-based round trips through the block and frame codecs.

use proptest::prelude::*;
use std::io::{Read, Write};

use lz4_stream::framed::{BlockMode, ChecksumMode, CompressionSettings, DecompressionError};
use lz4_stream::stream::{CompressStream, DecompressStream};
use lz4_stream::{compress_with, decompress, raw};

/// Bytes from a small alphabet, so that matches of every length show up.
fn compressible_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), Just(0u8), any::<u8>()], 0..20_000)
}

fn block_mode_strategy() -> impl Strategy<Value = BlockMode> {
    prop_oneof![Just(BlockMode::Linked), Just(BlockMode::Independent)]
}

fn checksum_mode_strategy() -> impl Strategy<Value = ChecksumMode> {
    (0u8..4).prop_map(ChecksumMode::from_bits_truncate)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn raw_round_trip(input in compressible_bytes()) {
        let compressed = raw::compress(&input);
        prop_assert!(compressed.len() <= raw::max_compressed_size(input.len()));
        prop_assert_eq!(raw::decompress(&compressed, input.len()).unwrap(), input);
    }

    #[test]
    fn frame_round_trip(
        input in compressible_bytes(),
        mode in block_mode_strategy(),
        checksums in checksum_mode_strategy(),
    ) {
        let mut settings = CompressionSettings::default();
        settings.block_mode(mode).checksum_mode(checksums);
        let compressed = compress_with(&input, &settings).unwrap();
        prop_assert_eq!(decompress(&compressed).unwrap(), input);
    }

    /// Arbitrary write sizes and flushes don't change the content.
    #[test]
    fn chunked_writes(
        input in compressible_bytes(),
        chunks in prop::collection::vec((1usize..5000, any::<bool>()), 1..20),
    ) {
        let mut stream = CompressStream::new(Vec::new());
        let mut rest = &input[..];
        for &(len, flush) in chunks.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (head, tail) = rest.split_at(len.min(rest.len()));
            stream.write_all(head).unwrap();
            if flush {
                stream.flush().unwrap();
            }
            rest = tail;
        }
        let compressed = stream.finish().unwrap();

        let mut out = Vec::new();
        DecompressStream::new(&compressed[..]).read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, input);
    }

    /// Garbage never panics, and cut-off streams never decode.
    #[test]
    fn damaged_input_is_an_error(input in compressible_bytes(), cut in any::<prop::sample::Index>()) {
        let mut settings = CompressionSettings::default();
        settings.block_checksums(true);
        let compressed = compress_with(&input, &settings).unwrap();
        let len = cut.index(compressed.len());
        prop_assert!(matches!(decompress(&compressed[..len]), Err(DecompressionError::UnexpectedEnd)));

        let _ = decompress(&input);
    }
}

//! LZ4 compression in pure Rust: the raw block format, the frame format and `std::io` streams.
//!
//! ```
//! use std::io::{Read, Write};
//! use lz4_stream::stream::{CompressStream, DecompressStream};
//!
//! let mut stream = CompressStream::new(Vec::new());
//! stream.write_all(b"hello world")?;
//! let compressed = stream.finish()?;
//!
//! let mut plaintext = String::new();
//! DecompressStream::new(&compressed[..]).read_to_string(&mut plaintext)?;
//! assert_eq!(plaintext, "hello world");
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! Skippable frames can carry application data through a compressed stream:
//!
//! ```
//! use lz4_stream::framed::{CompressionSettings, LZ4FrameReader};
//!
//! let mut writer = CompressionSettings::default().writer(Vec::new())?;
//! writer.write_data(b"content")?;
//! writer.write_user_data_frame(1, b"metadata")?;
//! let compressed = writer.finish()?;
//!
//! let mut seen = Vec::new();
//! let mut reader = LZ4FrameReader::new(&compressed[..]);
//! reader.on_user_data_frame(|frame| seen.push(frame.data));
//! let mut block = Vec::new();
//! reader.decode_block(&mut block)?;
//! assert_eq!(block, b"content");
//! block.clear();
//! reader.decode_block(&mut block)?;
//! assert!(block.is_empty());
//! drop(reader);
//! assert_eq!(seen, vec![b"metadata".to_vec()]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

pub mod raw;
pub mod framed;
pub mod stream;

pub use framed::{CompressionSettings, CompressionError, DecompressionError};

/// Compress `input` into a single frame with the default settings.
pub fn compress(input: &[u8]) -> Vec<u8> {
    compress_with(input, &CompressionSettings::default())
        .expect("default settings declare no content size and Vec never fails to write")
}

/// Compress `input` into LZ4 frames.
pub fn compress_with(input: &[u8], settings: &CompressionSettings) -> Result<Vec<u8>, CompressionError> {
    let mut output = Vec::with_capacity(raw::max_compressed_size(input.len()) / 2);
    settings.compress(input, &mut output)?;
    Ok(output)
}

/// Decompress all frames in `input`.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecompressionError> {
    framed::decompress_frame(input)
}

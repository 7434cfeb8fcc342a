use byteorder::{LE, ReadBytesExt};
use std::fmt;
use std::hash::Hasher;
use std::io::{self, Read, ErrorKind};
use twox_hash::XxHash32;
use thiserror::Error;
use fehler::{throw, throws};
use tracing::{debug, trace};

use super::{ChecksumKind, UserDataFrame, MAGIC, SKIPPABLE_MAGIC, SKIPPABLE_MAGIC_MASK, LEGACY_MAGIC, INCOMPRESSIBLE, WINDOW_SIZE, dictionary_window};
use super::header::{BlockMode, FrameDescriptor, HeaderError, Unsupported};
use crate::raw::{self, DecodeError};


/// Errors when decompressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum DecompressionError {
    #[error("error reading from the input you gave me")]
    InputError(#[source] io::Error),
    #[error("the input ended in the middle of a frame")]
    UnexpectedEnd,
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] HeaderError),
    #[error("the {0:?} checksum was invalid")]
    ChecksumMismatch(ChecksumKind),
    #[error("the raw LZ4 decompression failed (data corruption?): {0}")]
    CorruptBlock(#[from] DecodeError),
    #[error("the frame declares {declared} bytes of content but contains {actual}")]
    SizeMismatch { declared: u64, actual: u64 },
    #[error("unsupported frame: {0}")]
    UnsupportedOption(#[from] Unsupported),
    #[error("an earlier error ended this stream")]
    AlreadyFailed,
}
type Error = DecompressionError; // do it this way for better docs

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        match e.kind() {
            ErrorKind::UnexpectedEof => Error::UnexpectedEnd,
            _ => Error::InputError(e),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::InputError(e) => e,
            e @ Error::UnexpectedEnd => io::Error::new(ErrorKind::UnexpectedEof, e),
            e @ Error::AlreadyFailed => io::Error::new(ErrorKind::Other, e),
            e => io::Error::new(ErrorKind::InvalidData, e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    BetweenFrames,
    InFrame,
    Done,
    Failed,
}

/// Read a stream of LZ4 frames.
///
/// This reader reads the blocks inside a frame one by one and moves on to the next frame
/// when a frame ends, until the input is exhausted. Skippable frames are handed to the
/// user data handler (or dropped if there is none).
///
/// Nothing is read until the first call to [`decode_block`](Self::decode_block).
pub struct LZ4FrameReader<'a, R: Read> {
    reader: R,
    state: State,
    descriptor: Option<FrameDescriptor>,
    dictionary: Option<&'a [u8]>,
    user_data_handler: Option<Box<dyn FnMut(UserDataFrame) + Send + 'a>>,

    read_buf: Vec<u8>,
    window: Vec<u8>,
    content_hasher: Option<XxHash32>,
    frame_content_len: u64,

    block_count: u64,
    frame_count: u64,
}

impl<'a, R: Read> fmt::Debug for LZ4FrameReader<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LZ4FrameReader")
            .field("state", &self.state)
            .field("descriptor", &self.descriptor)
            .field("block_count", &self.block_count)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl<'a, R: Read> LZ4FrameReader<'a, R> {
    pub fn new(reader: R) -> Self {
        LZ4FrameReader {
            reader,
            state: State::BetweenFrames,
            descriptor: None,
            dictionary: None,
            user_data_handler: None,
            read_buf: Vec::new(),
            window: Vec::with_capacity(WINDOW_SIZE),
            content_hasher: None,
            frame_content_len: 0,
            block_count: 0,
            frame_count: 0,
        }
    }

    /// Use `dict` as the initial window of every frame.
    ///
    /// Frames that name a dictionary id can't be decoded without one. The id itself is not checked,
    /// as picking the right dictionary is up to the application.
    pub fn with_dictionary(mut self, dict: &'a [u8]) -> Self {
        self.dictionary = Some(dictionary_window(dict));
        self
    }

    /// Called synchronously for every skippable frame, in stream order.
    pub fn on_user_data_frame<F: FnMut(UserDataFrame) + Send + 'a>(&mut self, handler: F) {
        self.user_data_handler = Some(Box::new(handler));
    }

    /// The header of the frame currently being read (or the last one, once the stream has ended).
    pub fn descriptor(&self) -> Option<&FrameDescriptor> { self.descriptor.as_ref() }
    pub fn block_size(&self) -> Option<usize> { self.descriptor.as_ref().map(|d| d.block_size.get_size()) }
    pub fn frame_size(&self) -> Option<u64> { self.descriptor.as_ref().and_then(|d| d.content_size) }
    pub fn dictionary_id(&self) -> Option<u32> { self.descriptor.as_ref().and_then(|d| d.dictionary_id) }
    /// Number of data blocks decoded so far, across all frames.
    pub fn block_count(&self) -> u64 { self.block_count }
    /// Number of frames started so far, including empty and skippable frames.
    pub fn frame_count(&self) -> u64 { self.frame_count }
    /// Whether the end of the input has been reached at a frame boundary.
    pub fn is_finished(&self) -> bool { self.state == State::Done }

    pub fn get_ref(&self) -> &R { &self.reader }
    pub fn get_mut(&mut self) -> &mut R { &mut self.reader }
    pub fn into_inner(self) -> R { self.reader }

    /// Decode the next block that carries data into `output`.
    ///
    /// `output` is left empty once the input has been exhausted.
    ///
    /// Errors are final: after one has been returned, every further call fails with
    /// [`DecompressionError::AlreadyFailed`].
    #[throws]
    pub fn decode_block(&mut self, output: &mut Vec<u8>) {
        assert!(output.is_empty(), "You must pass an empty buffer to this interface.");

        while output.is_empty() {
            let result = match self.state {
                State::Done => return,
                State::Failed => throw!(Error::AlreadyFailed),
                State::BetweenFrames => self.next_frame(),
                State::InFrame => self.decode_frame_block(output),
            };
            if let Err(e) = result {
                self.state = State::Failed;
                output.clear();
                debug!(error = %e, "LZ4 stream failed");
                throw!(e);
            }
        }
    }

    /// Read magic bytes until we're at the start of a data frame, or at the end of the input.
    #[throws]
    fn next_frame(&mut self) {
        let mut magic = [0u8; 4];
        let mut got = 0;
        while got < magic.len() {
            match self.reader.read(&mut magic[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => throw!(e),
            }
        }
        if got == 0 && self.frame_count > 0 {
            debug!(frames = self.frame_count, blocks = self.block_count, "end of LZ4 stream");
            self.state = State::Done;
            return;
        }
        if got < magic.len() {
            throw!(Error::UnexpectedEnd);
        }

        let magic = u32::from_le_bytes(magic);
        if magic & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC {
            self.read_user_data_frame((magic & !SKIPPABLE_MAGIC_MASK) as u8)?;
            return;
        }
        if magic == LEGACY_MAGIC {
            throw!(Unsupported::LegacyFrame);
        }
        if magic != MAGIC {
            throw!(HeaderError::WrongMagic(magic));
        }

        let descriptor = FrameDescriptor::read(&mut self.reader)?;
        if let Some(id) = descriptor.dictionary_id {
            if self.dictionary.is_none() {
                throw!(Unsupported::MissingDictionary(id));
            }
        }

        self.window.clear();
        if descriptor.block_mode == BlockMode::Linked {
            self.window.extend_from_slice(self.dictionary.unwrap_or(&[]));
        }
        self.content_hasher = if descriptor.content_checksum {
            Some(XxHash32::with_seed(0))
        } else {
            None
        };
        self.frame_content_len = 0;
        self.frame_count += 1;
        self.state = State::InFrame;
        debug!(frame = self.frame_count, ?descriptor, "started LZ4 frame");
        self.descriptor = Some(descriptor);
    }

    #[throws]
    fn read_user_data_frame(&mut self, id: u8) {
        let len = self.reader.read_u32::<LE>()?;
        let mut data = Vec::new();
        (&mut self.reader).take(len.into()).read_to_end(&mut data)?;
        if data.len() as u64 != u64::from(len) {
            throw!(Error::UnexpectedEnd);
        }

        self.frame_count += 1;
        debug!(id, len, "read user data frame");
        if let Some(handler) = self.user_data_handler.as_mut() {
            handler(UserDataFrame { id, data });
        }
    }

    #[throws]
    fn decode_frame_block(&mut self, output: &mut Vec<u8>) {
        let (block_mode, block_maxsize, block_checksums, content_size) = match self.descriptor.as_ref() {
            Some(d) => (d.block_mode, d.block_size.get_size(), d.block_checksums, d.content_size),
            None => unreachable!("in a frame without a header"),
        };

        let reader = &mut self.reader;

        let block_length = reader.read_u32::<LE>()?;
        if block_length == 0 {
            if let Some(hasher) = self.content_hasher.take() {
                let checksum = reader.read_u32::<LE>()?;
                if hasher.finish() != checksum.into() {
                    throw!(Error::ChecksumMismatch(ChecksumKind::Content));
                }
            }
            if let Some(declared) = content_size {
                if declared != self.frame_content_len {
                    throw!(Error::SizeMismatch { declared, actual: self.frame_content_len });
                }
            }
            self.state = State::BetweenFrames;
            debug!(frame = self.frame_count, bytes = self.frame_content_len, "ended LZ4 frame");
            return;
        }

        let is_compressed = block_length & INCOMPRESSIBLE == 0;
        let block_length = block_length & !INCOMPRESSIBLE;

        if block_length as usize > block_maxsize {
            throw!(HeaderError::BlockTooLarge(block_length));
        }

        let buf = &mut self.read_buf;
        buf.resize(block_length as usize, 0);
        reader.read_exact(buf.as_mut_slice())?;

        if block_checksums {
            let checksum = reader.read_u32::<LE>()?;
            let mut hasher = XxHash32::with_seed(0);
            hasher.write(&buf);
            if hasher.finish() != checksum.into() {
                throw!(Error::ChecksumMismatch(ChecksumKind::Block));
            }
        }

        if is_compressed {
            let prefix = match block_mode {
                BlockMode::Linked => &self.window[..],
                BlockMode::Independent => self.dictionary.unwrap_or(&[]),
            };
            raw::decompress_block(&buf, prefix, output, block_maxsize)?;
        } else {
            output.extend_from_slice(&buf);
        }

        if block_mode == BlockMode::Linked {
            let window = &mut self.window;
            let outlen = output.len();
            if outlen < WINDOW_SIZE {
                let available_bytes = window.len() + outlen;
                if let Some(surplus_bytes) = available_bytes.checked_sub(WINDOW_SIZE) {
                    // remove as many bytes from front as we are replacing
                    window.drain(..surplus_bytes);
                }
                window.extend_from_slice(&output);
            } else {
                window.clear();
                window.extend_from_slice(&output[outlen - WINDOW_SIZE..]);
            }

            debug_assert!(window.len() <= WINDOW_SIZE);
        }

        if let Some(hasher) = self.content_hasher.as_mut() {
            hasher.write(&output);
        }
        self.frame_content_len += output.len() as u64;
        if let Some(declared) = content_size {
            if self.frame_content_len > declared {
                throw!(Error::SizeMismatch { declared, actual: self.frame_content_len });
            }
        }
        self.block_count += 1;
        trace!(stored = block_length, uncompressed = output.len(), is_compressed, "read block");
    }
}

/// Convenience wrapper around `LZ4FrameReader` that reads everything into a vector and returns it.
#[throws]
pub fn decompress_frame<R: Read>(reader: R) -> Vec<u8> {
    let mut frame_reader = LZ4FrameReader::new(reader);
    let mut plaintext = Vec::new();
    let mut block = Vec::new();
    loop {
        frame_reader.decode_block(&mut block)?;
        if block.is_empty() {
            break;
        }
        plaintext.extend_from_slice(&block);
        block.clear();
    }
    plaintext
}

use byteorder::{LE, WriteBytesExt};
use std::cmp;
use std::hash::Hasher;
use std::io::{self, Read, Write, Seek, SeekFrom, ErrorKind};
use std::mem;
use twox_hash::XxHash32;
use thiserror::Error;
use fehler::{throw, throws};
use tracing::{debug, trace};

use super::{INCOMPRESSIBLE, SKIPPABLE_MAGIC, WINDOW_SIZE, dictionary_window};
use super::header::{BlockMode, BlockSize, ChecksumMode, FrameDescriptor};
use crate::raw::{U32Table, compress2, prime_table, EncoderTable};


/// Errors when compressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("error reading from the input you gave me")]
    ReadError(#[source] io::Error),
    #[error("error writing to the output you gave me")]
    WriteError(#[from] io::Error),
    #[error("the frame declares {declared} bytes of content but {actual} were written")]
    SizeMismatch { declared: u64, actual: u64 },
    #[error("user data frame id {0} is out of range (0 to 15)")]
    InvalidUserDataId(u8),
    #[error("a fixed content size can't be combined with splitting the stream into several frames")]
    ConflictingSettings,
    #[error("an earlier error ended this stream")]
    AlreadyFailed,
}
type Error = CompressionError; // do it this way for better docs
impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::WriteError(e) => e,
            Error::ReadError(e) => e,
            e @ Error::SizeMismatch { .. } => io::Error::new(ErrorKind::InvalidData, e),
            e @ Error::AlreadyFailed => io::Error::new(ErrorKind::Other, e),
            e => io::Error::new(ErrorKind::InvalidInput, e),
        }
    }
}

/// A builder-style struct that configures compression settings.
/// This is how you compress LZ4 frames.
/// (An LZ4 file usually consists of a single frame.)
///
/// Create it using `Default::default()`.
#[derive(Clone, Debug)]
pub struct CompressionSettings<'a> {
    block_mode: BlockMode,
    block_checksums: bool,
    content_checksum: bool,
    block_size: BlockSize,
    content_size: Option<u64>,
    blocks_per_frame: Option<u64>,
    dictionary: Option<&'a [u8]>,
    dictionary_id: Option<u32>,
}
impl<'a> Default for CompressionSettings<'a> {
    fn default() -> Self {
        Self {
            block_mode: BlockMode::Linked,
            block_checksums: false,
            content_checksum: true,
            block_size: BlockSize::Max64KB,
            content_size: None,
            blocks_per_frame: None,
            dictionary: None,
            dictionary_id: None,
        }
    }
}
impl<'a> CompressionSettings<'a> {
    /// In independent mode, blocks are not allowed to reference data from previous blocks.
    /// Hence, using linked blocks yields slightly better compression.
    /// The downside of linked blocks is that seeking becomes impossible - the entire frame always has
    /// to be decompressed from the beginning.
    ///
    /// Blocks are linked by default.
    pub fn block_mode(&mut self, v: BlockMode) -> &mut Self {
        self.block_mode = v;
        self
    }

    /// Shorthand for [`block_mode`](Self::block_mode).
    pub fn independent_blocks(&mut self, v: bool) -> &mut Self {
        self.block_mode(if v { BlockMode::Independent } else { BlockMode::Linked })
    }

    /// Block checksums can help detect data corruption in storage and transit.
    /// They do not offer error correction though.
    ///
    /// Block checksums are disabled by default.
    pub fn block_checksums(&mut self, v: bool) -> &mut Self {
        self.block_checksums = v;
        self
    }

    /// The content checksum (also called frame checksum) is calculated over the contents of the entire frame.
    /// This makes them cheaper than block checksums as their size overhead is constant
    /// as well as marginally more useful, because they can help protect against incorrect decompression.
    ///
    /// Note that the content checksum can only be verified *after* the entire frame has been read
    /// (and returned!), which is the downside of content checksums.
    ///
    /// Frame checksums are enabled by default.
    pub fn content_checksum(&mut self, v: bool) -> &mut Self {
        self.content_checksum = v;
        self
    }

    /// Set both checksum flags at once.
    pub fn checksum_mode(&mut self, v: ChecksumMode) -> &mut Self {
        self.content_checksum = v.contains(ChecksumMode::CONTENT);
        self.block_checksums = v.contains(ChecksumMode::BLOCK);
        self
    }

    /// The maximum amount of uncompressed data per block.
    ///
    /// The default block size is 64 KiB.
    pub fn block_size(&mut self, v: BlockSize) -> &mut Self {
        self.block_size = v;
        self
    }

    /// Declare the size of the content up front. It is stored in the frame header so decompressors
    /// can preallocate and verify it.
    ///
    /// Finishing a frame whose content doesn't have exactly this size fails with
    /// [`CompressionError::SizeMismatch`] (the frame is still terminated properly).
    pub fn content_size(&mut self, v: Option<u64>) -> &mut Self {
        self.content_size = v;
        self
    }

    /// End the current frame after this many blocks and start a new one with the next block.
    ///
    /// Every frame restarts the lookback window and the content checksum, so a reader can resume
    /// at any frame boundary.
    pub fn blocks_per_frame(&mut self, v: Option<u64>) -> &mut Self {
        self.blocks_per_frame = v;
        self
    }

    /// A dictionary is essentially a constant slice of bytes shared by the compressing and decompressing party.
    /// Using a dictionary can improve compression ratios, because the compressor can reference data from the dictionary.
    ///
    /// The dictionary id is an application-specific identifier which can be used during decompression to determine
    /// which dictionary to use.
    ///
    /// Note that while the size of a dictionary can be arbitrary, dictionaries larger than 64 KiB are not useful as
    /// the LZ4 algorithm does not support backreferences by more than 64 KiB, i.e. any dictionary content before
    /// the trailing 64 KiB is silently ignored.
    ///
    /// By default, no dictionary is used and no id is specified.
    pub fn dictionary(&mut self, id: u32, dict: &'a [u8]) -> &mut Self {
        self.dictionary_id = Some(id);
        self.dictionary = Some(dict);
        self
    }

    /// The LZ4 CLI never writes a dictionary id, even when it compresses with a dictionary.
    /// Use this to override (or drop) the id written to the header, e.g. to produce the same output.
    pub fn dictionary_id_nonsense_override(&mut self, id: Option<u32>) -> &mut Self {
        self.dictionary_id = id;
        self
    }

    fn descriptor(&self) -> FrameDescriptor {
        FrameDescriptor {
            block_mode: self.block_mode,
            block_size: self.block_size,
            block_checksums: self.block_checksums,
            content_checksum: self.content_checksum,
            content_size: self.content_size,
            dictionary_id: self.dictionary_id,
        }
    }

    /// Start compressing into `writer`.
    ///
    /// Nothing is written until the first block is complete (or the writer is flushed or finished).
    #[throws]
    pub fn writer<W: Write>(&self, writer: W) -> LZ4FrameWriter<'a, W> {
        if self.content_size.is_some() && self.blocks_per_frame.is_some() {
            throw!(Error::ConflictingSettings);
        }
        LZ4FrameWriter::new(self, writer)
    }

    /// Compress everything `reader` has to offer into a single frame.
    #[throws]
    pub fn compress<R: Read, W: Write>(&self, reader: R, writer: W) {
        self.compress_internal(reader, writer, self.content_size)?;
    }

    /// Like [`compress`](Self::compress), but declare `content_size` in the header.
    /// Fails with [`CompressionError::SizeMismatch`] if the reader doesn't deliver exactly that much.
    #[throws]
    pub fn compress_with_size_unchecked<R: Read, W: Write>(&self, reader: R, writer: W, content_size: u64) {
        self.compress_internal(reader, writer, Some(content_size))?;
    }

    /// Like [`compress`](Self::compress), but determine the content size by seeking.
    #[throws]
    pub fn compress_with_size<R: Read + Seek, W: Write>(&self, mut reader: R, writer: W) {
        // we ignore all bytes before the cursor, which stream_len() would not
        let start = reader.seek(SeekFrom::Current(0)).map_err(Error::ReadError)?;
        let end = reader.seek(SeekFrom::End(0)).map_err(Error::ReadError)?;
        reader.seek(SeekFrom::Start(start)).map_err(Error::ReadError)?;

        let length = end - start;
        self.compress_internal(reader, writer, Some(length))?;
    }

    #[throws]
    fn compress_internal<R: Read, W: Write>(&self, mut reader: R, writer: W, content_size: Option<u64>) {
        let mut settings = self.clone();
        settings.content_size(content_size);
        let mut frame_writer = settings.writer(writer)?;

        let block_size = self.block_size.get_size();
        let mut chunk = Vec::with_capacity(block_size);
        loop {
            chunk.clear();
            // We basically want read_exact semantics, except at the end.
            // Sadly read_exact specifies the buffer contents to be undefined
            // on error, so we have to use this construction instead.
            reader.by_ref().take(block_size as u64).read_to_end(&mut chunk).map_err(Error::ReadError)?;
            if chunk.is_empty() {
                break;
            }
            frame_writer.write_data(&chunk)?;
        }
        frame_writer.finish()?;
    }
}

/// Compresses everything written to it into LZ4 frames.
///
/// Call [`finish`](Self::finish) when done, otherwise the last frame is left unterminated.
///
/// Errors are final. Once a call has failed, every further call fails with
/// [`CompressionError::AlreadyFailed`], except for rejected user data ids which leave the writer untouched.
pub struct LZ4FrameWriter<'a, W: Write> {
    writer: W,
    descriptor: FrameDescriptor,
    blocks_per_frame: Option<u64>,
    dictionary: &'a [u8],

    template_table: Box<U32Table>,
    table: Box<U32Table>,
    /// The lookback window followed by the data of the block being collected.
    in_buffer: Vec<u8>,
    window_offset: usize,
    out_buffer: Vec<u8>,

    content_hasher: Option<XxHash32>,
    in_frame: bool,
    wrote_any_frame: bool,
    failed: bool,
    frame_content_len: u64,
    blocks_in_frame: u64,

    block_count: u64,
    frame_count: u64,
    total_in: u64,
}

impl<'a, W: Write> LZ4FrameWriter<'a, W> {
    pub(crate) fn new(settings: &CompressionSettings<'a>, writer: W) -> Self {
        let dictionary = settings.dictionary.map(dictionary_window).unwrap_or(&[]);
        let mut template_table = Box::new(U32Table::default());
        prime_table(&mut *template_table, dictionary);

        let block_size = settings.block_size.get_size();
        let mut in_buffer = Vec::with_capacity(WINDOW_SIZE + block_size);
        in_buffer.extend_from_slice(dictionary);

        LZ4FrameWriter {
            writer,
            descriptor: settings.descriptor(),
            blocks_per_frame: settings.blocks_per_frame,
            dictionary,
            table: template_table.clone(),
            template_table,
            window_offset: in_buffer.len(),
            in_buffer,
            out_buffer: vec![0u8; block_size],
            content_hasher: None,
            in_frame: false,
            wrote_any_frame: false,
            failed: false,
            frame_content_len: 0,
            blocks_in_frame: 0,
            block_count: 0,
            frame_count: 0,
            total_in: 0,
        }
    }

    /// The header written at the start of every data frame.
    pub fn descriptor(&self) -> &FrameDescriptor { &self.descriptor }
    /// Number of data blocks written so far, across all frames.
    pub fn block_count(&self) -> u64 { self.block_count }
    /// Number of frames started so far, including empty and user data frames.
    pub fn frame_count(&self) -> u64 { self.frame_count }
    /// Number of uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 { self.total_in }

    pub fn get_ref(&self) -> &W { &self.writer }
    pub fn get_mut(&mut self) -> &mut W { &mut self.writer }

    fn pending_len(&self) -> usize {
        self.in_buffer.len() - self.window_offset
    }

    /// Run `f` unless an earlier call failed, and mark the writer as failed if this one does.
    #[throws]
    fn latch<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> T {
        if self.failed {
            throw!(Error::AlreadyFailed);
        }
        match f(self) {
            Ok(v) => v,
            Err(e) => {
                self.failed = true;
                throw!(e);
            }
        }
    }

    /// Accept as much of `data` as fits into the current block and return how much that was.
    ///
    /// A full block is compressed before new data is taken, so nothing is accepted if that fails.
    #[throws]
    fn append(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        let block_size = self.descriptor.block_size.get_size();
        if self.pending_len() == block_size {
            self.flush_block(true)?;
        }
        let amt = cmp::min(block_size - self.pending_len(), data.len());
        self.in_buffer.extend_from_slice(&data[..amt]);
        self.total_in += amt as u64;
        amt
    }

    /// Compress all of `data`.
    #[throws]
    pub fn write_data(&mut self, data: &[u8]) {
        self.latch(|w| {
            let mut data = data;
            while !data.is_empty() {
                let amt = w.append(data)?;
                data = &data[amt..];
            }
            Ok(())
        })?;
    }

    #[throws]
    fn start_frame(&mut self) {
        self.descriptor.write(&mut self.writer)?;
        self.in_frame = true;
        self.wrote_any_frame = true;
        self.frame_count += 1;
        self.blocks_in_frame = 0;
        self.frame_content_len = 0;
        self.content_hasher = if self.descriptor.content_checksum {
            Some(XxHash32::with_seed(0))
        } else {
            None
        };
        debug!(frame = self.frame_count, "started LZ4 frame");
    }

    /// Compress the collected data into a block (or store it, if compression doesn't pay off).
    #[throws]
    fn flush_block(&mut self, allow_split: bool) {
        let read_bytes = self.pending_len();
        if read_bytes == 0 {
            return;
        }
        if !self.in_frame {
            self.start_frame()?;
        }

        let window_offset = self.window_offset;
        // 1. limit output by input size so we never have negative compression ratio
        // 2. use a wrapper that forbids partial writes, so don't write 32-bit integers
        //    as four individual bytes with four individual range checks
        let limit = read_bytes - 1;
        let mut cursor = NoPartialWrites(&mut self.out_buffer[..limit]);
        let (write, is_compressed) = match compress2(&self.in_buffer, window_offset, &mut *self.table, &mut cursor) {
            Ok(()) => {
                let written_len = limit - cursor.0.len();
                (&self.out_buffer[..written_len], true)
            }
            Err(e) => {
                debug_assert_eq!(e.kind(), ErrorKind::ConnectionAborted);
                // incompressible
                (&self.in_buffer[window_offset..], false)
            }
        };

        let length_field = if is_compressed {
            write.len() as u32
        } else {
            write.len() as u32 | INCOMPRESSIBLE
        };
        self.writer.write_u32::<LE>(length_field)?;
        self.writer.write_all(write)?;
        if self.descriptor.block_checksums {
            let mut block_hasher = XxHash32::with_seed(0);
            block_hasher.write(write);
            self.writer.write_u32::<LE>(block_hasher.finish() as u32)?;
        }
        trace!(uncompressed = read_bytes, stored = write.len(), is_compressed, "wrote block");

        if let Some(x) = self.content_hasher.as_mut() {
            x.write(&self.in_buffer[window_offset..]);
        }
        self.frame_content_len += read_bytes as u64;

        match self.descriptor.block_mode {
            BlockMode::Independent => self.reset_window(),
            BlockMode::Linked => {
                if self.in_buffer.len() > WINDOW_SIZE {
                    let how_much_to_forget = self.in_buffer.len() - WINDOW_SIZE;
                    self.table.offset(how_much_to_forget);
                    self.in_buffer.drain(..how_much_to_forget);
                }
                self.window_offset = self.in_buffer.len();
            }
        }

        self.blocks_in_frame += 1;
        self.block_count += 1;

        if let Some(limit) = self.blocks_per_frame {
            if allow_split && self.blocks_in_frame >= limit {
                self.finish_frame()?;
            }
        }
    }

    fn reset_window(&mut self) {
        self.in_buffer.clear();
        self.in_buffer.extend_from_slice(self.dictionary);
        self.window_offset = self.in_buffer.len();
        self.table.clone_from(&self.template_table);
    }

    /// Compress whatever is pending and terminate the current frame with the end mark
    /// (and content checksum, if enabled).
    ///
    /// Writing more data afterwards starts a new frame. Does nothing if no frame is in progress.
    #[throws]
    pub fn end_frame(&mut self) {
        self.latch(Self::finish_frame)?;
    }

    #[throws]
    fn finish_frame(&mut self) {
        self.flush_block(false)?;
        if !self.in_frame {
            return;
        }

        self.writer.write_u32::<LE>(0)?;
        if let Some(x) = self.content_hasher.take() {
            self.writer.write_u32::<LE>(x.finish() as u32)?;
        }
        self.in_frame = false;
        self.reset_window();
        debug!(frame = self.frame_count, blocks = self.blocks_in_frame, bytes = self.frame_content_len, "ended LZ4 frame");

        if let Some(declared) = self.descriptor.content_size {
            if declared != self.frame_content_len {
                throw!(Error::SizeMismatch { declared, actual: self.frame_content_len });
            }
        }
    }

    /// A frame without blocks, so that the stream starts with a regular LZ4 frame.
    #[throws]
    fn write_empty_frame(&mut self) {
        let descriptor = FrameDescriptor {
            block_checksums: false,
            content_checksum: false,
            content_size: None,
            dictionary_id: None,
            ..self.descriptor.clone()
        };
        descriptor.write(&mut self.writer)?;
        self.writer.write_u32::<LE>(0)?;
        self.wrote_any_frame = true;
        self.frame_count += 1;
    }

    /// Write a skippable frame carrying `data` tagged with `id` (`0..=15`).
    ///
    /// The current frame is ended first. Decompressors hand the frame to their user data handler
    /// instead of treating it as content.
    #[throws]
    pub fn write_user_data_frame(&mut self, id: u8, data: &[u8]) {
        if id > 0xF {
            throw!(Error::InvalidUserDataId(id));
        }

        self.latch(|w| {
            if w.in_frame || w.pending_len() > 0 {
                w.finish_frame()?;
            } else if !w.wrote_any_frame {
                w.write_empty_frame()?;
            }

            w.writer.write_u32::<LE>(SKIPPABLE_MAGIC | id as u32)?;
            w.writer.write_u32::<LE>(data.len() as u32)?;
            w.writer.write_all(data)?;
            w.frame_count += 1;
            debug!(id, len = data.len(), "wrote user data frame");
            Ok(())
        })?;
    }

    /// End the current frame and flush the underlying writer.
    ///
    /// If nothing was written at all, this writes a complete frame without any blocks.
    /// Calling it again does nothing.
    #[throws]
    pub fn try_finish(&mut self) {
        self.latch(|w| {
            if !w.wrote_any_frame && !w.in_frame {
                w.start_frame()?;
            }
            w.finish_frame()?;
            w.writer.flush()?;
            Ok(())
        })?;
    }

    /// Terminate the stream and return the underlying writer.
    #[throws]
    pub fn finish(mut self) -> W {
        self.try_finish()?;
        self.writer
    }
}

impl<'a, W: Write> Write for LZ4FrameWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.latch(|w| w.append(buf))?)
    }

    /// Compresses the pending data into a (short) block and flushes the underlying writer.
    fn flush(&mut self) -> io::Result<()> {
        Ok(self.latch(|w| {
            w.flush_block(true)?;
            w.writer.flush()?;
            Ok(())
        })?)
    }
}

/// Helper struct to allow more efficient code generation when using the Write trait on byte buffers.
///
/// The underlying problem is that the Write impl on [u8] (and everything similar, e.g. Cursor<[u8]>)
/// is specified to write as many bytes as possible before returning an error.
/// This is a problem because it forces e.g. a 32-bit write to compile to four 8-bit writes with a range
/// check every time, rather than a single 32-bit write with a range check.
///
/// This wrapper aims to resolve the problem by simply not writing anything in case we fail the bounds check,
/// as we throw away the entire buffer in that case anyway.
struct NoPartialWrites<'a>(&'a mut [u8]);
impl<'a> Write for NoPartialWrites<'a> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.0.len() < data.len() {
            // quite frankly it doesn't matter what we specify here
            return Err(ErrorKind::ConnectionAborted.into());
        }

        let amt = data.len();
        let (a, b) = mem::replace(&mut self.0, &mut []).split_at_mut(data.len());
        a.copy_from_slice(data);
        self.0 = b;
        Ok(amt)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_header_and_end_mark() {
        let out = CompressionSettings::default().writer(Vec::new()).unwrap().finish().unwrap();
        // magic, flags, bd, header checksum, end mark, checksum of nothing
        assert_eq!(out.len(), 4 + 3 + 4 + 4);
        assert_eq!(&out[7..11], &[0, 0, 0, 0]);
        assert_eq!(&out[11..], &0x02CC5D05u32.to_le_bytes());
    }

    #[test]
    fn incompressible_block_is_stored() {
        let mut settings = CompressionSettings::default();
        settings.content_checksum(false);
        let mut writer = settings.writer(Vec::new()).unwrap();
        writer.write_all(b"abc").unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(&out[7..11], &(3 | INCOMPRESSIBLE).to_le_bytes());
        assert_eq!(&out[11..14], b"abc");
        assert_eq!(&out[14..], &[0, 0, 0, 0]);
    }

    #[test]
    fn full_blocks_are_flushed_by_the_next_write() {
        let mut writer = CompressionSettings::default().writer(Vec::new()).unwrap();
        writer.write_all(&vec![1u8; 64 * 1024 + 10]).unwrap();
        assert_eq!(writer.block_count(), 1);
        assert_eq!(writer.frame_count(), 1);
        writer.flush().unwrap();
        assert_eq!(writer.block_count(), 2);
    }

    #[test]
    fn declared_size_is_checked() {
        let mut settings = CompressionSettings::default();
        settings.content_size(Some(5));
        let mut writer = settings.writer(Vec::new()).unwrap();
        writer.write_all(b"abcd").unwrap();
        match writer.finish() {
            Err(CompressionError::SizeMismatch { declared: 5, actual: 4 }) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn conflicting_settings() {
        let mut settings = CompressionSettings::default();
        settings.content_size(Some(5)).blocks_per_frame(Some(2));
        assert!(matches!(settings.writer(Vec::new()), Err(CompressionError::ConflictingSettings)));
    }

    #[test]
    fn user_data_frame_layout() {
        let mut writer = CompressionSettings::default().writer(Vec::new()).unwrap();
        assert!(matches!(writer.write_user_data_frame(16, b""), Err(CompressionError::InvalidUserDataId(16))));
        writer.write_user_data_frame(3, b"hi").unwrap();
        assert_eq!(writer.frame_count(), 2);
        let out = writer.finish().unwrap();
        // an empty frame, the skippable frame, and nothing else since no data was written
        assert_eq!(out.len(), 7 + 4 + 4 + 4 + 2);
        assert_eq!(&out[11..15], &0x184D2A53u32.to_le_bytes());
        assert_eq!(&out[15..19], &2u32.to_le_bytes());
        assert_eq!(&out[19..], b"hi");
    }

    struct BrokenPipe;
    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn errors_are_final() {
        let mut writer = CompressionSettings::default().writer(BrokenPipe).unwrap();
        assert_eq!(writer.write(&vec![3u8; 64 * 1024]).unwrap(), 64 * 1024);

        // the full block has to go out before anything else is accepted
        let err = writer.write(b"more").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert_eq!(writer.total_in(), 64 * 1024);
        assert_eq!(writer.block_count(), 0);

        assert!(matches!(writer.write_data(b"x"), Err(CompressionError::AlreadyFailed)));
        assert!(matches!(writer.end_frame(), Err(CompressionError::AlreadyFailed)));
        assert!(matches!(writer.try_finish(), Err(CompressionError::AlreadyFailed)));
        assert_eq!(writer.flush().unwrap_err().kind(), ErrorKind::Other);
        assert_eq!(writer.total_in(), 64 * 1024);
    }

    #[test]
    fn blocks_per_frame_splits_frames() {
        let mut settings = CompressionSettings::default();
        settings.blocks_per_frame(Some(2));
        let mut writer = settings.writer(Vec::new()).unwrap();
        writer.write_all(&vec![7u8; 5 * 64 * 1024]).unwrap();
        writer.try_finish().unwrap();
        assert_eq!(writer.block_count(), 5);
        assert_eq!(writer.frame_count(), 3);
    }
}

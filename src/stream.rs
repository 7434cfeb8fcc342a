//! `std::io` adapters around the frame codec.
//!
//! [`CompressStream`] compresses everything written to it, [`DecompressStream`] decompresses
//! everything read from it and [`CompressReader`] compresses everything read from it.
//! Frame errors surface as [`io::Error`]s; the underlying error can be recovered with
//! `io::Error::get_ref()` and `downcast_ref`.

use std::cmp;
use std::io::{self, Read, BufRead, Write, Seek, SeekFrom, ErrorKind};
use fehler::{throw, throws};
use tracing::warn;

use crate::framed::{CompressionSettings, CompressionError, LZ4FrameWriter, LZ4FrameReader, UserDataFrame};

fn seek_unsupported() -> io::Error {
    io::Error::new(ErrorKind::Unsupported, "LZ4 streams can only report their position")
}

fn already_finished() -> io::Error {
    io::Error::new(ErrorKind::Other, "the LZ4 stream has already been finished")
}

/// Compresses everything written to it into LZ4 frames.
///
/// The stream is finalized when it is closed, finished or dropped. Only [`close`](Self::close) and
/// [`finish`](Self::finish) report errors that happen while doing so.
pub struct CompressStream<'a, W: Write> {
    inner: Option<LZ4FrameWriter<'a, W>>,
}

impl<'a, W: Write> CompressStream<'a, W> {
    /// Compress with the default settings: linked 64 KiB blocks and a content checksum.
    pub fn new(writer: W) -> Self {
        CompressStream { inner: Some(LZ4FrameWriter::new(&CompressionSettings::default(), writer)) }
    }

    #[throws(CompressionError)]
    pub fn with_settings(writer: W, settings: &CompressionSettings<'a>) -> Self {
        CompressStream { inner: Some(settings.writer(writer)?) }
    }

    #[throws(io::Error)]
    fn frame_writer(&mut self) -> &mut LZ4FrameWriter<'a, W> {
        match self.inner.as_mut() {
            Some(w) => w,
            None => throw!(already_finished()),
        }
    }

    /// End the current frame. Data written afterwards goes to a new frame.
    #[throws(io::Error)]
    pub fn write_end_frame(&mut self) {
        self.frame_writer()?.end_frame()?;
    }

    /// Embed `data` as a skippable frame with the given id (`0..=15`).
    #[throws(io::Error)]
    pub fn write_user_data_frame(&mut self, id: u8, data: &[u8]) {
        self.frame_writer()?.write_user_data_frame(id, data)?;
    }

    pub fn block_count(&self) -> u64 { self.inner.as_ref().map_or(0, |w| w.block_count()) }
    pub fn frame_count(&self) -> u64 { self.inner.as_ref().map_or(0, |w| w.frame_count()) }

    pub fn get_ref(&self) -> Option<&W> { self.inner.as_ref().map(|w| w.get_ref()) }

    /// Finalize the stream and drop the writer.
    #[throws(io::Error)]
    pub fn close(mut self) {
        self.finish_inner()?;
    }

    /// Finalize the stream and hand the writer back.
    #[throws(io::Error)]
    pub fn finish(mut self) -> W {
        self.finish_inner()?
    }

    #[throws(io::Error)]
    fn finish_inner(&mut self) -> W {
        match self.inner.take() {
            Some(w) => w.finish()?,
            None => throw!(already_finished()),
        }
    }
}

impl<'a, W: Write> Write for CompressStream<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.frame_writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frame_writer()?.flush()
    }
}

impl<'a, W: Write> Seek for CompressStream<'a, W> {
    /// Only `SeekFrom::Current(0)` is supported. It returns the number of bytes written so far.
    #[throws(io::Error)]
    fn seek(&mut self, pos: SeekFrom) -> u64 {
        match pos {
            SeekFrom::Current(0) => self.frame_writer()?.total_in(),
            _ => throw!(seek_unsupported()),
        }
    }
}

impl<'a, W: Write> Drop for CompressStream<'a, W> {
    fn drop(&mut self) {
        if let Some(mut w) = self.inner.take() {
            if let Err(e) = w.try_finish() {
                warn!(error = %e, "failed to finish LZ4 stream on drop");
            }
        }
    }
}

/// Decompresses a stream of LZ4 frames.
///
/// Every read returns at most the rest of the current block, so data becomes available as soon as
/// its block has arrived. Once an error has been returned, every further read fails.
pub struct DecompressStream<'a, R: Read> {
    frame_reader: LZ4FrameReader<'a, R>,
    buffer: Vec<u8>,
    bytes_taken: usize,
    position: u64,
}

impl<'a, R: Read> DecompressStream<'a, R> {
    pub fn new(reader: R) -> Self {
        LZ4FrameReader::new(reader).into()
    }

    /// Decode frames with `dict` as their initial window.
    pub fn with_dictionary(reader: R, dict: &'a [u8]) -> Self {
        LZ4FrameReader::new(reader).with_dictionary(dict).into()
    }

    /// Called for every skippable frame as the stream passes it.
    pub fn on_user_data_frame<F: FnMut(UserDataFrame) + Send + 'a>(&mut self, handler: F) {
        self.frame_reader.on_user_data_frame(handler);
    }

    pub fn block_count(&self) -> u64 { self.frame_reader.block_count() }
    pub fn frame_count(&self) -> u64 { self.frame_reader.frame_count() }

    pub fn get_ref(&self) -> &R { self.frame_reader.get_ref() }
    pub fn into_inner(self) -> R { self.frame_reader.into_inner() }

    /// Drop the stream and the reader. Unread data is discarded.
    pub fn close(self) {}
}

impl<'a, R: Read> From<LZ4FrameReader<'a, R>> for DecompressStream<'a, R> {
    fn from(frame_reader: LZ4FrameReader<'a, R>) -> Self {
        DecompressStream {
            frame_reader,
            buffer: Vec::new(),
            bytes_taken: 0,
            position: 0,
        }
    }
}

impl<'a, R: Read> Read for DecompressStream<'a, R> {
    #[throws(io::Error)]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mybuf = self.fill_buf()?;
        let bytes_to_take = cmp::min(mybuf.len(), buf.len());
        buf[..bytes_to_take].copy_from_slice(&mybuf[..bytes_to_take]);
        self.consume(bytes_to_take);
        bytes_to_take
    }
}

impl<'a, R: Read> BufRead for DecompressStream<'a, R> {
    #[throws(io::Error)]
    fn fill_buf(&mut self) -> &[u8] {
        if self.bytes_taken == self.buffer.len() {
            self.buffer.clear();
            self.bytes_taken = 0;
            self.frame_reader.decode_block(&mut self.buffer)?;
        }
        &self.buffer[self.bytes_taken..]
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_taken += amt;
        self.position += amt as u64;
        assert!(self.bytes_taken <= self.buffer.len(), "You consumed more bytes than I even gave you!");
    }
}

impl<'a, R: Read> Seek for DecompressStream<'a, R> {
    /// Only `SeekFrom::Current(0)` is supported. It returns the number of bytes read so far.
    #[throws(io::Error)]
    fn seek(&mut self, pos: SeekFrom) -> u64 {
        match pos {
            SeekFrom::Current(0) => self.position,
            _ => throw!(seek_unsupported()),
        }
    }
}

/// Compresses a reader: reading from it yields the LZ4 frames of everything `source` has to offer.
pub struct CompressReader<'a, R: Read> {
    source: R,
    frame_writer: LZ4FrameWriter<'a, Vec<u8>>,
    chunk: Vec<u8>,
    chunk_size: usize,
    bytes_taken: usize,
    eof: bool,
}

impl<'a, R: Read> CompressReader<'a, R> {
    pub fn new(source: R) -> Self {
        Self::from_frame_writer(source, LZ4FrameWriter::new(&CompressionSettings::default(), Vec::new()))
    }

    #[throws(CompressionError)]
    pub fn with_settings(source: R, settings: &CompressionSettings<'a>) -> Self {
        Self::from_frame_writer(source, settings.writer(Vec::new())?)
    }

    fn from_frame_writer(source: R, frame_writer: LZ4FrameWriter<'a, Vec<u8>>) -> Self {
        let chunk_size = frame_writer.descriptor().block_size.get_size();
        CompressReader {
            source,
            frame_writer,
            chunk: Vec::with_capacity(chunk_size),
            chunk_size,
            bytes_taken: 0,
            eof: false,
        }
    }

    pub fn block_count(&self) -> u64 { self.frame_writer.block_count() }
    pub fn frame_count(&self) -> u64 { self.frame_writer.frame_count() }
    pub fn into_inner(self) -> R { self.source }
}

impl<'a, R: Read> Read for CompressReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let compressed = &self.frame_writer.get_ref()[self.bytes_taken..];
            if !compressed.is_empty() || self.eof {
                let bytes_to_take = cmp::min(compressed.len(), buf.len());
                buf[..bytes_to_take].copy_from_slice(&compressed[..bytes_to_take]);
                self.bytes_taken += bytes_to_take;
                return Ok(bytes_to_take);
            }

            self.frame_writer.get_mut().clear();
            self.bytes_taken = 0;
            self.chunk.clear();
            (&mut self.source).take(self.chunk_size as u64).read_to_end(&mut self.chunk)?;
            if self.chunk.is_empty() {
                self.frame_writer.try_finish()?;
                self.eof = true;
            } else {
                self.frame_writer.write_data(&self.chunk)?;
            }
        }
    }
}

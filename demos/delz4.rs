use lz4_stream::stream::DecompressStream;
use std::fs::File;
use std::io::{self, BufWriter};
use std::env;

fn main() -> io::Result<()> {
    let filename_in = env::args().nth(1).expect("usage: delz4 <input> <output>");
    let filename_out = env::args().nth(2).expect("usage: delz4 <input> <output>");
    let file_in = File::open(filename_in)?;
    let file_out = File::create(filename_out)?;

    let mut lz4_reader = DecompressStream::new(file_in);
    lz4_reader.on_user_data_frame(|frame| eprintln!("user data frame {}: {} bytes", frame.id, frame.data.len()));
    let mut buf_writer = BufWriter::with_capacity(32 * 1024, file_out);
    io::copy(&mut lz4_reader, &mut buf_writer)?;
    eprintln!("{} frames, {} blocks", lz4_reader.frame_count(), lz4_reader.block_count());

    Ok(())
}

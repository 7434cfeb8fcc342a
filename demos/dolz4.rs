use lz4_stream::framed::{BlockSize, CompressionSettings};
use std::fs::File;
use std::{io, env};
use fehler::throws;

#[throws(io::Error)]
fn main() {
    let filename_in = env::args().nth(1).expect("usage: dolz4 <input> <output>");
    let filename_out = env::args().nth(2).expect("usage: dolz4 <input> <output>");
    let file_in = File::open(filename_in)?;
    let file_out = File::create(filename_out)?;

    CompressionSettings::default()
        .block_size(BlockSize::Max4MB)
        .block_checksums(true)
        .compress_with_size(file_in, file_out)?;
}

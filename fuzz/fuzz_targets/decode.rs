#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_stream::stream::DecompressStream;
use std::io::Read;

fuzz_target!(|data: &[u8]| {
    let mut output = Vec::new();
    let mut reader = DecompressStream::new(data);
    reader.on_user_data_frame(|_| {});
    // we deliberately ignore errors here because random bytes from fuzzer
    // are not valid LZ4 data and so are expected to trigger non-fatal errors
    let _ = reader.read_to_end(&mut output);
    let _ = lz4_stream::raw::decompress(data, 1 << 20);
});

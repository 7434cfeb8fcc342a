#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_stream::framed::CompressionSettings;
use lz4_stream::stream::{CompressStream, DecompressStream};
use std::io::{Read, Write};

fuzz_target!(|data: &[u8]| {
    let mut settings = CompressionSettings::default();
    settings
        .block_checksums(true)
        .blocks_per_frame(Some(3));

    // split the input so that user data frames end up between frames
    let (head, tail) = data.split_at(data.len() / 2);
    let mut stream = CompressStream::with_settings(Vec::new(), &settings).expect("Invalid settings");
    stream.write_all(head).expect("Could not compress input data");
    stream.write_user_data_frame(head.len() as u8 & 0xF, tail).expect("Could not write user data");
    stream.write_all(tail).expect("Could not compress input data");
    let output = stream.finish().expect("Could not finish stream");

    let mut seen = Vec::new();
    let mut roundtripped = Vec::new();
    {
        let mut reader = DecompressStream::new(&output[..]);
        reader.on_user_data_frame(|frame| seen.push(frame.data));
        reader.read_to_end(&mut roundtripped).expect("Could not read decompressed data");
    }
    assert!(roundtripped.iter().eq(data));
    assert_eq!(seen, vec![tail.to_vec()]);
});

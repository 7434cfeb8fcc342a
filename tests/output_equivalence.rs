use lz4_stream::framed::{BlockSize, CompressionSettings, LZ4FrameReader};
use lz4_stream::stream::DecompressStream;
use std::io::{Read, Write};
use std::process::Command;
use tempfile::NamedTempFile;

/// Runs the reference `lz4` binary, or returns `None` if it isn't installed.
fn run_cmd(flags: &[&str], input: &[u8]) -> Option<Vec<u8>> {
    let mut file = NamedTempFile::new().expect("Error creating temporary file");
    file.write_all(input).expect("Error writing input");

    let mut cmd = Command::new("lz4");
    cmd.args(flags);
    cmd.arg("-c");
    cmd.arg(file.path());

    let output = cmd.output().ok()?;
    assert!(output.status.success(), "lz4 {:?} failed: {}", flags, String::from_utf8_lossy(&output.stderr));
    Some(output.stdout)
}

fn lz4_available() -> bool {
    let available = Command::new("lz4").arg("--version").output().is_ok();
    if !available {
        println!("lz4 binary not found, skipping");
    }
    available
}

fn sample() -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..20_000u32 {
        data.extend_from_slice(format!("line {} of {}\n", i % 777, i / 3).as_bytes());
    }
    data
}

static DICT_DATA: &'static [u8] = b"line 1 of 2\nline 3 of 4\n";

#[test]
fn run_test() {
    if !lz4_available() {
        return;
    }

    let input = sample();
    let dict_data_file = {
        let mut f = NamedTempFile::new().expect("Error creating temporary file");
        f.write_all(DICT_DATA).expect("Error writing DICT_DATA");
        f
    };
    let dict_data_path = dict_data_file.path().to_str().unwrap();

    let mut failed_runs = Vec::new();
    for bits in 0..(1 << 5) {
        let mut settings = CompressionSettings::default();
        let mut args = Vec::new();

        if bits & 1 != 0 {
            settings.content_checksum(false);
            args.push("--no-frame-crc");
        }

        if bits & 2 != 0 {
            // independent blocks are the CLI's default
            settings.independent_blocks(true);
        } else {
            args.push("-BD");
        }

        if bits & 4 != 0 {
            settings.block_size(BlockSize::Max256KB);
            args.push("-B5");
        } else {
            args.push("-B4");
        }

        if bits & 8 != 0 {
            settings.dictionary(0, DICT_DATA).dictionary_id_nonsense_override(None);
            args.extend(&["-D", dict_data_path]);
        }

        if bits & 16 != 0 {
            settings.block_checksums(true);
            args.push("-BX");
        }

        // ours -> theirs
        let mut output = Vec::new();
        settings.compress(&input[..], &mut output).unwrap();
        let mut decompress_args = vec!["-d"];
        if bits & 8 != 0 {
            decompress_args.extend(&["-D", dict_data_path]);
        }
        if run_cmd(&decompress_args, &output).as_deref() != Some(&input[..]) {
            println!("fail (lz4 -d)={:?}", args);
            failed_runs.push(args.clone());
        }

        // theirs -> ours
        let reference_output = run_cmd(&args, &input).unwrap_or_default();
        let mut reader = LZ4FrameReader::new(&reference_output[..]);
        if bits & 8 != 0 {
            reader = reader.with_dictionary(DICT_DATA);
        }
        let mut decompressed = Vec::new();
        let ok = DecompressStream::from(reader).read_to_end(&mut decompressed).is_ok();
        if !ok || decompressed != input {
            println!("fail (ours)={:?}", args);
            failed_runs.push(args);
        }
    }
    assert!(failed_runs.is_empty(), "{:?}", failed_runs);
}

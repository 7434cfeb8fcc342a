//! The raw LZ4 block format.
//!
//! Using this directly saves you the overhead of framing (~11 bytes) but you lose several features,
//! most notably the fallback mechanism for incompressible data: if the compressed version of a block
//! would be larger, the frame format stores the uncompressed version instead. This guarantees that the
//! compression ratio will never be negative. You also lose checksums and the streaming interface.
//!
//! A block is a sequence of tokens. Each token holds a run of literal bytes followed by a back reference
//! (offset + length) into the previously decoded data, at most 64 KiB back.

mod compress;
mod decompress;

pub use compress::*;
pub use decompress::*;

/// The shortest possible match. Match lengths are encoded relative to this.
const MINMATCH: usize = 4;
/// Offsets are 16 bit.
const MAX_OFFSET: usize = 0xFFFF;
/// The LZ4 raw format maintains a lookback window of exactly 64KiB.
pub const WINDOW_SIZE: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str;

    /// Test that the compressed string decompresses to the original string.
    fn inverse(s: &str) {
        let compressed = compress(s.as_bytes());
        println!("Compressed '{}' into {:?}", s, compressed);
        let decompressed = decompress(&compressed, s.len()).unwrap();
        println!("Decompressed it into {:?}", str::from_utf8(&decompressed).unwrap());
        assert_eq!(decompressed, s.as_bytes());
    }

    #[test]
    fn shakespear() {
        inverse("to live or not to live");
        inverse("Love is a wonderful terrible thing");
        inverse("There is nothing either good or bad, but thinking makes it so.");
        inverse("I burn, I pine, I perish.");
    }

    #[test]
    fn save_the_pandas() {
        inverse("To cute to die! Save the red panda!");
        inverse("You are 60% water. Save 60% of yourself!");
        inverse("The average panda eats as much as 9 to 14 kg of bamboo shoots a day.");
        inverse("bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad bad");
    }

    #[test]
    fn not_compressible() {
        inverse("as6yhol.;jrew5tyuikbfewedfyjltre22459ba");
        inverse("jhflkdjshaf9p8u89ybkvjsdbfkhvg4ut08yfrr");
    }

    #[test]
    fn short() {
        inverse("ahhd");
        inverse("ahd");
        inverse("x-29");
        inverse("x");
        inverse("k");
        inverse(".");
        inverse("ajsdh");
    }

    #[test]
    fn empty_string() {
        inverse("");
    }

    #[test]
    fn nulls() {
        inverse("\0\0\0\0\0\0\0\0\0\0\0\0\0");
    }

    #[test]
    fn compression_works() {
        let s = "The Read trait allows for reading bytes from a source. Implementors of the Read trait are called 'readers'. Readers are defined by one required method, read().";

        inverse(s);

        assert!(compress(s.as_bytes()).len() < s.len());
    }

    #[test]
    fn long_runs_use_extension_bytes() {
        let input = b"abcdefghijklmnopqrstuvwxyz".repeat(1000);
        let compressed = compress(&input);
        assert!(compressed.len() < input.len() / 10);
        assert_eq!(decompress(&compressed, input.len()).unwrap(), input);
    }

    #[test]
    fn large_input_uses_wide_table() {
        let input: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8 ^ (i / 7000) as u8).collect();
        let compressed = compress(&input);
        assert_eq!(decompress(&compressed, input.len()).unwrap(), input);
    }

    #[test]
    fn dictionary_is_used_as_prefix() {
        let dict = b"the quick brown fox jumps over the lazy dog";
        let input = b"the lazy dog jumps over the quick brown fox";
        let with_dict = compress_with_dictionary(dict, input);
        assert!(with_dict.len() < compress(input).len());

        let mut output = Vec::new();
        decompress_block(&with_dict, dict, &mut output, input.len()).unwrap();
        assert_eq!(&output[..], &input[..]);

        assert_eq!(decompress(&with_dict, input.len()), Err(DecodeError::InvalidDeduplicationOffset));
    }

    #[test]
    fn prepend_size_round_trip() {
        let input = b"size prepended size prepended size prepended";
        let compressed = compress_prepend_size(input);
        assert_eq!(&compressed[..4], &(input.len() as u32).to_le_bytes());
        assert_eq!(decompress_size_prepended(&compressed).unwrap(), &input[..]);
    }
}

//! Stream filter decoding shared by the object stores and the image decoder.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

/// Inflate `FlateDecode` data.
///
/// Tries zlib framing first, then raw deflate, which some producers emit.
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let zlib_err = match ZlibDecoder::new(compressed).read_to_end(&mut out) {
        Ok(_) => return Ok(out),
        Err(err) => err,
    };
    out.clear();
    match DeflateDecoder::new(compressed).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(deflate_err) => Err(format!(
            "FlateDecode failed: zlib ({zlib_err}), raw deflate ({deflate_err}), {} input bytes",
            compressed.len()
        )),
    }
}

/// Canonical filter name, expanding the abbreviations used by inline images.
pub fn canonical_filter(name: &str) -> &str {
    match name {
        "Fl" => "FlateDecode",
        "DCT" => "DCTDecode",
        "AHx" => "ASCIIHexDecode",
        "A85" => "ASCII85Decode",
        "LZW" => "LZWDecode",
        "RL" => "RunLengthDecode",
        "CCF" => "CCITTFaxDecode",
        other => other,
    }
}

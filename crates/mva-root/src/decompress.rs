//! ROOT compression block decoding (ZL = zlib, L4 = LZ4, ZS = ZSTD, XZ = LZMA).
//!
//! Compressed payloads are a sequence of framed blocks:
//! ```text
//! bytes 0-1:  algorithm tag ("ZL", "L4", "ZS", "XZ")
//! byte  2:    method byte (ignored)
//! bytes 3-5:  compressed size   (3-byte little-endian)
//! bytes 6-8:  uncompressed size (3-byte little-endian)
//! ```
//! followed immediately by the compressed bytes of that block.

use std::io::Read;

use crate::error::{Result, RootError};

/// Header size of one compression block.
const BLOCK_HEADER: usize = 9;

/// Decompress a ROOT-compressed payload into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len {
        if offset + BLOCK_HEADER > src.len() {
            return Err(RootError::Decompression(format!(
                "truncated block header at offset {offset}"
            )));
        }
        let tag = &src[offset..offset + 2];
        let c_size = read_le24(&src[offset + 3..offset + 6]);
        let u_size = read_le24(&src[offset + 6..offset + 9]);
        offset += BLOCK_HEADER;

        let end = offset + c_size;
        if end > src.len() {
            return Err(RootError::Decompression(format!(
                "block claims {c_size} compressed bytes but only {} remain",
                src.len() - offset
            )));
        }
        let block = &src[offset..end];

        let decoded = match tag {
            b"ZL" => inflate_zlib(block, u_size)?,
            b"ZS" => inflate_zstd(block, u_size)?,
            b"L4" => inflate_lz4(block, u_size)?,
            b"XZ" => inflate_xz(block, u_size)?,
            _ => {
                return Err(RootError::Decompression(format!(
                    "unsupported compression tag {:?}",
                    String::from_utf8_lossy(tag)
                )));
            }
        };
        if decoded.len() != u_size {
            return Err(RootError::Decompression(format!(
                "block decoded to {} bytes, header said {u_size}",
                decoded.len()
            )));
        }
        out.extend_from_slice(&decoded);
        offset = end;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "payload decoded to {} bytes, key said {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

fn inflate_zlib(block: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    flate2::read::ZlibDecoder::new(block)
        .read_to_end(&mut out)
        .map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
    Ok(out)
}

fn inflate_zstd(block: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    let mut dec = ruzstd::decoding::StreamingDecoder::new(block)
        .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    dec.read_to_end(&mut out).map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    Ok(out)
}

fn inflate_lz4(block: &[u8], expected: usize) -> Result<Vec<u8>> {
    // ROOT prepends an 8-byte xxhash64 of the uncompressed data; we do not
    // verify it.
    if block.len() < 8 {
        return Err(RootError::Decompression("LZ4 block shorter than checksum header".into()));
    }
    lz4_flex::decompress(&block[8..], expected)
        .map_err(|e| RootError::Decompression(format!("lz4: {e}")))
}

fn inflate_xz(block: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut input = std::io::BufReader::new(block);
    let mut out = Vec::with_capacity(expected);
    lzma_rs::xz_decompress(&mut input, &mut out)
        .map_err(|e| RootError::Decompression(format!("xz: {e}")))?;
    Ok(out)
}

/// Read a 3-byte little-endian unsigned integer.
fn read_le24(b: &[u8]) -> usize {
    b[0] as usize | (b[1] as usize) << 8 | (b[2] as usize) << 16
}

/// Frame `payload` zlib-compressed as a single ROOT block.
///
/// Used by the synthetic file builder; exposed here so the block layout
/// lives in one module.
pub fn compress_zlib_block(payload: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;

    let mut enc =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(payload).map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
    let body = enc.finish().map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;

    if payload.len() > 0x00FF_FFFF || body.len() > 0x00FF_FFFF {
        return Err(RootError::Decompression("payload too large for one block".into()));
    }
    let mut block = Vec::with_capacity(BLOCK_HEADER + body.len());
    block.extend_from_slice(b"ZL");
    block.push(0x08);
    block.extend_from_slice(&le24(body.len()));
    block.extend_from_slice(&le24(payload.len()));
    block.extend_from_slice(&body);
    Ok(block)
}

fn le24(n: usize) -> [u8; 3] {
    [(n & 0xFF) as u8, ((n >> 8) & 0xFF) as u8, ((n >> 16) & 0xFF) as u8]
}

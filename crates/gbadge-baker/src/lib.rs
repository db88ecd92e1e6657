//! # gbadge-baker — Assertion Baking for PNG Badges
//!
//! "Baking" embeds the Open Badges assertion JSON into the badge's PNG so
//! the image file is a portable, self-describing credential. The assertion
//! goes into an `iTXt` chunk keyed `openbadges`, inserted right after
//! `IHDR`.
//!
//! The baker works at the chunk level and never decodes image data: `IDAT`,
//! dimensions, bit depth, and color type come out byte-identical to the
//! input. Re-baking replaces the existing `openbadges` chunk instead of
//! stacking a second one.

use thiserror::Error;

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// The iTXt keyword carrying the assertion, per the Open Badges baking spec.
pub const BAKED_KEYWORD: &[u8] = b"openbadges";

/// Maximum size of a baked badge: 5 MB.
pub const MAX_BAKED_BYTES: usize = 5 * 1024 * 1024;

/// Errors from baking or extraction.
#[derive(Error, Debug)]
pub enum BakeError {
    /// Input does not start with the PNG signature.
    #[error("not a PNG: missing file signature")]
    InvalidSignature,

    /// A chunk header or payload runs past the end of the buffer.
    #[error("corrupt PNG: truncated chunk at offset {offset}")]
    TruncatedChunk {
        /// Byte offset of the truncated chunk.
        offset: usize,
    },

    /// The PNG has no IHDR chunk to insert after.
    #[error("corrupt PNG: missing IHDR chunk")]
    MissingIhdr,

    /// The baked output would exceed [`MAX_BAKED_BYTES`].
    #[error("baked badge would be {size} bytes, exceeding the 5MB limit")]
    OutputTooLarge {
        /// Size the output would have had.
        size: usize,
    },

    /// Assertion JSON could not be serialized or parsed.
    #[error("assertion JSON error: {0}")]
    Assertion(#[from] serde_json::Error),
}

/// One parsed chunk, borrowing from the input buffer.
struct Chunk<'a> {
    chunk_type: [u8; 4],
    data: &'a [u8],
}

/// Split a PNG (after the signature) into chunks.
fn parse_chunks(body: &[u8], base_offset: usize) -> Result<Vec<Chunk<'_>>, BakeError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        if pos + 8 > body.len() {
            return Err(BakeError::TruncatedChunk {
                offset: base_offset + pos,
            });
        }
        let len = u32::from_be_bytes([body[pos], body[pos + 1], body[pos + 2], body[pos + 3]])
            as usize;
        let chunk_type = [body[pos + 4], body[pos + 5], body[pos + 6], body[pos + 7]];
        let data_start = pos + 8;
        let data_end = data_start + len;
        // Data plus trailing CRC must fit.
        if data_end + 4 > body.len() {
            return Err(BakeError::TruncatedChunk {
                offset: base_offset + pos,
            });
        }
        chunks.push(Chunk {
            chunk_type,
            data: &body[data_start..data_end],
        });
        pos = data_end + 4;
    }
    Ok(chunks)
}

/// Append one chunk (length, type, data, CRC) to the output buffer.
fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Build the iTXt payload: keyword, NUL, compression flag 0, compression
/// method 0, empty language tag, empty translated keyword, then the text.
fn itxt_payload(text: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(BAKED_KEYWORD.len() + 5 + text.len());
    payload.extend_from_slice(BAKED_KEYWORD);
    payload.push(0); // keyword terminator
    payload.push(0); // compression flag: uncompressed
    payload.push(0); // compression method
    payload.push(0); // language tag terminator
    payload.push(0); // translated keyword terminator
    payload.extend_from_slice(text.as_bytes());
    payload
}

/// True if this chunk is an `iTXt` keyed `openbadges`.
fn is_baked_chunk(chunk: &Chunk<'_>) -> bool {
    chunk.chunk_type == *b"iTXt"
        && chunk.data.len() > BAKED_KEYWORD.len()
        && chunk.data.starts_with(BAKED_KEYWORD)
        && chunk.data[BAKED_KEYWORD.len()] == 0
}

/// Bake an assertion into a PNG.
///
/// Inserts (or replaces) the `openbadges` iTXt chunk directly after IHDR.
/// All other chunks pass through untouched, byte for byte.
///
/// # Errors
///
/// Rejects non-PNG input, corrupt chunk structure, and output over the
/// 5 MB cap.
pub fn bake(png: &[u8], assertion: &serde_json::Value) -> Result<Vec<u8>, BakeError> {
    let body = strip_signature(png)?;
    let chunks = parse_chunks(body, PNG_SIGNATURE.len())?;
    if chunks.first().map(|c| c.chunk_type) != Some(*b"IHDR") {
        return Err(BakeError::MissingIhdr);
    }

    let text = serde_json::to_string(assertion)?;
    let payload = itxt_payload(&text);

    let mut out = Vec::with_capacity(png.len() + payload.len() + 12);
    out.extend_from_slice(&PNG_SIGNATURE);
    for (i, chunk) in chunks.iter().enumerate() {
        if is_baked_chunk(chunk) {
            continue; // replaced by the fresh assertion below
        }
        write_chunk(&mut out, &chunk.chunk_type, chunk.data);
        if i == 0 {
            write_chunk(&mut out, b"iTXt", &payload);
        }
    }

    if out.len() > MAX_BAKED_BYTES {
        return Err(BakeError::OutputTooLarge { size: out.len() });
    }
    Ok(out)
}

/// Extract the baked assertion from a PNG, if present.
///
/// Returns `Ok(None)` for a valid PNG that simply has no `openbadges`
/// chunk.
pub fn extract(png: &[u8]) -> Result<Option<serde_json::Value>, BakeError> {
    let body = strip_signature(png)?;
    for chunk in parse_chunks(body, PNG_SIGNATURE.len())? {
        if !is_baked_chunk(&chunk) {
            continue;
        }
        // Skip keyword + NUL + flag + method, then the two empty fields'
        // terminators, to reach the text.
        let after_keyword = &chunk.data[BAKED_KEYWORD.len() + 1..];
        if after_keyword.len() < 4 {
            continue;
        }
        let after_header = &after_keyword[2..];
        let lang_end = match after_header.iter().position(|&b| b == 0) {
            Some(p) => p,
            None => continue,
        };
        let after_lang = &after_header[lang_end + 1..];
        let translated_end = match after_lang.iter().position(|&b| b == 0) {
            Some(p) => p,
            None => continue,
        };
        let text = &after_lang[translated_end + 1..];
        return Ok(Some(serde_json::from_slice(text)?));
    }
    Ok(None)
}

fn strip_signature(png: &[u8]) -> Result<&[u8], BakeError> {
    if png.len() < PNG_SIGNATURE.len() || png[..8] != PNG_SIGNATURE {
        return Err(BakeError::InvalidSignature);
    }
    Ok(&png[8..])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal structurally valid PNG: IHDR for a 2x2 RGBA image,
    /// an IDAT with opaque payload bytes, and IEND. The baker never
    /// inflates IDAT, so the payload does not need to be real zlib data.
    fn synthetic_png(idat_payload: &[u8]) -> Vec<u8> {
        synthetic_png_sized(2, 2, idat_payload)
    }

    fn synthetic_png_sized(width: u32, height: u32, idat_payload: &[u8]) -> Vec<u8> {
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.push(8); // bit depth
        ihdr.push(6); // color type RGBA
        ihdr.push(0); // compression
        ihdr.push(0); // filter
        ihdr.push(0); // interlace

        let mut png = Vec::new();
        png.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut png, b"IHDR", &ihdr);
        write_chunk(&mut png, b"IDAT", idat_payload);
        write_chunk(&mut png, b"IEND", &[]);
        png
    }

    /// A realistic assertion, comfortably bigger than a trivial stub.
    fn sample_assertion() -> serde_json::Value {
        serde_json::json!({
            "@context": "https://w3id.org/openbadges/v2",
            "type": "Assertion",
            "id": "https://badges.example.com/api/badges/5d8e2a6f/assertion",
            "recipient": {
                "type": "email",
                "hashed": true,
                "salt": "0123456789abcdef0123456789abcdef",
                "identity": "sha256$5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
            },
            "badge": {
                "type": "BadgeClass",
                "id": "https://badges.example.com/api/badge-classes/42",
                "name": "Distributed Systems Practitioner",
                "description": "Designed and shipped a fault-tolerant distributed service",
                "image": "https://badges.example.com/img/dist-sys.png",
                "criteria": {"narrative": "Shipped a replicated service with documented failure modes"},
                "issuer": {
                    "type": "Profile",
                    "id": "https://badges.example.com/issuer",
                    "name": "Learning & Development",
                    "url": "https://badges.example.com",
                    "email": "badges@example.com"
                }
            },
            "issuedOn": "2026-01-15T12:00:00Z",
            "verification": {
                "type": "hosted",
                "verificationUrl": "https://badges.example.com/verify/5d8e2a6f"
            }
        })
    }

    #[test]
    fn bake_then_extract_roundtrip() {
        let png = synthetic_png(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let assertion = sample_assertion();

        let baked = bake(&png, &assertion).unwrap();
        let extracted = extract(&baked).unwrap().expect("assertion present");
        assert_eq!(extracted, assertion);
    }

    #[test]
    fn pixel_data_is_untouched() {
        let idat = [9u8, 8, 7, 6, 5, 4, 3, 2, 1];
        let png = synthetic_png(&idat);
        let baked = bake(&png, &sample_assertion()).unwrap();

        // IDAT comes through byte-identical.
        let body = &baked[8..];
        let chunks = parse_chunks(body, 8).unwrap();
        let idat_chunk = chunks
            .iter()
            .find(|c| c.chunk_type == *b"IDAT")
            .expect("IDAT survives baking");
        assert_eq!(idat_chunk.data, idat);

        // IHDR (dimensions, bit depth, color type) is byte-identical too.
        let original_chunks = parse_chunks(&png[8..], 8).unwrap();
        assert_eq!(chunks[0].data, original_chunks[0].data);
    }

    #[test]
    fn larger_canvases_pass_through_unchanged() {
        for (width, height) in [(100u32, 100u32), (1000, 1000)] {
            let idat = vec![0xABu8; 256];
            let png = synthetic_png_sized(width, height, &idat);
            let baked = bake(&png, &sample_assertion()).unwrap();

            let chunks = parse_chunks(&baked[8..], 8).unwrap();
            let ihdr = &chunks[0];
            assert_eq!(ihdr.chunk_type, *b"IHDR");
            assert_eq!(&ihdr.data[0..4], &width.to_be_bytes());
            assert_eq!(&ihdr.data[4..8], &height.to_be_bytes());
            // Bit depth and color type survive too.
            assert_eq!(&ihdr.data[8..10], &[8, 6]);

            let idat_chunk = chunks
                .iter()
                .find(|c| c.chunk_type == *b"IDAT")
                .expect("IDAT survives baking");
            assert_eq!(idat_chunk.data, idat);
            assert_eq!(extract(&baked).unwrap().unwrap(), sample_assertion());
        }
    }

    #[test]
    fn assertion_chunk_sits_after_ihdr() {
        let png = synthetic_png(&[0; 16]);
        let baked = bake(&png, &sample_assertion()).unwrap();
        let chunks = parse_chunks(&baked[8..], 8).unwrap();
        assert_eq!(chunks[0].chunk_type, *b"IHDR");
        assert_eq!(chunks[1].chunk_type, *b"iTXt");
        assert!(chunks[1].data.starts_with(BAKED_KEYWORD));
    }

    #[test]
    fn rebake_replaces_instead_of_stacking() {
        let png = synthetic_png(&[0; 16]);
        let first = serde_json::json!({"type": "Assertion", "id": "first"});
        let second = serde_json::json!({"type": "Assertion", "id": "second"});

        let baked_once = bake(&png, &first).unwrap();
        let baked_twice = bake(&baked_once, &second).unwrap();

        let chunks = parse_chunks(&baked_twice[8..], 8).unwrap();
        let baked_chunks = chunks.iter().filter(|c| is_baked_chunk(c)).count();
        assert_eq!(baked_chunks, 1);
        assert_eq!(extract(&baked_twice).unwrap().unwrap(), second);
    }

    #[test]
    fn unbaked_png_extracts_none() {
        let png = synthetic_png(&[0; 4]);
        assert!(extract(&png).unwrap().is_none());
    }

    #[test]
    fn non_png_rejected() {
        let err = bake(b"GIF89a not a png", &sample_assertion()).unwrap_err();
        assert!(matches!(err, BakeError::InvalidSignature));
        assert!(matches!(extract(b"JFIF").unwrap_err(), BakeError::InvalidSignature));
    }

    #[test]
    fn truncated_chunk_rejected() {
        let mut png = synthetic_png(&[0; 16]);
        png.truncate(png.len() - 3); // cut into IEND's CRC
        assert!(matches!(
            bake(&png, &sample_assertion()).unwrap_err(),
            BakeError::TruncatedChunk { .. }
        ));
    }

    #[test]
    fn missing_ihdr_rejected() {
        let mut png = Vec::new();
        png.extend_from_slice(&PNG_SIGNATURE);
        write_chunk(&mut png, b"IEND", &[]);
        assert!(matches!(
            bake(&png, &sample_assertion()).unwrap_err(),
            BakeError::MissingIhdr
        ));
    }

    #[test]
    fn oversized_output_rejected() {
        // An input close to the cap pushes the baked output over it.
        let big_idat = vec![0u8; MAX_BAKED_BYTES - 100];
        let png = synthetic_png(&big_idat);
        assert!(matches!(
            bake(&png, &sample_assertion()).unwrap_err(),
            BakeError::OutputTooLarge { .. }
        ));
    }

    #[test]
    fn other_text_chunks_pass_through() {
        let mut png = synthetic_png(&[0; 8]);
        // Rebuild with an unrelated tEXt chunk before IEND.
        let body = png.split_off(8);
        let parsed = parse_chunks(&body, 8).unwrap();
        let mut rebuilt = Vec::new();
        rebuilt.extend_from_slice(&PNG_SIGNATURE);
        for chunk in &parsed {
            if chunk.chunk_type == *b"IEND" {
                write_chunk(&mut rebuilt, b"tEXt", b"Comment\0hello");
            }
            write_chunk(&mut rebuilt, &chunk.chunk_type, chunk.data);
        }

        let baked = bake(&rebuilt, &sample_assertion()).unwrap();
        let final_chunks = parse_chunks(&baked[8..], 8).unwrap();
        assert!(final_chunks
            .iter()
            .any(|c| c.chunk_type == *b"tEXt" && c.data == b"Comment\0hello"));
    }
}

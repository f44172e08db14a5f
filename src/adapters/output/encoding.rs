//! Text encodings for output artifacts

use crate::config::OutputEncoding;
use crate::domain::{PulseError, Result};

const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Byte order mark written at the start of an artifact
pub fn byte_order_mark(encoding: OutputEncoding) -> &'static [u8] {
    match encoding {
        OutputEncoding::Utf16 => &UTF16LE_BOM,
        OutputEncoding::Utf8 => &[],
    }
}

/// Encode text without a byte order mark
pub fn encode(text: &str, encoding: OutputEncoding) -> Vec<u8> {
    match encoding {
        OutputEncoding::Utf8 => text.as_bytes().to_vec(),
        OutputEncoding::Utf16 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
    }
}

/// Decode a whole artifact, stripping the byte order mark if present
///
/// # Errors
///
/// Returns [`PulseError::Serialization`] if the bytes are not valid text in
/// `encoding`.
pub fn decode(bytes: &[u8], encoding: OutputEncoding) -> Result<String> {
    match encoding {
        OutputEncoding::Utf8 => {
            let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(body.to_vec())
                .map_err(|e| PulseError::Serialization(format!("invalid UTF-8: {e}")))
        }
        OutputEncoding::Utf16 => {
            let body = bytes.strip_prefix(&UTF16LE_BOM).unwrap_or(bytes);
            if body.len() % 2 != 0 {
                return Err(PulseError::Serialization(
                    "invalid UTF-16: odd number of bytes".to_string(),
                ));
            }
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units)
                .map_err(|e| PulseError::Serialization(format!("invalid UTF-16: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_is_little_endian() {
        assert_eq!(encode("A\t", OutputEncoding::Utf16), vec![0x41, 0x00, 0x09, 0x00]);
        assert_eq!(byte_order_mark(OutputEncoding::Utf16), &[0xFF, 0xFE]);
    }

    #[test]
    fn test_utf8_has_no_bom() {
        assert!(byte_order_mark(OutputEncoding::Utf8).is_empty());
        assert_eq!(encode("é", OutputEncoding::Utf8), "é".as_bytes());
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = byte_order_mark(OutputEncoding::Utf16).to_vec();
        bytes.extend(encode("Ann's Watch ⌚\n", OutputEncoding::Utf16));
        assert_eq!(
            decode(&bytes, OutputEncoding::Utf16).unwrap(),
            "Ann's Watch ⌚\n"
        );
    }

    #[test]
    fn test_decode_rejects_odd_utf16() {
        assert!(decode(&[0xFF, 0xFE, 0x41], OutputEncoding::Utf16).is_err());
        assert!(decode(&[0xC3], OutputEncoding::Utf8).is_err());
    }
}

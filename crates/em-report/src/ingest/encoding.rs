//! Text decoding with legacy fallbacks.

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Serialize};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Bytes with no assigned character in Windows-1252. encoding_rs maps them to C1
/// controls, so their presence is treated as a failed legacy decode.
const UNDEFINED_1252_BYTES: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Encoding a byte source was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with a leading byte order mark, which is stripped.
    Utf8Bom,
    /// Legacy single-byte encoding used by older spreadsheet exports.
    Windows1252,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-sig",
            Self::Windows1252 => "windows-1252",
            Self::Utf8Lossy => "utf-8 (lossy)",
        }
    }
}

/// Decode raw bytes to text. Never fails.
///
/// Tries UTF-8 (optional BOM), then Windows-1252, then lossy UTF-8.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => {
            if let Ok(text) = std::str::from_utf8(rest) {
                return (text.to_owned(), TextEncoding::Utf8Bom);
            }
        }
        None => {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return (text.to_owned(), TextEncoding::Utf8);
            }
        }
    }

    if !bytes.iter().any(|b| UNDEFINED_1252_BYTES.contains(b))
        && let Some(text) = WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
    {
        debug!("Content is not valid UTF-8, decoded as windows-1252");
        return (text.into_owned(), TextEncoding::Windows1252);
    }

    debug!("Falling back to lossy UTF-8 decoding");
    (
        String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf8Lossy,
    )
}

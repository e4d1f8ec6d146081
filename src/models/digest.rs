use crate::error::CheckError;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter};
use sha2::{Digest, Sha256};
use std::io;

/// Hash a manifest the way the registry digests it
///
/// The value is serialized compactly, every whitespace character is removed
/// (including any inside string values), and the remaining UTF-8 bytes are
/// hashed with SHA-256. Key order is significant: this is a textual digest,
/// not a canonical JSON one.
///
/// Integral floats are written without a fraction (`1.0` becomes `1`).
/// Non-integral floats in exponent form may still render differently from
/// a JavaScript `JSON.stringify` (`1e300` vs `1e+300`).
pub fn normalize_hash<T: Serialize + ?Sized>(document: &T) -> Result<String, CheckError> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, ManifestFormatter);
    document
        .serialize(&mut serializer)
        .map_err(|e| CheckError::Malformed(e.to_string()))?;
    let serialized =
        String::from_utf8(buffer).map_err(|e| CheckError::Malformed(e.to_string()))?;

    let stripped: String = serialized.chars().filter(|&c| !is_json_whitespace(c)).collect();

    let mut hasher = Sha256::new();
    hasher.update(stripped.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// The `\s` class of ECMAScript regular expressions
///
/// Unlike `char::is_whitespace` this keeps U+0085 and strips U+FEFF.
const fn is_json_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{b}'
            | '\u{c}'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// Compact output with integral floats rendered as integers
struct ManifestFormatter;

impl Formatter for ManifestFormatter {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if value == 0.0 {
            writer.write_all(b"0")
        } else if value.fract() == 0.0 && value.abs() < 1e21 {
            write!(writer, "{value:.0}")
        } else {
            CompactFormatter.write_f64(writer, value)
        }
    }
}

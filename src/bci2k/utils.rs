//! Low-level text helpers for header parsing

use encoding_rs::WINDOWS_1252;

/// Decode header bytes. BCI2000 writes the header in the system's 8-bit
/// code page, which is Windows-1252 for every file we have seen.
pub fn decode_header_text(bytes: &[u8]) -> String {
    let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
    if had_errors {
        log::warn!("Header contains bytes outside Windows-1252; they were replaced");
    }
    text.into_owned()
}

/// Parse the numeric prefix of a token, dropping a unit suffix.
///
/// `"256Hz"` gives 256.0, `"0.003muV"` gives 0.003, `"Hz"` gives `None`.
pub fn parse_leading_f64(token: &str) -> Option<f64> {
    let token = token.trim();
    let end = token
        .find(|c: char| !matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E'))
        .unwrap_or(token.len());
    // "3e" or "1.5e-" would otherwise fail; back off until the prefix parses.
    (1..=end).rev().find_map(|n| token[..n].parse::<f64>().ok())
}

/// Undo the `%XX` escaping used for parameter values.
///
/// A lone `%` stands for an empty value.
pub fn percent_decode(token: &str) -> String {
    if token == "%" {
        return String::new();
    }
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = token.get(i + 1..i + 3)
            && hex.bytes().all(|b| b.is_ascii_hexdigit())
            && let Ok(b) = u8::from_str_radix(hex, 16)
        {
            out.push(b);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    decode_header_text(&out)
}

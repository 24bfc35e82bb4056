//! Base64 and Quoted-Printable codecs and header encoding.
//!
//! The Base64 codec itself never inserts line breaks; [`wrap_lines`] folds
//! encoded output to the RFC 2045 line limit when it goes into a message body.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for MIME bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Maximum length of one RFC 2047 encoded-word.
pub const MAX_ENCODED_WORD: usize = 75;

/// Encodes data as Base64 using the standard alphabet with `=` padding.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input contains characters outside the standard
/// alphabet or has invalid padding.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Splits `text` into CRLF-separated lines of at most `width` characters.
///
/// No trailing line break is added.
#[must_use]
pub fn wrap_lines(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    let mut wrapped = String::with_capacity(text.len() + (text.len() / width) * 2);
    for (i, ch) in text.chars().enumerate() {
        if i > 0 && i % width == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(ch);
    }
    wrapped
}

/// Encodes data as Base64 folded at [`MAX_LINE_LENGTH`] characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    wrap_lines(&encode_base64(data), MAX_LINE_LENGTH)
}

/// Encodes text as Quoted-Printable (RFC 2045 section 6.7).
///
/// CRLF pairs are kept as hard line breaks. Longer lines are split with soft
/// breaks so no encoded line exceeds [`MAX_LINE_LENGTH`].
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len() + text.len() / 8);
    for (i, line) in text.split("\r\n").enumerate() {
        if i > 0 {
            encoded.push_str("\r\n");
        }
        encode_qp_line(line.as_bytes(), &mut encoded);
    }
    encoded
}

fn encode_qp_line(line: &[u8], out: &mut String) {
    let mut width = 0;
    for (i, &byte) in line.iter().enumerate() {
        let last = i + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            // Trailing whitespace would be stripped in transit
            b' ' | b'\t' => !last,
            _ => false,
        };
        let len = if literal { 1 } else { 3 };

        // A line that continues keeps one column for the `=` soft break
        let limit = if last { MAX_LINE_LENGTH } else { MAX_LINE_LENGTH - 1 };
        if width + len > limit {
            out.push_str("=\r\n");
            width = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        width += len;
    }
}

/// Encodes a header value using RFC 2047 `B` encoding when it is not plain ASCII.
///
/// Format: `=?charset?B?encoded-text?=`. Long values become several
/// encoded-words of at most [`MAX_ENCODED_WORD`] characters, separated by
/// spaces so the header can be folded between them. Words never split a
/// character.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if !needs_rfc2047(text) {
        return text.to_string();
    }

    // `=?` + charset + `?B?` + text + `?=`
    let room = MAX_ENCODED_WORD.saturating_sub(charset.len() + 7);
    let max_bytes = (room / 4 * 3).max(4);

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (index, ch) in text.char_indices() {
        let next = index + ch.len_utf8();
        if next - start > max_bytes && end > start {
            words.push(&text[start..end]);
            start = end;
        }
        end = next;
    }
    words.push(&text[start..end]);

    words
        .iter()
        .map(|word| format!("=?{charset}?B?{}?=", encode_base64(word.as_bytes())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if a header value must be RFC 2047 encoded.
#[must_use]
pub fn needs_rfc2047(text: &str) -> bool {
    text.chars().any(|c| !c.is_ascii() || c.is_ascii_control()) || text.contains("=?")
}

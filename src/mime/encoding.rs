//! Transfer encodings and RFC 2047 encoded words.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::error::{Error, Result};

/// Value of a `Content-Transfer-Encoding` header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, unknown values and an absent header.
    #[default]
    Identity,
}

impl TransferEncoding {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("base64") => Self::Base64,
            Some("quoted-printable") => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }

    pub fn decode(self, body: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(body),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::Identity => Ok(body.to_vec()),
        }
    }

    /// Decode `body`, handing back its original bytes when it is not valid
    /// for this encoding.
    pub fn decode_or_raw(self, body: &[u8]) -> Vec<u8> {
        self.decode(body).unwrap_or_else(|err| {
            tracing::debug!(encoding = ?self, %err, "keeping undecoded body");
            body.to_vec()
        })
    }
}

/// Standard base64; line breaks and other whitespace are skipped.
pub fn decode_base64(text: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    Ok(STANDARD.decode(compact)?)
}

/// Quoted-printable (RFC 2045 section 6.7).
///
/// Soft line breaks may carry trailing whitespace between the `=` and the
/// line break. A lone `=` at the very end of the input is treated as a soft
/// break as well. Anything else after `=` must be two hex digits.
pub fn decode_quoted_printable(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let rest = &bytes[i + 1..];
        let pad = rest
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count();

        match &rest[pad..] {
            [b'\r', b'\n', ..] => i += 1 + pad + 2,
            [b'\n', ..] => i += 1 + pad + 1,
            [] => i = bytes.len(),
            [hi, lo, ..] if pad == 0 => {
                let (Some(hi), Some(lo)) = (hex_value(*hi), hex_value(*lo)) else {
                    return Err(Error::QuotedPrintable(i));
                };
                out.push(hi << 4 | lo);
                i += 3;
            }
            _ => return Err(Error::QuotedPrintable(i)),
        }
    }

    Ok(out)
}

fn hex_value(b: u8) -> Option<u8> {
    char::from(b).to_digit(16).map(|d| d as u8)
}

/// Turn decoded body bytes into text according to the part's `charset`.
pub fn to_text(bytes: Vec<u8>, charset: Option<&str>) -> String {
    match charset.map(str::to_ascii_lowercase).as_deref() {
        Some("iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1") => {
            bytes.into_iter().map(char::from).collect()
        }
        _ => String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

/// Decode every RFC 2047 encoded word in a header value.
///
/// Linear whitespace between two adjacent encoded words is dropped. Text that
/// merely looks like the start of a word (`=?` without the rest of the
/// syntax) is copied through. A word with an unknown encoding or charset, or
/// with a payload that fails to decode, fails the whole value.
pub fn decode_header_value(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        match split_encoded_word(candidate) {
            Some((charset, encoding, text, consumed)) => {
                if !(after_word && before.chars().all(char::is_whitespace)) {
                    out.push_str(before);
                }
                out.push_str(&decode_word(charset, encoding, text)?);
                rest = &candidate[consumed..];
                after_word = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// `=?charset?encoding?text?=` → `(charset, encoding, text, length)`.
fn split_encoded_word(s: &str) -> Option<(&str, &str, &str, usize)> {
    let inner = s.strip_prefix("=?")?;
    let (charset, inner) = inner.split_once('?')?;
    let (encoding, inner) = inner.split_once('?')?;
    let end = inner.find("?=")?;
    let text = &inner[..end];

    if charset.is_empty()
        || charset.contains(char::is_whitespace)
        || encoding.len() != 1
        || text.contains(char::is_whitespace)
    {
        return None;
    }

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    Some((charset, encoding, text, consumed))
}

fn decode_word(charset: &str, encoding: &str, text: &str) -> Result<String> {
    let bytes = match encoding {
        "B" | "b" => decode_base64(text.as_bytes())?,
        "Q" | "q" => decode_quoted_printable(text.replace('_', " ").as_bytes())?,
        other => return Err(Error::EncodedWord(other.to_string())),
    };

    // RFC 2231 allows a language tag: `utf-8*en`
    let charset = charset
        .split_once('*')
        .map_or(charset, |(name, _)| name)
        .to_ascii_lowercase();

    match charset.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => Ok(String::from_utf8(bytes)?),
        "iso-8859-1" | "iso8859-1" | "latin1" => Ok(bytes.into_iter().map(char::from).collect()),
        _ => Err(Error::Charset(charset)),
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures inside the decoder.
///
/// None of these reach the SMTP client; every caller falls back to the
/// undecoded text and keeps going.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("invalid media type: {0:?}")]
    InvalidContentType(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid quoted-printable escape at byte {0}")]
    QuotedPrintable(usize),

    #[error("malformed encoded word: {0:?}")]
    EncodedWord(String),

    #[error("unsupported charset: {0}")]
    Charset(String),

    #[error("invalid UTF-8 in encoded word")]
    Utf8(#[from] std::string::FromUtf8Error),
}

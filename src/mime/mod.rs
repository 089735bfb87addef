//! Best-effort MIME decoding of a message received during DATA.
//!
//! [`decode`] never fails: anything it cannot make sense of degrades to the
//! undecoded text, so a broken message still reaches the sink. Work happens
//! on bytes; text is only produced once a body's charset is known.

pub mod content_type;
pub mod encoding;
pub mod error;
pub mod header;
pub mod multipart;

pub use content_type::ContentType;
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;

/// Fields extracted from a raw message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

/// A single leaf body part after transfer decoding.
#[derive(Debug, Clone)]
pub struct MimePart {
    pub content_type: ContentType,
    pub transfer_encoding: TransferEncoding,
    pub body: Vec<u8>,
}

impl MimePart {
    pub fn new(content_type: ContentType, headers: &Headers, raw_body: &[u8]) -> Self {
        let transfer_encoding =
            TransferEncoding::from_header(headers.get("Content-Transfer-Encoding"));

        Self {
            body: transfer_encoding.decode_or_raw(raw_body),
            content_type,
            transfer_encoding,
        }
    }

    pub fn into_text(self) -> String {
        encoding::to_text(self.body, self.content_type.charset())
    }
}

/// Decode a raw message into subject, plain and HTML bodies.
pub fn decode(raw: &[u8]) -> Decoded {
    let Some((head, body)) = header::split_head(raw) else {
        return Decoded {
            plain: verbatim(raw),
            ..Default::default()
        };
    };

    let headers = match Headers::parse(head) {
        Ok(headers) => headers,
        Err(err) => {
            tracing::debug!(%err, "unparsable header block, keeping raw source as body");
            return Decoded {
                plain: verbatim(raw),
                ..Default::default()
            };
        }
    };

    let mut decoded = Decoded {
        subject: headers.get("Subject").map(decode_subject).unwrap_or_default(),
        ..Default::default()
    };

    let content_type = match headers.get("Content-Type").map(ContentType::parse) {
        None => {
            decoded.plain = verbatim(body);
            return decoded;
        }
        Some(Err(err)) => {
            tracing::debug!(%err, "treating body as plain text");
            decoded.plain = verbatim(body);
            return decoded;
        }
        Some(Ok(content_type)) => content_type,
    };

    if content_type.is_multipart() {
        decoded.walk(body, content_type.boundary());
    } else {
        let part = MimePart::new(content_type, &headers, body);
        if part.content_type.is_html() {
            decoded.html = part.into_text();
        } else {
            decoded.plain = part.into_text();
        }
    }

    decoded
}

/// Body text with no declared charset.
fn verbatim(body: &[u8]) -> String {
    encoding::to_text(body.to_vec(), None)
}

fn decode_subject(value: &str) -> String {
    encoding::decode_header_value(value).unwrap_or_else(|err| {
        tracing::debug!(%err, "keeping raw subject");
        value.to_string()
    })
}

impl Decoded {
    fn walk(&mut self, body: &[u8], boundary: Option<&str>) {
        let Some(boundary) = boundary else {
            tracing::debug!("multipart body without boundary");
            return;
        };

        for raw_part in multipart::split_parts(body, boundary) {
            let (head, content) =
                header::split_head(raw_part).unwrap_or((raw_part, b"".as_slice()));

            let headers = match Headers::parse(head) {
                Ok(headers) => headers,
                Err(err) => {
                    tracing::debug!(%err, "skipping body part");
                    continue;
                }
            };

            let content_type = match headers.get("Content-Type").map(ContentType::parse) {
                None => ContentType::text_plain(),
                Some(Ok(content_type)) => content_type,
                Some(Err(err)) => {
                    tracing::debug!(%err, "skipping body part");
                    continue;
                }
            };

            if content_type.is_multipart() {
                self.walk(content, content_type.boundary());
            } else {
                self.absorb(MimePart::new(content_type, &headers, content));
            }
        }
    }

    /// First plain part wins, last HTML part wins, everything else is dropped.
    fn absorb(&mut self, part: MimePart) {
        if part.content_type.is_plain() {
            if self.plain.is_empty() {
                self.plain = part.into_text();
            }
        } else if part.content_type.is_html() {
            self.html = part.into_text();
        } else {
            tracing::trace!(
                media_type = %part.content_type.media_type,
                encoding = ?part.transfer_encoding,
                "discarding body part"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_body_is_verbatim() {
        let decoded = decode(b"Subject: Hi\r\n\r\nHello\r\n");
        assert_eq!(decoded.subject, "Hi");
        assert_eq!(decoded.plain, "Hello\r\n");
        assert!(decoded.html.is_empty());

        let decoded = decode(b"From: a@x.com\r\n\r\n  keep =41 as is\r\n\r\nsecond\r\n");
        assert_eq!(decoded.plain, "  keep =41 as is\r\n\r\nsecond\r\n");
    }

    #[test]
    fn no_blank_line_is_all_body() {
        let raw = "Subject: lost\r\nno separator\r\n";
        let decoded = decode(raw.as_bytes());
        assert_eq!(decoded.subject, "");
        assert_eq!(decoded.plain, raw);
    }

    #[test]
    fn unparsable_headers_fall_back_to_raw() {
        let raw = "this is not a header\r\nSubject: x\r\n\r\nbody\r\n";
        let decoded = decode(raw.as_bytes());
        assert_eq!(decoded, Decoded {
            plain: raw.to_string(),
            ..Default::default()
        });
    }

    #[test]
    fn encoded_subject() {
        let decoded = decode(b"Subject: =?UTF-8?B?5Lu25ZCN?=\r\n\r\nx");
        assert_eq!(decoded.subject, "件名");

        let decoded = decode(b"Subject: =?utf-8?Q?caf=C3=A9?=\r\n =?utf-8?Q?_au_lait?=\r\n\r\nx");
        assert_eq!(decoded.subject, "café au lait");
    }

    #[test]
    fn undecodable_subject_is_kept_raw() {
        let decoded = decode(b"Subject: =?x-unknown?B?aGk=?=\r\n\r\nx");
        assert_eq!(decoded.subject, "=?x-unknown?B?aGk=?=");
    }

    #[test]
    fn single_part_html() {
        let decoded = decode(b"Content-Type: text/html; charset=utf-8\r\n\r\n<p>Hi</p>");
        assert_eq!(decoded.html, "<p>Hi</p>");
        assert!(decoded.plain.is_empty());
    }

    #[test]
    fn single_part_base64() {
        let raw = concat!(
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "SGVsbG8s\r\n",
            "IFdvcmxkIQ==\r\n",
        );
        assert_eq!(decode(raw.as_bytes()).plain, "Hello, World!");
    }

    #[test]
    fn invalid_base64_keeps_raw_body() {
        let raw = "Content-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\n%%%not base64%%%";
        assert_eq!(decode(raw.as_bytes()).plain, "%%%not base64%%%");
    }

    #[test]
    fn single_part_quoted_printable_latin1() {
        let raw = concat!(
            "Content-Type: text/plain; charset=iso-8859-1\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=E9 cr=\r\n",
            "=E8me",
        );
        assert_eq!(decode(raw.as_bytes()).plain, "café crème");
    }

    #[test]
    fn unknown_transfer_encoding_passes_through() {
        let raw = "Content-Type: text/plain\r\nContent-Transfer-Encoding: x-uuencode\r\n\r\nbegin 644";
        assert_eq!(decode(raw.as_bytes()).plain, "begin 644");
    }

    #[test]
    fn non_text_single_part_goes_to_plain() {
        let raw = "Content-Type: application/json\r\n\r\n{}";
        assert_eq!(decode(raw.as_bytes()).plain, "{}");
    }

    #[test]
    fn invalid_content_type_is_plain_text() {
        let raw = "Content-Type: garbage\r\n\r\n<b>x</b>";
        let decoded = decode(raw.as_bytes());
        assert_eq!(decoded.plain, "<b>x</b>");
        assert!(decoded.html.is_empty());
    }

    fn alternative(first: (&str, &str), second: (&str, &str)) -> String {
        format!(
            "Subject: alt\r\n\
             Content-Type: multipart/alternative; boundary=xyz\r\n\
             \r\n\
             --xyz\r\n\
             Content-Type: {}\r\n\
             \r\n\
             {}\r\n\
             --xyz\r\n\
             Content-Type: {}\r\n\
             \r\n\
             {}\r\n\
             --xyz--\r\n",
            first.0, first.1, second.0, second.1
        )
    }

    #[test]
    fn multipart_alternative_in_either_order() {
        let plain = ("text/plain", "A");
        let html = ("text/html", "<b>B</b>");

        for raw in [alternative(plain, html), alternative(html, plain)] {
            let decoded = decode(raw.as_bytes());
            assert_eq!(decoded.subject, "alt");
            assert_eq!(decoded.plain, "A");
            assert_eq!(decoded.html, "<b>B</b>");
        }
    }

    #[test]
    fn first_plain_and_last_html_win() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"b1\"\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n\r\nfirst\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n\r\nsecond\r\n",
            "--b1\r\n",
            "Content-Type: text/html\r\n\r\n<i>one</i>\r\n",
            "--b1\r\n",
            "Content-Type: text/html\r\n\r\n<i>two</i>\r\n",
            "--b1--\r\n",
        );
        let decoded = decode(raw.as_bytes());
        assert_eq!(decoded.plain, "first");
        assert_eq!(decoded.html, "<i>two</i>");
    }

    #[test]
    fn nested_multipart_and_attachments() {
        let raw = concat!(
            "Subject: nested\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
            "\r\n",
            "This is a multi-part message in MIME format.\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=\"inner\"\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Caf=C3=A9\r\n",
            "--inner\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "PHA+Q2Fmw6k8L3A+\r\n",
            "--inner--\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: application/pdf; name=\"a.pdf\"\r\n",
            "Content-Disposition: attachment; filename=\"a.pdf\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "JVBERi0xLjQK\r\n",
            "--outer--\r\n",
        );
        let decoded = decode(raw.as_bytes());
        assert_eq!(decoded.subject, "nested");
        assert_eq!(decoded.plain, "Café");
        assert_eq!(decoded.html, "<p>Café</p>");
    }

    #[test]
    fn part_without_headers_is_plain_text() {
        let raw = "Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nbare\r\n--b--\r\n";
        assert_eq!(decode(raw.as_bytes()).plain, "bare");
    }

    #[test]
    fn multipart_without_boundary_yields_nothing() {
        let decoded = decode(b"Content-Type: multipart/mixed\r\n\r\n--x\r\n\r\nA\r\n--x--\r\n");
        assert!(decoded.plain.is_empty());
        assert!(decoded.html.is_empty());
    }

    #[test]
    fn broken_part_headers_skip_only_that_part() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "not a header\r\n\r\nlost\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n\r\nkept\r\n",
            "--b--\r\n",
        );
        assert_eq!(decode(raw.as_bytes()).plain, "kept");
    }

    #[test]
    fn eight_bit_latin1_body() {
        let raw = b"Content-Type: text/plain; charset=iso-8859-1\r\n\
                    Content-Transfer-Encoding: 8bit\r\n\
                    \r\n\
                    caf\xe9\r\n";
        assert_eq!(decode(raw).plain, "caf\u{e9}\r\n");
    }

    #[test]
    fn eight_bit_part_uses_its_own_charset() {
        let raw = b"Content-Type: multipart/alternative; boundary=b\r\n\
                    \r\n\
                    --b\r\n\
                    Content-Type: text/plain; charset=latin1\r\n\
                    \r\n\
                    cr\xe8me\r\n\
                    --b\r\n\
                    Content-Type: text/html; charset=utf-8\r\n\
                    \r\n\
                    <b>cr\xc3\xa8me</b>\r\n\
                    --b--\r\n";
        let decoded = decode(raw);
        assert_eq!(decoded.plain, "cr\u{e8}me");
        assert_eq!(decoded.html, "<b>cr\u{e8}me</b>");
    }
}

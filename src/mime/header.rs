use super::error::{Error, Result};

/// Split a message or body part at its first blank line.
///
/// Returns `None` when there is no blank line at all.
pub fn split_head(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut offset = 0;

    for line in raw.split_inclusive(|&b| b == b'\n') {
        if line == b"\r\n" || line == b"\n" {
            return Some((&raw[..offset], &raw[offset + line.len()..]));
        }
        offset += line.len();
    }

    None
}

/// Header fields in the order they appeared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Parse a header block, unfolding continuation lines.
    ///
    /// Header text is expected to be ASCII; other bytes are replaced.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let block = String::from_utf8_lossy(block);
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in block.lines() {
            if line.starts_with(|c: char| c == ' ' || c == '\t') {
                let (_, value) = fields
                    .last_mut()
                    .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
                value.push_str(line);
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;

            if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c.is_control()) {
                return Err(Error::MalformedHeader(line.to_string()));
            }

            fields.push((name.to_string(), value.to_string()));
        }

        Ok(Self { fields })
    }

    /// First value of `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_blank_line() {
        let raw = b"Subject: Hi\r\n\r\nHello\r\n\r\nAgain\r\n";
        assert_eq!(
            split_head(raw),
            Some((&b"Subject: Hi\r\n"[..], &b"Hello\r\n\r\nAgain\r\n"[..]))
        );

        assert_eq!(split_head(b"A: b\n\nbody"), Some((&b"A: b\n"[..], &b"body"[..])));
        assert_eq!(split_head(b"\r\nbody only"), Some((&b""[..], &b"body only"[..])));
        assert_eq!(split_head(b"no blank line\r\nhere\r\n"), None);
        assert_eq!(
            split_head(b"X: \xff\r\n\r\n\xe9"),
            Some((&b"X: \xff\r\n"[..], &b"\xe9"[..]))
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = Headers::parse(b"Subject: Test\r\ncontent-TYPE:  text/plain \r\n").unwrap();
        assert_eq!(headers.get("subject"), Some("Test"));
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("From"), None);
    }

    #[test]
    fn first_value_wins() {
        let headers = Headers::parse(b"Received: a\r\nReceived: b\r\n").unwrap();
        assert_eq!(headers.get("Received"), Some("a"));
    }

    #[test]
    fn folded_lines_are_unfolded() {
        let block = concat!(
            "Subject: a very\r\n",
            "  long subject\r\n",
            "Content-Type: multipart/alternative;\r\n",
            "\tboundary=\"xyz\"\r\n",
        );
        let headers = Headers::parse(block.as_bytes()).unwrap();
        assert_eq!(headers.get("Subject"), Some("a very  long subject"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("multipart/alternative;\tboundary=\"xyz\"")
        );
    }

    #[test]
    fn malformed_blocks() {
        assert!(matches!(
            Headers::parse(b"Subject: ok\r\nthis line has no colon\r\n"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(Headers::parse(b" leading continuation\r\n").is_err());
        assert!(Headers::parse(b": no name\r\n").is_err());
        assert!(Headers::parse(b"Bad Name: value\r\n").is_err());
        assert_eq!(Headers::parse(b"").unwrap(), Headers::default());
    }
}

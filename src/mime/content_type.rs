use super::error::{Error, Result};

/// A parsed `Content-Type` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype`.
    pub media_type: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    /// The type a body part has when it carries no `Content-Type` header.
    pub fn text_plain() -> Self {
        Self {
            media_type: "text/plain".to_string(),
            params: Vec::new(),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (media_type, rest) = value.split_once(';').unwrap_or((value, ""));
        let media_type = media_type.trim().to_ascii_lowercase();

        match media_type.split_once('/') {
            Some((main, sub))
                if !main.is_empty()
                    && !sub.is_empty()
                    && !media_type.contains(char::is_whitespace) => {}
            _ => return Err(Error::InvalidContentType(value.to_string())),
        }

        Ok(Self {
            media_type,
            params: parse_params(rest),
        })
    }

    /// Parameter value by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    pub fn is_html(&self) -> bool {
        self.media_type.starts_with("text/html")
    }

    pub fn is_plain(&self) -> bool {
        self.media_type.starts_with("text/plain")
    }
}

/// `; key=value; key="quoted \"value\""` pairs. Tokens without `=` are skipped.
fn parse_params(mut rest: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_whitespace());
        let Some(pos) = rest.find(|c: char| c == '=' || c == ';') else {
            break;
        };
        if rest[pos..].starts_with(';') {
            rest = &rest[pos + 1..];
            continue;
        }

        let key = rest[..pos].trim().to_ascii_lowercase();
        let after = rest[pos + 1..].trim_start();

        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => {
                let mut value = String::new();
                let mut end = quoted.len();
                let mut chars = quoted.char_indices();
                while let Some((i, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => {
                            end = i + 1;
                            break;
                        }
                        _ => value.push(c),
                    }
                }
                (value, &quoted[end..])
            }
            None => {
                let end = after
                    .find(|c: char| c == ';' || c.is_whitespace())
                    .unwrap_or(after.len());
                (after[..end].to_string(), &after[end..])
            }
        };

        if !key.is_empty() {
            params.push((key, value));
        }
        rest = remaining;
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_and_params() {
        let ct = ContentType::parse("Text/HTML; charset=UTF-8").unwrap();
        assert_eq!(ct.media_type, "text/html");
        assert!(ct.is_html());
        assert!(!ct.is_multipart());
        assert_eq!(ct.charset(), Some("UTF-8"));
    }

    #[test]
    fn quoted_boundary() {
        let ct = ContentType::parse(
            "multipart/alternative; BOUNDARY=\"=_part;0 \\\"x\\\"\"; charset=us-ascii",
        )
        .unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("=_part;0 \"x\""));
        assert_eq!(ct.charset(), Some("us-ascii"));
    }

    #[test]
    fn unquoted_boundary_with_folding_whitespace() {
        let ct = ContentType::parse("multipart/mixed;\tboundary=xyz").unwrap();
        assert_eq!(ct.boundary(), Some("xyz"));
    }

    #[test]
    fn junk_tokens_are_skipped() {
        let ct = ContentType::parse("text/plain; format; delsp=yes").unwrap();
        assert_eq!(ct.param("delsp"), Some("yes"));
        assert_eq!(ct.param("format"), None);
    }

    #[test]
    fn empty_boundary_is_absent() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"\"").unwrap();
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn invalid_media_types() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("text/").is_err());
        assert!(ContentType::parse("text /plain").is_err());
    }
}

enum Delimiter {
    Open,
    Close,
}

fn delimiter(line: &[u8], boundary: &str) -> Option<Delimiter> {
    let rest = line.strip_prefix(b"--")?.strip_prefix(boundary.as_bytes())?;
    // transport padding after the boundary is allowed
    let end = rest
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n' | b' ' | b'\t'))
        .map_or(0, |i| i + 1);

    match &rest[..end] {
        b"" => Some(Delimiter::Open),
        b"--" => Some(Delimiter::Close),
        _ => None,
    }
}

/// Raw body parts (headers included) between `--boundary` lines.
///
/// The preamble before the first delimiter and the epilogue after the close
/// delimiter are dropped. The line break in front of a delimiter belongs to
/// the delimiter. Without a close delimiter the last part runs to the end of
/// `body`.
pub fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|&b| b == b'\n') {
        let line_start = offset;
        offset += line.len();

        let Some(marker) = delimiter(line, boundary) else {
            continue;
        };

        if let Some(begin) = start.take() {
            let part = &body[begin..line_start];
            parts.push(
                part.strip_suffix(b"\r\n")
                    .or_else(|| part.strip_suffix(b"\n"))
                    .unwrap_or(part),
            );
        }

        match marker {
            Delimiter::Open => start = Some(offset),
            Delimiter::Close => return parts,
        }
    }

    if let Some(begin) = start {
        parts.push(&body[begin..]);
    }

    parts
}

//! Header-aware parser for renderer output.
//!
//! Splits the stream at the first blank line into a CGI header block and a
//! body, reads `Content-Type` case-insensitively and returns the body
//! untouched. Unlike the literal parser it never trims image bytes and never
//! leaves a header line in the payload.

use tilegate_core::{ImageSubtype, ParsedTile, RenderError};

use super::error_page;
use super::scan;
use super::ResponseParser;

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredCgiParser;

impl StructuredCgiParser {
    pub fn new() -> Self {
        Self
    }
}

/// Split at the earliest `\r\n\r\n` or `\n\n`.
fn split_head(output: &[u8]) -> Option<(&[u8], &[u8])> {
    let crlf = scan::find(output, b"\r\n\r\n").map(|pos| (pos, 4));
    let lf = scan::find(output, b"\n\n").map(|pos| (pos, 2));
    let (pos, len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b)?,
    };
    Some((&output[..pos], &output[pos + len..]))
}

/// Media type of the `Content-Type` header, lowercased and without parameters.
///
/// Lines that are not `Name: value` pairs are skipped, so stray diagnostics
/// printed ahead of the header block do not hide it.
fn content_type(head: &[u8]) -> Option<String> {
    head.split(|b| *b == b'\n').find_map(|line| {
        let colon = line.iter().position(|b| *b == b':')?;
        let name = scan::trim_whitespace(&line[..colon]);
        if !name.eq_ignore_ascii_case(b"content-type") {
            return None;
        }
        let value = String::from_utf8_lossy(&line[colon + 1..]).into_owned();
        let media = value.split(';').next().unwrap_or_default().trim();
        Some(media.to_ascii_lowercase())
    })
}

fn malformed(reason: impl Into<String>) -> RenderError {
    RenderError::MalformedResponse {
        reason: reason.into(),
    }
}

impl ResponseParser for StructuredCgiParser {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn parse(&self, output: &[u8]) -> Result<ParsedTile, RenderError> {
        let Some((head, body)) = split_head(output) else {
            if error_page::is_error_page(output) {
                return Err(super::rejection(output));
            }
            return Err(malformed("missing CGI header block"));
        };

        match content_type(head) {
            Some(media) if media.starts_with("image/") => {
                if body.is_empty() {
                    return Err(malformed("empty image body"));
                }
                let subtype = ImageSubtype::from_subtype(&media["image/".len()..]);
                Ok(ParsedTile::new(body.to_vec(), subtype))
            }
            _ if error_page::is_error_page(output) => Err(super::rejection(body)),
            Some(media) => Err(malformed(format!("unexpected content type {}", media))),
            None => Err(malformed("missing Content-Type header")),
        }
    }
}

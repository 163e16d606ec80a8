//! Byte-exact parser for renderer output.
//!
//! Reproduces the legacy substring semantics exactly:
//! - the subtype is whichever of `image/jpeg` / `image/png` occurs first
//!   anywhere in the stream, unresolved if neither does;
//! - every occurrence of the literal `Content-Type: image/<subtype>` is cut
//!   out, then surrounding whitespace is trimmed.
//!
//! A header emitted with different casing or spacing is not recognized and
//! stays in the payload. Use the structured parser to avoid that.

use tilegate_core::{ImageSubtype, ParsedTile, RenderError};

use super::error_page;
use super::scan;
use super::ResponseParser;

const JPEG_MIME: &[u8] = b"image/jpeg";
const PNG_MIME: &[u8] = b"image/png";
const HEADER_PREFIX: &str = "Content-Type: image/";

#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralCgiParser;

impl LiteralCgiParser {
    pub fn new() -> Self {
        Self
    }
}

/// Subtype announced by the earliest MIME literal in the stream.
fn resolve_subtype(output: &[u8]) -> ImageSubtype {
    let jpeg = scan::find(output, JPEG_MIME);
    let png = scan::find(output, PNG_MIME);
    match (jpeg, png) {
        (Some(j), Some(p)) if p < j => ImageSubtype::Png,
        (Some(_), _) => ImageSubtype::Jpeg,
        (None, Some(_)) => ImageSubtype::Png,
        (None, None) => ImageSubtype::Unresolved,
    }
}

impl ResponseParser for LiteralCgiParser {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn parse(&self, output: &[u8]) -> Result<ParsedTile, RenderError> {
        if error_page::is_error_page(output) {
            return Err(super::rejection(output));
        }

        let subtype = resolve_subtype(output);
        let header = format!("{}{}", HEADER_PREFIX, subtype.as_str());
        let stripped = scan::remove_all(output, header.as_bytes());
        let bytes = scan::trim_whitespace(&stripped).to_vec();

        Ok(ParsedTile::new(bytes, subtype))
    }
}

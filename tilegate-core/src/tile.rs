//! Rendered tile types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Image subtype resolved from the renderer's CGI header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSubtype {
    Jpeg,
    Png,
    /// Any other `image/<subtype>` the structured parser accepted.
    Other(String),
    /// The renderer did not announce a recognizable image type.
    Unresolved,
}

impl ImageSubtype {
    /// Resolve a bare subtype (`"png"`, `"JPEG"`, ...).
    pub fn from_subtype(subtype: &str) -> Self {
        let subtype = subtype.trim().to_ascii_lowercase();
        match subtype.as_str() {
            "" => ImageSubtype::Unresolved,
            "jpeg" | "jpg" => ImageSubtype::Jpeg,
            "png" => ImageSubtype::Png,
            _ => ImageSubtype::Other(subtype),
        }
    }

    /// The subtype string, empty when unresolved.
    pub fn as_str(&self) -> &str {
        match self {
            ImageSubtype::Jpeg => "jpeg",
            ImageSubtype::Png => "png",
            ImageSubtype::Other(s) => s,
            ImageSubtype::Unresolved => "",
        }
    }

    /// HTTP `Content-Type` for this subtype.
    ///
    /// An unresolved subtype is still served, typed generically.
    pub fn content_type(&self) -> String {
        match self {
            ImageSubtype::Unresolved => "application/octet-stream".to_string(),
            other => format!("image/{}", other.as_str()),
        }
    }

    /// File extension used in `Content-Disposition`.
    pub fn extension(&self) -> &str {
        match self {
            ImageSubtype::Unresolved => "bin",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ImageSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image payload with protocol framing removed, plus its resolved subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTile {
    pub bytes: Vec<u8>,
    pub subtype: ImageSubtype,
}

impl ParsedTile {
    pub fn new(bytes: Vec<u8>, subtype: ImageSubtype) -> Self {
        Self { bytes, subtype }
    }

    /// A tile read back from the cache. Cached tiles are always served as JPEG.
    pub fn from_cache(bytes: Vec<u8>) -> Self {
        Self::new(bytes, ImageSubtype::Jpeg)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

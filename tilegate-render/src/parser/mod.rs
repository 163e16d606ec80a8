//! Renderer output parsing.
//!
//! A [`ResponseParser`] turns the raw byte stream captured from one renderer
//! run into either a [`ParsedTile`] or the renderer's own rejection. The
//! gateway only sees this trait, so the byte-exact legacy parser and the
//! header-aware parser are interchangeable.

pub mod error_page;
pub mod literal;
pub mod scan;
pub mod structured;

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tilegate_core::{ConfigError, ParsedTile, RenderError};

pub use literal::LiteralCgiParser;
pub use structured::StructuredCgiParser;

/// Interprets the combined output of a successful renderer run.
pub trait ResponseParser: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Parse the renderer output.
    ///
    /// Returns [`RenderError::Rejected`] when the output is an error page
    /// with a readable message and [`RenderError::MessageParseFailed`] when
    /// it is an error page without one.
    fn parse(&self, output: &[u8]) -> Result<ParsedTile, RenderError>;
}

/// Map an error page to the rejection the gateway reports.
pub(crate) fn rejection(page: &[u8]) -> RenderError {
    match error_page::extract_message(page) {
        Some(message) => RenderError::Rejected { message },
        None => RenderError::MessageParseFailed,
    }
}

/// Which parser implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Literal,
    Structured,
}

impl ParserKind {
    pub fn build(&self) -> Arc<dyn ResponseParser> {
        match self {
            ParserKind::Literal => Arc::new(LiteralCgiParser::new()),
            ParserKind::Structured => Arc::new(StructuredCgiParser::new()),
        }
    }
}

impl FromStr for ParserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" => Ok(ParserKind::Literal),
            "structured" => Ok(ParserKind::Structured),
            other => Err(ConfigError::InvalidValue {
                field: "parser".to_string(),
                value: other.to_string(),
                reason: "expected literal or structured".to_string(),
            }),
        }
    }
}

//! Tilegate Render - CGI Renderer Protocol
//!
//! Runs the external map renderer as a subprocess and parses its CGI-style
//! output into image bytes plus a resolved image subtype.
//!
//! - [`RenderInvoker`] / [`ProcessInvoker`]: start the renderer with a
//!   `QUERY_STRING=` argument, capture its output, enforce exit status and
//!   timeout.
//! - [`ResponseParser`]: detect error pages, resolve the subtype and strip
//!   protocol framing. [`LiteralCgiParser`] keeps byte-exact legacy
//!   semantics; [`StructuredCgiParser`] splits header and body properly.

pub mod invoker;
pub mod parser;

pub use invoker::{OutputCapture, ProcessInvoker, RenderInvoker};
pub use parser::{
    error_page::ERROR_MARKER, LiteralCgiParser, ParserKind, ResponseParser, StructuredCgiParser,
};

//! Renderer error pages.
//!
//! When the renderer cannot produce a tile it prints an HTML document
//! instead of an image. The page carries a fixed marker string and the
//! human-readable reason is the first text inside `<body>`.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use super::scan;

/// Marker identifying a renderer error page.
pub const ERROR_MARKER: &[u8] = b"MapServer Message";

/// Whether the output is an error page rather than an image.
pub fn is_error_page(output: &[u8]) -> bool {
    scan::contains(output, ERROR_MARKER)
}

/// Tokenizer state while looking for the message.
#[derive(Debug, Default)]
enum BodyText {
    #[default]
    BeforeBody,
    /// Inside the text run that follows the first `<body>` start tag.
    Collecting(String),
    Done(String),
}

/// Token sink that captures the text token right after `<body>`.
#[derive(Debug, Default)]
struct BodyTextSink {
    state: BodyText,
}

impl BodyTextSink {
    fn finish(&mut self) {
        if let BodyText::Collecting(text) = &mut self.state {
            self.state = BodyText::Done(std::mem::take(text));
        }
    }
}

impl TokenSink for BodyTextSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match &mut self.state {
            BodyText::BeforeBody => {
                if let Token::TagToken(tag) = token {
                    if tag.kind == TagKind::StartTag && &*tag.name == "body" {
                        self.state = BodyText::Collecting(String::new());
                    }
                }
            }
            BodyText::Collecting(text) => match token {
                Token::CharacterTokens(chars) => text.push_str(&chars),
                // Recoverable errors are reported inline and do not end the text run.
                Token::ParseError(_) | Token::NullCharacterToken => {}
                _ => self.finish(),
            },
            BodyText::Done(_) => {}
        }
        TokenSinkResult::Continue
    }

    fn end(&mut self) {
        self.finish();
    }
}

/// Extract the text token that immediately follows the `<body>` start tag.
///
/// The page is run through an HTML tokenizer, so quoted attributes,
/// comments, stray `<` characters and character references are handled the
/// way a browser would. Returns `None` when there is no `<body>` start tag,
/// or when the token after it is not text (e.g. another tag) or is blank.
pub fn extract_message(page: &[u8]) -> Option<String> {
    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from_slice(&String::from_utf8_lossy(page)));

    let mut tokenizer = Tokenizer::new(BodyTextSink::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    match &tokenizer.sink.state {
        BodyText::Done(text) | BodyText::Collecting(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        BodyText::BeforeBody => None,
    }
}

use std::collections::VecDeque;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer,
    TokenizerOpts,
};

/// One markup token as seen by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag(String),
    EndTag(String),
    Text(String),
    /// Clean end of the token stream.
    End,
    /// The underlying stream failed; scanning cannot continue.
    Error(String),
}

/// Pull-based markup token source.
pub trait Scanner {
    /// Returns the next token, [`Token::End`] once the stream is exhausted.
    fn next_token(&mut self) -> Token;
}

/// [`Scanner`] over the html5ever tokenizer.
///
/// The whole page is tokenized up front (pages arrive as in-memory strings)
/// and tokens are handed out on demand. Script and noscript bodies are
/// tokenized in raw-text state so their content surfaces as plain text
/// tokens terminated by the matching end tag. Malformed markup never yields
/// [`Token::Error`]: html5ever recovers per the HTML spec, so parse
/// diagnostics are dropped rather than aborting extraction.
pub struct HtmlScanner {
    tokens: VecDeque<Token>,
}

impl HtmlScanner {
    pub fn new(page: &str) -> Self {
        let sink = TokenCollector {
            tokens: VecDeque::new(),
        };
        let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
        let mut input = BufferQueue::new();
        input.push_back(StrTendril::from_slice(page));
        let _ = tokenizer.feed(&mut input);
        tokenizer.end();
        let mut tokens = tokenizer.sink.tokens;
        tokens.push_back(Token::End);
        Self { tokens }
    }
}

impl Scanner for HtmlScanner {
    fn next_token(&mut self) -> Token {
        self.tokens.pop_front().unwrap_or(Token::End)
    }
}

struct TokenCollector {
    tokens: VecDeque<Token>,
}

impl TokenSink for TokenCollector {
    type Handle = ();

    fn process_token(&mut self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            HtmlToken::TagToken(tag) => {
                let name = tag.name.to_string();
                match tag.kind {
                    TagKind::StartTag => {
                        let raw_kind = match name.as_str() {
                            "script" => Some(RawKind::ScriptData),
                            "noscript" => Some(RawKind::Rawtext),
                            _ => None,
                        };
                        let self_closing = tag.self_closing;
                        self.tokens.push_back(Token::StartTag(name));
                        if let (Some(kind), false) = (raw_kind, self_closing) {
                            return TokenSinkResult::RawData(kind);
                        }
                    }
                    TagKind::EndTag => self.tokens.push_back(Token::EndTag(name)),
                }
            }
            HtmlToken::CharacterTokens(text) => self.tokens.push_back(Token::Text(text.to_string())),
            HtmlToken::EOFToken => {}
            HtmlToken::NullCharacterToken
            | HtmlToken::CommentToken(_)
            | HtmlToken::DoctypeToken(_)
            | HtmlToken::ParseError(_) => {}
        }
        TokenSinkResult::Continue
    }
}

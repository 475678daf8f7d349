use std::fmt::Display;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use serde::Serialize;
use thiserror::Error;

/// Text carried by the end-of-input marker.
pub const END_OF_INPUT_TEXT: &str = "0";

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(help("remove the character, or tokenize leniently to drop it"))]
pub struct UnrecognizedCharacter {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

impl UnrecognizedCharacter {
    pub fn line(&self) -> usize {
        self.src.inner()[..self.bad_bit.offset()].matches('\n').count() + 1
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    UnrecognizedCharacter(#[from] UnrecognizedCharacter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'de> {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    #[serde(rename = "value")]
    pub text: &'de str,
    /// Byte offset of the first character in the lexed input.
    #[serde(skip)]
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    #[serde(rename = "EOF")]
    EndOfInput,
    Identifier,
    #[serde(rename = "INT")]
    Integer,
    Assign,
    Plus,
    Minus,
    Comma,
    Semicolon,
    #[serde(rename = "LPAREN")]
    LeftParen,
    #[serde(rename = "RPAREN")]
    RightParen,
    #[serde(rename = "LBRACE")]
    LeftBrace,
    #[serde(rename = "RBRACE")]
    RightBrace,
    Function,
    Let,
    Illegal,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::EndOfInput => "EOF",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Integer => "INT",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Comma => "COMMA",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::LeftParen => "LPAREN",
            TokenKind::RightParen => "RPAREN",
            TokenKind::LeftBrace => "LBRACE",
            TokenKind::RightBrace => "RBRACE",
            TokenKind::Function => "FUNCTION",
            TokenKind::Let => "LET",
            TokenKind::Illegal => "ILLEGAL",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Token<'de> {
    /// The marker closing every token sequence, positioned at `offset`.
    pub fn end_of_input(offset: usize) -> Self {
        Token {
            kind: TokenKind::EndOfInput,
            text: END_OF_INPUT_TEXT,
            offset,
        }
    }

    /// Byte range this token covers in the lexed input.
    ///
    /// The end-of-input marker covers no input, so its span is empty.
    pub fn span(&self) -> std::ops::Range<usize> {
        match self.kind {
            TokenKind::EndOfInput => self.offset..self.offset,
            _ => self.offset..self.offset + self.text.len(),
        }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.text)
    }
}

/// What to do with a character that starts no token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexMode {
    /// Drop the character and keep scanning.
    #[default]
    Lenient,
    /// Report it as [`UnrecognizedCharacter`].
    Strict,
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    mode: LexMode,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            mode: LexMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: LexMode) -> Self {
        self.mode = mode;
        self
    }

    /// Lexes the remaining input and closes the sequence with a single
    /// end-of-input marker. Stops at the first error in strict mode.
    #[tracing::instrument(level = "debug", skip_all, fields(file = self.filename.unwrap_or("<input>")))]
    pub fn tokenize(self) -> Result<Vec<Token<'de>>, Error> {
        let end = self.whole.len();
        let mut tokens = self.collect::<Result<Vec<_>, _>>()?;
        tokens.push(Token::end_of_input(end));
        tracing::debug!(tokens = tokens.len(), "tokenized input");
        Ok(tokens)
    }
}

/// Lexes `input` leniently. Never fails: unrecognized characters are dropped
/// and the result always ends with exactly one end-of-input marker.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens: Vec<_> = Lexer::new(None, input).flatten().collect();
    tokens.push(Token::end_of_input(input.len()));
    tokens
}

fn is_letter(c: char) -> bool {
    c.to_lowercase().ne(c.to_uppercase())
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            let offset = self.byte;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Started {
                Integer,
                Word,
            }

            let process = |kind: TokenKind, text: &'de str| {
                tracing::trace!(%kind, text, offset, "token");
                Some(Ok(Token { kind, text, offset }))
            };

            let started = match c {
                ',' => return process(TokenKind::Comma, literal),
                ';' => return process(TokenKind::Semicolon, literal),
                '{' => return process(TokenKind::LeftBrace, literal),
                '}' => return process(TokenKind::RightBrace, literal),
                '(' => return process(TokenKind::LeftParen, literal),
                ')' => return process(TokenKind::RightParen, literal),
                '=' => return process(TokenKind::Assign, literal),
                '+' => return process(TokenKind::Plus, literal),
                '-' => return process(TokenKind::Minus, literal),
                ' ' | '\t' | '\n' | '\r' => continue,
                c if c.is_ascii_digit() => Started::Integer,
                c if is_letter(c) => Started::Word,
                c => match self.mode {
                    LexMode::Lenient => {
                        tracing::trace!(character = %c, offset, "dropping unrecognized character");
                        continue;
                    }
                    LexMode::Strict => {
                        return Some(Err(LexError::from(UnrecognizedCharacter {
                            src: NamedSource::new(
                                self.filename.unwrap_or("<input>"),
                                self.whole.to_string(),
                            ),
                            bad_bit: SourceSpan::from(offset..self.byte),
                            token: c,
                        })
                        .into()));
                    }
                },
            };

            let end = match started {
                Started::Integer => cur.find(|c: char| !c.is_ascii_digit()),
                Started::Word => cur.find(|c: char| !is_letter(c)),
            }
            .unwrap_or(cur.len());
            let literal = &cur[..end];

            let extra_bytes = literal.len() - c.len_utf8();
            self.byte += extra_bytes;
            self.rest = &self.rest[extra_bytes..];

            let kind = match (started, literal) {
                (Started::Integer, _) => TokenKind::Integer,
                (Started::Word, "fn") => TokenKind::Function,
                (Started::Word, "let") => TokenKind::Let,
                (Started::Word, _) => TokenKind::Identifier,
            };

            return process(kind, literal);
        }
    }
}

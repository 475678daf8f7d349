use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use thiserror::Error;

use crate::lex::{Token, TokenKind};

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected {found}, expected {expected}")]
#[diagnostic(help("an expression is integers joined by `+` or `-`"))]
pub struct UnexpectedToken {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    pub found: String,
    pub expected: &'static str,
}

#[derive(Error, Debug, Diagnostic)]
#[error("A statement cannot start with {found}")]
#[diagnostic(help("only integer expressions are parsed; this token would never be consumed"))]
pub struct NonTerminatingInput {
    #[source_code]
    src: NamedSource<String>,

    #[label("stuck here")]
    bad_bit: SourceSpan,

    pub found: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Expression chains more than {limit} operators")]
#[diagnostic(help("split the expression or raise the nesting limit"))]
pub struct NestingTooDeep {
    #[source_code]
    src: NamedSource<String>,

    #[label("limit reached at this operator")]
    bad_bit: SourceSpan,

    pub limit: usize,
}

macro_rules! line_of {
    ($($error:ty),*) => {
        $(impl $error {
            pub fn line(&self) -> usize {
                self.src.inner()[..self.bad_bit.offset()].matches('\n').count() + 1
            }
        })*
    };
}

line_of!(UnexpectedToken, NonTerminatingInput, NestingTooDeep);

#[derive(Error, Debug, Diagnostic)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    UnexpectedToken(#[from] UnexpectedToken),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NonTerminatingInput(#[from] NonTerminatingInput),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NestingTooDeep(#[from] NestingTooDeep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    #[serde(rename = "PLUS")]
    Plus,
    #[serde(rename = "MINUS")]
    Minus,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Plus => "PLUS",
            BinaryOp::Minus => "MINUS",
        }
    }
}

impl TryFrom<TokenKind> for BinaryOp {
    type Error = TokenKind;

    fn try_from(kind: TokenKind) -> Result<Self, Self::Error> {
        match kind {
            TokenKind::Plus => Ok(BinaryOp::Plus),
            TokenKind::Minus => Ok(BinaryOp::Minus),
            other => Err(other),
        }
    }
}

/// `<expr> ::= <int> | <int> <op> <expr>`
///
/// The grammar is right-recursive, so `a - b - c` is `a - (b - c)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'de> {
    Leaf(Token<'de>),
    Binary {
        op: BinaryOp,
        /// Always a [`Expression::Leaf`].
        left: Box<Expression<'de>>,
        right: Box<Expression<'de>>,
    },
}

/// One entry of [`Expression::children`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Child<'a, 'de> {
    Token(&'a Token<'de>),
    Node(&'a Expression<'de>),
}

impl<'de> Expression<'de> {
    pub fn operator(&self) -> Option<BinaryOp> {
        match self {
            Expression::Leaf(_) => None,
            Expression::Binary { op, .. } => Some(*op),
        }
    }

    /// The single integer token of a leaf, or `[left, right]` of a binary node.
    pub fn children(&self) -> Vec<Child<'_, 'de>> {
        match self {
            Expression::Leaf(token) => vec![Child::Token(token)],
            Expression::Binary { left, right, .. } => vec![Child::Node(left), Child::Node(right)],
        }
    }

    /// Integer tokens in source order.
    pub fn leaves(&self) -> Vec<&Token<'de>> {
        let mut leaves = Vec::new();
        let mut node = self;
        loop {
            match node {
                Expression::Leaf(token) => {
                    leaves.push(token);
                    return leaves;
                }
                Expression::Binary { left, right, .. } => {
                    leaves.extend(left.leaves());
                    node = right.as_ref();
                }
            }
        }
    }

    /// Operators in source order.
    pub fn operators(&self) -> Vec<BinaryOp> {
        let mut operators = Vec::new();
        let mut node = self;
        while let Expression::Binary { op, right, .. } = node {
            operators.push(*op);
            node = right.as_ref();
        }
        operators
    }

    /// Number of nested binary nodes along the right spine.
    pub fn depth(&self) -> usize {
        self.operators().len()
    }
}

impl Serialize for Expression<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("Expression", 3)?;
        node.serialize_field("type", "Expression")?;
        node.serialize_field("op", &self.operator())?;
        node.serialize_field("data", &self.children())?;
        node.end()
    }
}

/// Root of a parse: every expression statement in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program<'de> {
    pub statements: Vec<Expression<'de>>,
}

impl Serialize for Program<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut root = serializer.serialize_struct("Program", 2)?;
        root.serialize_field("type", "ProgramStart")?;
        root.serialize_field("data", &self.statements)?;
        root.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Most operators a single expression may chain before parsing fails.
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions { max_depth: 256 }
    }
}

pub struct Parser<'t, 'de> {
    filename: Option<&'de str>,
    whole: Option<&'de str>,
    tokens: &'t [Token<'de>],
    cursor: usize,
    options: ParserOptions,
}

impl<'t, 'de> Parser<'t, 'de> {
    pub fn new(tokens: &'t [Token<'de>]) -> Self {
        Parser {
            filename: None,
            whole: None,
            tokens,
            cursor: 0,
            options: ParserOptions::default(),
        }
    }

    /// Source the tokens were lexed from, used to label diagnostics.
    pub fn with_source(mut self, filename: Option<&'de str>, whole: &'de str) -> Self {
        self.filename = filename;
        self.whole = Some(whole);
        self
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    #[tracing::instrument(level = "debug", skip_all, fields(tokens = self.tokens.len()))]
    pub fn parse(mut self) -> Result<Program<'de>, Error> {
        let mut program = Program::default();

        while let Some(token) = self.tokens.get(self.cursor) {
            match token.kind {
                TokenKind::Integer => {
                    let statement = self.parse_expression(0)?;
                    program.statements.push(statement);
                }
                TokenKind::EndOfInput => break,
                _ => {
                    let (src, bad_bit) = self.locate(self.cursor);
                    return Err(ParseError::from(NonTerminatingInput {
                        src,
                        bad_bit,
                        found: describe(self.tokens.get(self.cursor)),
                    })
                    .into());
                }
            }
        }

        tracing::debug!(statements = program.statements.len(), "built program");
        Ok(program)
    }

    /// The token after the cursor, unless that is the end of input.
    fn peek(&self) -> Option<Token<'de>> {
        self.tokens
            .get(self.cursor + 1)
            .copied()
            .filter(|token| token.kind != TokenKind::EndOfInput)
    }

    fn parse_expression(&mut self, depth: usize) -> Result<Expression<'de>, Error> {
        let current = match self.tokens.get(self.cursor) {
            Some(token) if token.kind == TokenKind::Integer => *token,
            _ => return Err(self.unexpected(self.cursor, "an integer")),
        };
        tracing::trace!(integer = current.text, cursor = self.cursor, "parse expression");

        let Some(next) = self.peek() else {
            self.cursor += 1;
            return Ok(Expression::Leaf(current));
        };

        let op = match BinaryOp::try_from(next.kind) {
            Ok(op) => op,
            Err(_) => return Err(self.unexpected(self.cursor + 1, "`+`, `-` or end of input")),
        };

        if depth >= self.options.max_depth {
            let (src, bad_bit) = self.locate(self.cursor + 1);
            return Err(ParseError::from(NestingTooDeep {
                src,
                bad_bit,
                limit: self.options.max_depth,
            })
            .into());
        }

        // skip the integer and the operator
        self.cursor += 2;
        let right = self.parse_expression(depth + 1)?;
        // never step over the end marker
        if self
            .tokens
            .get(self.cursor)
            .is_some_and(|token| token.kind != TokenKind::EndOfInput)
        {
            self.cursor += 1;
        }

        Ok(Expression::Binary {
            op,
            left: Box::new(Expression::Leaf(current)),
            right: Box::new(right),
        })
    }

    fn unexpected(&self, index: usize, expected: &'static str) -> Error {
        let (src, bad_bit) = self.locate(index);
        ParseError::from(UnexpectedToken {
            src,
            bad_bit,
            found: describe(self.tokens.get(index)),
            expected,
        })
        .into()
    }

    /// Source code and span for the token at `index`. Without the original
    /// source, the token texts joined by spaces stand in for it.
    fn locate(&self, index: usize) -> (NamedSource<String>, SourceSpan) {
        let name = self.filename.unwrap_or("<input>");

        if let Some(whole) = self.whole {
            let span = match self.tokens.get(index) {
                Some(token) => token.span(),
                None => whole.len()..whole.len(),
            };
            return (NamedSource::new(name, whole.to_string()), SourceSpan::from(span));
        }

        let mut text = String::new();
        let mut span = None;
        for (i, token) in self.tokens.iter().enumerate() {
            if token.kind == TokenKind::EndOfInput {
                if i == index {
                    span = Some(text.len()..text.len());
                }
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            if i == index {
                span = Some(text.len()..text.len() + token.text.len());
            }
            text.push_str(token.text);
        }
        let span = span.unwrap_or(text.len()..text.len());
        (NamedSource::new(name, text), SourceSpan::from(span))
    }
}

fn describe(token: Option<&Token<'_>>) -> String {
    match token {
        None
        | Some(Token {
            kind: TokenKind::EndOfInput,
            ..
        }) => "end of input".to_string(),
        Some(token) => format!("{} `{}`", token.kind, token.text),
    }
}

/// Builds the program for `tokens` without source text for diagnostics.
pub fn build_ast<'de>(tokens: &[Token<'de>]) -> Result<Program<'de>, Error> {
    Parser::new(tokens).parse()
}

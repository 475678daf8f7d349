pub mod display;
pub mod lex;
pub mod parse;

pub use lex::{LexMode, Lexer, Token, TokenKind, tokenize};
pub use parse::{BinaryOp, Expression, Parser, ParserOptions, Program, build_ast};

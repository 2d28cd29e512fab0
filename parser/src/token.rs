//! Provides definitions of the tokens that occur in declarations.
use std::ops::Range;

use logos::Logos;

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"\(\*([^*]|\*+[^*)])*\*+\)")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"\{[^}]*\}")]
pub enum TokenType {
    // Assignment and grouping
    #[token(":=")]
    Assign,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("..")]
    Range,
    #[token(".")]
    Period,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,

    // Markers that occur in addresses and literals
    #[token("%")]
    Percent,
    #[token("#")]
    Hash,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,

    #[regex(r"'([^'$]|\$.)*'")]
    #[regex(r#""([^"$]|\$.)*""#)]
    StringLiteral,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r"[0-9][0-9_]*")]
    Integer,

    /// Any character that is not otherwise recognized. Declarations only
    /// look at the structure, so operators and the like are not
    /// distinguished.
    Other,
}

impl TokenType {
    /// True when the token opens a nested group.
    pub fn is_open(&self) -> bool {
        matches!(self, TokenType::LeftBracket | TokenType::LeftParen)
    }

    /// True when the token closes a nested group.
    pub fn is_close(&self) -> bool {
        matches!(self, TokenType::RightBracket | TokenType::RightParen)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token<'a> {
    pub token_type: TokenType,
    /// Byte range of the token in the text that was tokenized.
    pub span: Range<usize>,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    /// True when the token is the identifier, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Identifier && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Tokenize declaration text.
///
/// Text that the lexer does not recognize becomes an `Other` token so that
/// callers can report the problem in context.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut lexer = TokenType::lexer(source);
    let mut tokens = vec![];
    while let Some(result) = lexer.next() {
        tokens.push(Token {
            token_type: result.unwrap_or(TokenType::Other),
            span: lexer.span(),
            text: lexer.slice(),
        });
    }
    tokens
}

//! Parses variable declarations and type expressions.
//!
//! A declaration is the text of one item in a variable section, for example
//! `a, b AT %IX0.0 : ARRAY[0..2] OF INT := [1, 2, 3];`. The parser returns
//! one [`VarDecl`] for each declared name.
//!
//! The parser only understands the structure of the declaration. Initial
//! values are kept as text and type names are not resolved.
use std::ops::Range;

use dsl::{
    core::SourceSpan,
    diagnostic::{Diagnostic, Label},
    ir::{StringWidth, Subrange, TypeSpec, VarDecl},
};
use log::trace;
use st2plcopen_problems::Problem;

use crate::token::{tokenize, Token, TokenType};

/// Walks over the tokens of some text.
pub struct Cursor<'a> {
    text: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    span: SourceSpan,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over the text. The span is the location of the text
    /// in the source and is used for diagnostics.
    pub fn new(text: &'a str, span: &SourceSpan) -> Self {
        Self {
            text,
            tokens: tokenize(text),
            pos: 0,
            span: span.clone(),
        }
    }

    pub fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    pub fn peek_type(&self) -> Option<TokenType> {
        self.peek().map(|t| t.token_type)
    }

    pub fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the next token if it has the type.
    pub fn eat(&mut self, token_type: TokenType) -> bool {
        if self.peek_type() == Some(token_type) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Offset in the text just after the last consumed token.
    pub fn consumed_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    /// Offset in the text of the next token (or the end of the text).
    pub fn next_start(&self) -> usize {
        self.peek().map(|t| t.span.start).unwrap_or(self.text.len())
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn span(&self) -> &SourceSpan {
        &self.span
    }

    fn expect(
        &mut self,
        token_type: TokenType,
        problem: Problem,
        message: &str,
    ) -> Result<Token<'a>, Diagnostic> {
        match self.peek_type() {
            Some(found) if found == token_type => {
                self.bump().ok_or_else(|| self.error(problem, message))
            }
            _ => Err(self.error(problem, message)),
        }
    }

    fn expect_keyword(
        &mut self,
        keyword: &str,
        problem: Problem,
        message: &str,
    ) -> Result<(), Diagnostic> {
        match self.peek() {
            Some(token) if token.is_keyword(keyword) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(problem, message)),
        }
    }

    /// Creates a diagnostic at the next token, or at the end of the text when
    /// there are no more tokens.
    pub fn error(&self, problem: Problem, message: &str) -> Diagnostic {
        let range = match self.peek() {
            Some(token) => token.span.clone(),
            None => self.text.len()..self.text.len(),
        };
        Diagnostic::problem(
            problem,
            Label::span(&self.span.sub(range.start, range.end), message),
        )
    }
}

/// Splits the text of a variable section into one range for each
/// declaration. Declarations end with `;` outside of brackets. Text after
/// the last `;` is a declaration on its own.
///
/// Empty declarations (only `;`) and comments are not returned.
pub fn split_declarations(text: &str) -> Vec<Range<usize>> {
    let mut ranges = vec![];
    let mut depth: usize = 0;
    let mut current: Option<Range<usize>> = None;

    for token in tokenize(text) {
        match token.token_type {
            TokenType::Semicolon if depth == 0 => {
                if let Some(mut range) = current.take() {
                    range.end = token.span.end;
                    ranges.push(range);
                }
                continue;
            }
            t if t.is_open() => depth += 1,
            t if t.is_close() => depth = depth.saturating_sub(1),
            _ => {}
        }
        match current.as_mut() {
            Some(range) => range.end = token.span.end,
            None => current = Some(token.span.clone()),
        }
    }

    if let Some(range) = current {
        ranges.push(range);
    }
    ranges
}

/// Splits text on commas outside of brackets. Returns the range of each
/// item, including empty items.
pub fn split_top_level_commas(text: &str) -> Vec<Range<usize>> {
    let mut ranges = vec![];
    let mut depth: usize = 0;
    let mut start = 0;
    for token in tokenize(text) {
        match token.token_type {
            TokenType::Comma if depth == 0 => {
                ranges.push(start..token.span.start);
                start = token.span.end;
            }
            t if t.is_open() => depth += 1,
            t if t.is_close() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    ranges.push(start..text.len());
    ranges
}

/// Parses one declaration.
///
/// The span is the location of the text in the source.
pub fn parse_declaration(text: &str, span: &SourceSpan) -> Result<Vec<VarDecl>, Diagnostic> {
    trace!("Declaration {}", text.trim());
    let mut cursor = Cursor::new(text, span);

    if !has_type_separator(&cursor.tokens) {
        return parse_bare(&mut cursor);
    }

    // The names and their optional addresses
    let mut names: Vec<(Token, Option<String>)> = vec![];
    loop {
        let name = cursor.expect(
            TokenType::Identifier,
            Problem::InvalidDeclaration,
            "Expected a variable name",
        )?;
        let address = if cursor.peek().is_some_and(|t| t.is_keyword("AT")) {
            cursor.bump();
            Some(parse_address(&mut cursor)?)
        } else {
            None
        };
        names.push((name, address));

        if cursor.eat(TokenType::Colon) {
            break;
        }
        cursor.expect(
            TokenType::Comma,
            Problem::InvalidDeclaration,
            "Expected ',' or ':' after the variable name",
        )?;
    }

    let spec = parse_type_spec(&mut cursor)?;

    let initial_value = if cursor.eat(TokenType::Assign) {
        Some(parse_value(&mut cursor)?)
    } else {
        None
    };

    cursor.eat(TokenType::Semicolon);
    if !cursor.is_done() {
        return Err(cursor.error(
            Problem::InvalidDeclaration,
            "Unexpected text after the type of the declaration",
        ));
    }

    Ok(names
        .into_iter()
        .map(|(name, address)| {
            let mut var = VarDecl::typed(name.text, spec.clone())
                .with_span(span.sub(name.span.start, name.span.end));
            if let Some(address) = address {
                var = var.with_address(&address);
            }
            if let Some(value) = &initial_value {
                var = var.with_initial_value(value);
            }
            var
        })
        .collect())
}

/// Parses the values of an enumeration, the text between the parentheses
/// in `Color : (RED, GREEN := 2)`.
pub fn parse_enum_values(text: &str, span: &SourceSpan) -> Result<Vec<VarDecl>, Diagnostic> {
    let mut values = vec![];
    for range in split_top_level_commas(text) {
        let item = &text[range.clone()];
        let item_span = span.sub(range.start, range.end);
        let mut decls = parse_declaration(item, &item_span)?;
        if decls.iter().any(|d| !d.is_enum_value()) {
            return Err(Diagnostic::problem(
                Problem::InvalidDeclaration,
                Label::span(&item_span, "Enumeration value cannot have a type"),
            ));
        }
        values.append(&mut decls);
    }
    Ok(values)
}

/// True when there is a `:` at the top level before any `:=`.
fn has_type_separator(tokens: &[Token]) -> bool {
    let mut depth: usize = 0;
    for token in tokens {
        match token.token_type {
            TokenType::Colon if depth == 0 => return true,
            TokenType::Assign | TokenType::Semicolon if depth == 0 => return false,
            t if t.is_open() => depth += 1,
            t if t.is_close() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

/// Parses a name without a type, optionally with an explicit value.
fn parse_bare(cursor: &mut Cursor) -> Result<Vec<VarDecl>, Diagnostic> {
    let name = cursor.expect(
        TokenType::Identifier,
        Problem::InvalidDeclaration,
        "Expected a name",
    )?;
    let mut var = VarDecl::bare(name.text).with_span(cursor.span.sub(name.span.start, name.span.end));

    if cursor.eat(TokenType::Assign) {
        let value = parse_value(cursor)?;
        var = var.with_initial_value(&value);
    }

    cursor.eat(TokenType::Semicolon);
    if !cursor.is_done() {
        return Err(cursor.error(
            Problem::InvalidDeclaration,
            "Expected ':' and a type after the name",
        ));
    }
    Ok(vec![var])
}

/// Parses the text after `AT` up to the `:` or `,`.
fn parse_address(cursor: &mut Cursor) -> Result<String, Diagnostic> {
    let start = cursor.next_start();
    while let Some(token_type) = cursor.peek_type() {
        if token_type == TokenType::Colon || token_type == TokenType::Comma {
            break;
        }
        cursor.bump();
    }
    let address = cursor.text[start..cursor.consumed_end().max(start)].trim();
    if address.is_empty() {
        return Err(cursor.error(Problem::InvalidDeclaration, "Expected an address after AT"));
    }
    Ok(address.to_string())
}

/// Takes the raw text of a value, which is everything up to the terminating
/// `;` outside of brackets.
fn parse_value(cursor: &mut Cursor) -> Result<String, Diagnostic> {
    let start = cursor.consumed_end();
    let mut depth: usize = 0;
    while let Some(token_type) = cursor.peek_type() {
        match token_type {
            TokenType::Semicolon if depth == 0 => break,
            t if t.is_open() => depth += 1,
            t if t.is_close() => depth = depth.saturating_sub(1),
            _ => {}
        }
        cursor.bump();
    }

    let value = cursor.text[start..cursor.consumed_end().max(start)].trim();
    if value.is_empty() {
        return Err(cursor.error(Problem::InvalidDeclaration, "Expected a value after ':='"));
    }
    Ok(value.to_string())
}

/// Parses a type expression at the cursor position.
pub fn parse_type_spec(cursor: &mut Cursor) -> Result<TypeSpec, Diagnostic> {
    let name = match cursor.peek() {
        Some(token) if token.token_type == TokenType::Identifier => token.clone(),
        _ => return Err(cursor.error(Problem::InvalidDeclaration, "Expected a type name")),
    };

    if name.is_keyword("ARRAY") {
        cursor.bump();
        return parse_array(cursor);
    }
    if name.is_keyword("STRING") {
        cursor.bump();
        return parse_string(cursor, StringWidth::String);
    }
    if name.is_keyword("WSTRING") {
        cursor.bump();
        return parse_string(cursor, StringWidth::WString);
    }

    Ok(TypeSpec::Elementary(parse_qualified_name(cursor)?))
}

/// Parses a possibly dotted name such as `Lib.MyType`.
fn parse_qualified_name(cursor: &mut Cursor) -> Result<String, Diagnostic> {
    let first = cursor.expect(
        TokenType::Identifier,
        Problem::InvalidDeclaration,
        "Expected a type name",
    )?;
    let mut end = first.span.end;
    loop {
        let continues = cursor.peek_type() == Some(TokenType::Period)
            && cursor
                .tokens
                .get(cursor.pos + 1)
                .is_some_and(|t| t.token_type == TokenType::Identifier);
        if !continues {
            break;
        }
        cursor.bump();
        if let Some(part) = cursor.bump() {
            end = part.span.end;
        }
    }
    Ok(cursor.text[first.span.start..end].to_string())
}

fn parse_array(cursor: &mut Cursor) -> Result<TypeSpec, Diagnostic> {
    cursor.expect(
        TokenType::LeftBracket,
        Problem::InvalidArrayBounds,
        "Expected '[' after ARRAY",
    )?;

    let mut bounds = vec![];
    loop {
        let lower = parse_bound(cursor)?;
        cursor.expect(
            TokenType::Range,
            Problem::InvalidArrayBounds,
            "Expected '..' between the array bounds",
        )?;
        let upper = parse_bound(cursor)?;
        bounds.push(Subrange::new(lower, upper));

        if !cursor.eat(TokenType::Comma) {
            break;
        }
    }

    cursor.expect(
        TokenType::RightBracket,
        Problem::InvalidArrayBounds,
        "Expected ']' after the array bounds",
    )?;
    cursor.expect_keyword("OF", Problem::InvalidDeclaration, "Expected OF after the array bounds")?;

    if cursor.peek().is_some_and(|t| t.is_keyword("ARRAY")) {
        return Err(cursor.error(
            Problem::InvalidDeclaration,
            "Arrays of arrays are not supported, use a multi-dimensional array",
        ));
    }
    let element_start = cursor.next_start();
    let element = parse_type_spec(cursor)?;
    if let TypeSpec::String {
        length: Some(length),
        ..
    } = &element
    {
        return Err(Diagnostic::problem(
            Problem::InvalidDeclaration,
            Label::span(
                &cursor.span.sub(element_start, cursor.consumed_end()),
                "Arrays of strings with a length are not supported",
            ),
        )
        .with_context("length", length));
    }

    Ok(TypeSpec::array(bounds, &element.label()))
}

fn parse_bound(cursor: &mut Cursor) -> Result<i64, Diagnostic> {
    let negative = if cursor.eat(TokenType::Minus) {
        true
    } else {
        cursor.eat(TokenType::Plus);
        false
    };

    let token = cursor.expect(
        TokenType::Integer,
        Problem::InvalidArrayBounds,
        "Array bound must be an integer",
    )?;
    let value = token
        .text
        .replace('_', "")
        .parse::<i64>()
        .map_err(|_| {
            Diagnostic::problem(
                Problem::InvalidArrayBounds,
                Label::span(
                    &cursor.span.sub(token.span.start, token.span.end),
                    "Array bound is out of range",
                ),
            )
        })?;

    Ok(if negative { -value } else { value })
}

fn parse_string(cursor: &mut Cursor, width: StringWidth) -> Result<TypeSpec, Diagnostic> {
    let close = match cursor.peek_type() {
        Some(TokenType::LeftBracket) => TokenType::RightBracket,
        Some(TokenType::LeftParen) => TokenType::RightParen,
        _ => return Ok(TypeSpec::String { width, length: None }),
    };
    cursor.bump();

    let start = cursor.consumed_end();
    while let Some(token_type) = cursor.peek_type() {
        if token_type == close {
            break;
        }
        cursor.bump();
    }
    let length = cursor.text[start..cursor.next_start()].trim().to_string();
    cursor.expect(close, Problem::InvalidDeclaration, "Expected the end of the string length")?;

    if length.is_empty() {
        return Err(Diagnostic::problem(
            Problem::InvalidDeclaration,
            Label::span(&cursor.span.sub(start, start), "Expected the string length"),
        ));
    }

    Ok(TypeSpec::String {
        width,
        length: Some(length),
    })
}

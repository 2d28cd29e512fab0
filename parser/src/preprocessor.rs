//! Preprocessor for Structured Text. The preprocessor produces a search mask
//! of the input text where the extractor must not look for keywords.
//!
//! The mask blanks:
//! * comments (`(* ... *)` and `// ...`)
//! * pragmas (`{ ... }`)
//! * string literals (`'...'` and `"..."`)
//!
//! Blanked characters are replaced by whitespace so that language elements
//! retain their original position (this means that source locations remain
//! correct in the mask).

use dsl::{
    core::{FileId, SourceSpan},
    diagnostic::{Diagnostic, Label},
};
use st2plcopen_problems::Problem;

use crate::extract::blanked;

#[derive(Clone, Copy, PartialEq)]
enum State {
    Text,
    BlockComment,
    LineComment,
    Pragma,
    Literal { quote: char, escaped: bool },
}

/// Returns the search mask for the source.
pub fn mask(source: &str, file_id: &FileId) -> Result<String, Diagnostic> {
    let (output, state, opened_at) = blank_regions(source, false);

    // By the very end, we should no longer be in a comment or literal. If we
    // are, that's an error
    let expected = match state {
        State::Text | State::LineComment => return Ok(output),
        State::BlockComment => "Expected '*)' - end of comment",
        State::Pragma => "Expected '}' - end of pragma",
        State::Literal { .. } => "Expected end of string literal",
    };
    Err(Diagnostic::problem(
        Problem::UnterminatedBlock,
        Label::span(
            &SourceSpan::range(opened_at, source.len()).with_file_id(file_id),
            expected,
        ),
    ))
}

/// Returns the text with all comments and pragmas blanked. String literals
/// are kept.
pub fn remove_comments(source: &str) -> String {
    blank_regions(source, true).0
}

/// Blanks comments, pragmas and (unless kept) string literals. Returns the
/// output, the state at the end of the text and the start of the last
/// region that was opened.
fn blank_regions(source: &str, keep_literals: bool) -> (String, State, usize) {
    let mut output = String::with_capacity(source.len());
    let mut state = State::Text;
    // Start of the element that is currently being blanked
    let mut opened_at = 0;

    let mut chars = source.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|(_, n)| *n);
        match state {
            State::Text => match (c, next) {
                ('(', Some('*')) => {
                    chars.next();
                    output.push_str("  ");
                    state = State::BlockComment;
                    opened_at = idx;
                }
                ('/', Some('/')) => {
                    chars.next();
                    output.push_str("  ");
                    state = State::LineComment;
                }
                ('{', _) => {
                    output.push(' ');
                    state = State::Pragma;
                    opened_at = idx;
                }
                ('\'', _) | ('"', _) => {
                    output.push(if keep_literals { c } else { ' ' });
                    state = State::Literal {
                        quote: c,
                        escaped: false,
                    };
                    opened_at = idx;
                }
                _ => output.push(c),
            },
            State::BlockComment => {
                if c == '*' && next == Some(')') {
                    chars.next();
                    output.push_str("  ");
                    state = State::Text;
                } else {
                    push_blank(&mut output, c);
                }
            }
            State::LineComment => {
                if c == '\n' {
                    output.push(c);
                    state = State::Text;
                } else {
                    push_blank(&mut output, c);
                }
            }
            State::Pragma => {
                push_blank(&mut output, c);
                if c == '}' {
                    state = State::Text;
                }
            }
            State::Literal { quote, escaped } => {
                if keep_literals {
                    output.push(c);
                } else {
                    push_blank(&mut output, c);
                }
                if escaped {
                    state = State::Literal {
                        quote,
                        escaped: false,
                    };
                } else if c == '$' {
                    state = State::Literal {
                        quote,
                        escaped: true,
                    };
                } else if c == quote {
                    state = State::Text;
                }
            }
        }
    }

    (output, state, opened_at)
}

fn push_blank(output: &mut String, c: char) {
    output.push_str(&blanked(c.encode_utf8(&mut [0; 4])));
}

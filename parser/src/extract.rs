//! Lifts delimited blocks out of a text buffer.
//!
//! The extractor is given an ordered list of start and end keywords and
//! repeatedly removes the first region that starts with a start keyword and
//! ends with the next end keyword. The order of the list matters: the
//! delimiters are tried in order and each one is exhausted before the next
//! one is tried, so the blocks are returned grouped by kind rather than by
//! position.
//!
//! Removed regions are blanked rather than cut out of the buffer. This keeps
//! every offset valid for later searches and means that the position of each
//! block is a position in the caller's text.
use std::ops::Range;

use log::trace;

/// A pair of keywords that start and end a block.
#[derive(Clone, Copy, Debug)]
pub struct Delimiter<K> {
    pub kind: K,
    pub start: &'static str,
    pub end: &'static str,
}

impl<K> Delimiter<K> {
    pub const fn new(kind: K, start: &'static str, end: &'static str) -> Self {
        Self { kind, start, end }
    }
}

/// A block lifted out of the text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block<K> {
    pub kind: K,
    /// The text between the start and end keywords.
    pub inner: String,
    /// The search mask of the inner text.
    pub inner_mask: String,
    /// The position of the inner text.
    pub inner_span: Range<usize>,
    /// The position of the block including the keywords.
    pub outer_span: Range<usize>,
}

/// The result of extracting blocks.
#[derive(Debug)]
pub struct Extraction<K> {
    /// The text with every extracted block blanked.
    pub residual: String,
    /// The search mask with every extracted block blanked. Comments and
    /// string literals are blank in the mask.
    pub residual_mask: String,
    /// Blocks in the order they were extracted.
    pub blocks: Vec<Block<K>>,
    /// Start keywords that have no end keyword, with the position of the
    /// start keyword.
    pub unterminated: Vec<(K, Range<usize>)>,
}

/// Extracts blocks, searching for the keywords in the text itself.
pub fn extract<K: Copy>(text: &str, delimiters: &[Delimiter<K>]) -> Extraction<K> {
    extract_masked(text, text, delimiters)
}

/// Extracts blocks, searching for the keywords in `mask` and taking the
/// content from `text`.
///
/// The mask must have the same byte length as the text and differ only
/// where the text should not be searched (normally comments and string
/// literals replaced by spaces).
pub fn extract_masked<K: Copy>(
    text: &str,
    mask: &str,
    delimiters: &[Delimiter<K>],
) -> Extraction<K> {
    debug_assert_eq!(text.len(), mask.len());

    let mut residual = text.to_string();
    let mut residual_mask = mask.to_string();
    let mut blocks = vec![];
    let mut unterminated = vec![];

    for delimiter in delimiters {
        while let Some(start) = find_keyword(&residual_mask, delimiter.start, 0) {
            let inner_start = start + delimiter.start.len();
            let end = match find_keyword(&residual_mask, delimiter.end, inner_start) {
                Some(end) => end,
                None => {
                    // Give up on this delimiter; the unmatched start stays in
                    // the residual text.
                    unterminated.push((delimiter.kind, start..inner_start));
                    break;
                }
            };
            let outer_end = end + delimiter.end.len();

            trace!(
                "Extracted {}..{} at {}..{}",
                delimiter.start,
                delimiter.end,
                start,
                outer_end
            );

            blocks.push(Block {
                kind: delimiter.kind,
                inner: residual[inner_start..end].to_string(),
                inner_mask: residual_mask[inner_start..end].to_string(),
                inner_span: inner_start..end,
                outer_span: start..outer_end,
            });

            blank(&mut residual, start..outer_end);
            blank(&mut residual_mask, start..outer_end);
        }
    }

    Extraction {
        residual,
        residual_mask,
        blocks,
        unterminated,
    }
}

/// Finds the first occurrence of the keyword at or after `from` that is not
/// part of a longer identifier.
pub fn find_keyword(haystack: &str, keyword: &str, from: usize) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut pos = from;
    while pos <= haystack.len() {
        let found = pos + haystack[pos..].find(keyword)?;
        let end = found + keyword.len();
        let before_ok = found == 0 || !is_identifier_byte(bytes[found - 1]);
        let after_ok = end == bytes.len() || !is_identifier_byte(bytes[end]);
        if before_ok && after_ok {
            return Some(found);
        }
        // The keyword is ASCII so the next byte is a character boundary.
        pos = found + 1;
    }
    None
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Replaces the characters in the range with spaces, keeping line breaks
/// and the byte length.
pub fn blank(text: &mut String, range: Range<usize>) {
    let replacement = blanked(&text[range.clone()]);
    text.replace_range(range, &replacement);
}

/// Returns a copy of the text where each character other than a line break
/// is replaced by as many spaces as the character has bytes.
pub fn blanked(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\n' || c == '\r' {
            output.push(c);
        } else {
            for _ in 0..c.len_utf8() {
                output.push(' ');
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        VarInput,
        Var,
        Struct,
    }

    const DELIMITERS: [Delimiter<Kind>; 3] = [
        Delimiter::new(Kind::VarInput, "VAR_INPUT", "END_VAR"),
        Delimiter::new(Kind::Var, "VAR", "END_VAR"),
        Delimiter::new(Kind::Struct, "STRUCT", "END_STRUCT"),
    ];

    #[test]
    fn extract_when_no_blocks_then_residual_is_text() {
        let result = extract("x := 1;", &DELIMITERS);

        assert_eq!("x := 1;", result.residual);
        assert!(result.blocks.is_empty());
        assert!(result.unterminated.is_empty());
    }

    #[test]
    fn extract_when_var_input_and_var_then_separate_blocks() {
        let text = "VAR a : INT; END_VAR VAR_INPUT b : BOOL; END_VAR";
        let result = extract(text, &DELIMITERS);

        assert_eq!(2, result.blocks.len());
        assert_eq!(Kind::VarInput, result.blocks[0].kind);
        assert_eq!(" b : BOOL; ", result.blocks[0].inner);
        assert_eq!(Kind::Var, result.blocks[1].kind);
        assert_eq!(" a : INT; ", result.blocks[1].inner);
        assert_eq!("", result.residual.trim());
    }

    #[test]
    fn extract_when_blocks_then_grouped_by_kind_not_position() {
        let text = "VAR a END_VAR STRUCT s END_STRUCT VAR b END_VAR";
        let result = extract(text, &DELIMITERS);

        let kinds: Vec<Kind> = result.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(vec![Kind::Var, Kind::Var, Kind::Struct], kinds);
        assert_eq!(" a ", result.blocks[0].inner);
        assert_eq!(" b ", result.blocks[1].inner);
    }

    #[test]
    fn extract_when_extracted_then_spans_refer_to_text() {
        let text = "name\nVAR a END_VAR\nbody";
        let result = extract(text, &DELIMITERS);

        let block = &result.blocks[0];
        assert_eq!(" a ", &text[block.inner_span.clone()]);
        assert_eq!("VAR a END_VAR", &text[block.outer_span.clone()]);
        assert_eq!(text.len(), result.residual.len());
        assert!(result.residual.starts_with("name\n"));
        assert!(result.residual.ends_with("\nbody"));
    }

    #[test]
    fn extract_when_no_end_then_unterminated_and_text_remains() {
        let text = "VAR a : INT;";
        let result = extract(text, &DELIMITERS);

        assert!(result.blocks.is_empty());
        assert_eq!(vec![(Kind::Var, 0..3)], result.unterminated);
        assert_eq!(text, result.residual);
    }

    #[test]
    fn extract_when_keyword_inside_identifier_then_not_matched() {
        let text = "VARIANCE := MY_VAR;";
        let result = extract(text, &DELIMITERS);

        assert!(result.blocks.is_empty());
        assert!(result.unterminated.is_empty());
    }

    #[test]
    fn extract_masked_when_keyword_in_mask_blank_then_not_matched() {
        let text = "(* VAR *) VAR a END_VAR";
        let mask = "          VAR a END_VAR";
        let result = extract_masked(text, mask, &DELIMITERS);

        assert_eq!(1, result.blocks.len());
        assert_eq!(10..23, result.blocks[0].outer_span);
        assert_eq!("(* VAR *)", result.residual.trim());
    }

    #[test]
    fn blanked_when_multibyte_then_same_length() {
        let text = "größe\nx";
        let output = blanked(text);

        assert_eq!(text.len(), output.len());
        assert_eq!("", output.trim());
        assert!(output.contains('\n'));
    }

    #[test]
    fn find_keyword_when_preceded_by_underscore_then_skipped() {
        assert_eq!(Some(13), find_keyword("END_FUNCTION FUNCTION", "FUNCTION", 0));
        assert_eq!(None, find_keyword("END_FUNCTION", "FUNCTION", 0));
    }
}

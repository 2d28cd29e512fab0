//! Parses Structured Text declarations into components.
//!
//! Parsing has two stages. The first stage lifts the top-level blocks
//! (function blocks, functions, programs, types and global variable lists)
//! out of the source. The second stage lifts the sections (variable lists,
//! structure layouts and methods) out of each block. What remains of a block
//! after the second stage is the header and the statement body.
use dsl::{
    core::{FileId, SourceSpan},
    diagnostic::{Diagnostic, Label},
    ir::{Component, ComponentKind, Field, FieldKind, Qualifiers, VarDecl},
};
use log::debug;
use phf::phf_map;
use st2plcopen_problems::Problem;

use crate::{
    decl::{parse_declaration, parse_enum_values, parse_type_spec, split_declarations, Cursor},
    extract::{blank, extract_masked, find_keyword, Block, Delimiter},
    preprocessor::{mask, remove_comments},
    token::{tokenize, TokenType},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TopLevel {
    FunctionBlock,
    Function,
    Program,
    Type,
    GlobalVars,
}

impl TopLevel {
    fn keyword(&self) -> &'static str {
        match self {
            TopLevel::FunctionBlock => "FUNCTION_BLOCK",
            TopLevel::Function => "FUNCTION",
            TopLevel::Program => "PROGRAM",
            TopLevel::Type => "TYPE",
            TopLevel::GlobalVars => "VAR_GLOBAL",
        }
    }
}

// Longer keywords must come before the keywords they start with.
const COMPONENT_DELIMITERS: [Delimiter<TopLevel>; 5] = [
    Delimiter::new(TopLevel::FunctionBlock, "FUNCTION_BLOCK", "END_FUNCTION_BLOCK"),
    Delimiter::new(TopLevel::Function, "FUNCTION", "END_FUNCTION"),
    Delimiter::new(TopLevel::Program, "PROGRAM", "END_PROGRAM"),
    Delimiter::new(TopLevel::Type, "TYPE", "END_TYPE"),
    Delimiter::new(TopLevel::GlobalVars, "VAR_GLOBAL", "END_VAR"),
];

const FIELD_DELIMITERS: [Delimiter<FieldKind>; 7] = [
    Delimiter::new(FieldKind::VarInOut, "VAR_IN_OUT", "END_VAR"),
    Delimiter::new(FieldKind::VarInput, "VAR_INPUT", "END_VAR"),
    Delimiter::new(FieldKind::VarOutput, "VAR_OUTPUT", "END_VAR"),
    Delimiter::new(FieldKind::VarTemp, "VAR_TEMP", "END_VAR"),
    Delimiter::new(FieldKind::Var, "VAR", "END_VAR"),
    Delimiter::new(FieldKind::Method, "METHOD", "END_METHOD"),
    Delimiter::new(FieldKind::Struct, "STRUCT", "END_STRUCT"),
];

/// Marker that may occur between blocks and is not part of any block.
const EXTERNAL_MARKER: &str = "@EXTERNAL";

#[derive(Clone, Copy, Debug)]
enum Qualifier {
    Constant,
    Retain,
    NonRetain,
    Persistent,
}

static QUALIFIERS: phf::Map<&'static str, Qualifier> = phf_map! {
    "CONSTANT" => Qualifier::Constant,
    "RETAIN" => Qualifier::Retain,
    "NON_RETAIN" => Qualifier::NonRetain,
    "PERSISTENT" => Qualifier::Persistent,
};

/// State for one parse of one or more source texts.
#[derive(Default)]
struct ParseContext {
    /// The source that is being parsed.
    file_id: FileId,
    /// Number of global variable lists so far. Global variable lists have
    /// no name in the source so the name is generated from the count.
    global_count: usize,
}

/// Parses the source into components.
///
/// Components are returned grouped by kind: function blocks, then
/// functions, programs, types and global variable lists. Within a kind,
/// components are in source order.
pub fn parse_program(source: &str, file_id: &FileId) -> Result<Vec<Component>, Diagnostic> {
    parse_sources([(source, file_id)])
}

/// Parses several sources as one program. The components of each source
/// follow the components of the sources before it and generated names are
/// unique across all of the sources.
pub fn parse_sources<'a, I>(sources: I) -> Result<Vec<Component>, Diagnostic>
where
    I: IntoIterator<Item = (&'a str, &'a FileId)>,
{
    let mut context = ParseContext::default();
    let mut components = vec![];
    for (source, file_id) in sources {
        context.file_id = file_id.clone();
        components.append(&mut context.parse(source)?);
    }
    Ok(components)
}

impl ParseContext {
    fn parse(&mut self, source: &str) -> Result<Vec<Component>, Diagnostic> {
        let mask = mask(source, &self.file_id)?;
        let extraction = extract_masked(source, &mask, &COMPONENT_DELIMITERS);

        if let Some((kind, range)) = extraction.unterminated.first() {
            return Err(Diagnostic::problem(
                Problem::UnterminatedBlock,
                Label::span(
                    &SourceSpan::range(range.start, range.end).with_file_id(&self.file_id),
                    format!("{} has no matching end keyword", kind.keyword()),
                ),
            ));
        }
        self.check_remainder(&extraction.residual)?;

        extraction
            .blocks
            .iter()
            .map(|block| self.component(block))
            .collect()
    }

    /// Checks that there is nothing other than whitespace, comments and
    /// external markers outside of the blocks.
    fn check_remainder(&self, residual: &str) -> Result<(), Diagnostic> {
        let mut remainder = remove_comments(residual);
        while let Some(pos) = find_keyword(&remainder, EXTERNAL_MARKER, 0) {
            blank(&mut remainder, pos..pos + EXTERNAL_MARKER.len());
        }

        let start = match remainder.find(|c: char| !c.is_whitespace()) {
            Some(start) => start,
            None => return Ok(()),
        };
        let end = remainder[start..]
            .find(char::is_whitespace)
            .map(|len| start + len)
            .unwrap_or(remainder.len());

        Err(Diagnostic::problem(
            Problem::UnrecognizedText,
            Label::span(
                &SourceSpan::range(start, end).with_file_id(&self.file_id),
                "Text is outside of any declaration block",
            ),
        )
        .with_context("text", &remainder[start..end]))
    }

    fn component(&mut self, block: &Block<TopLevel>) -> Result<Component, Diagnostic> {
        debug!(
            "{} block at {}..{}",
            block.kind.keyword(),
            block.outer_span.start,
            block.outer_span.end
        );

        let span = SourceSpan::range(block.inner_span.start, block.inner_span.end)
            .with_file_id(&self.file_id);

        let mut component = if block.kind == TopLevel::GlobalVars {
            self.global_vars(&block.inner, &span)?
        } else {
            self.declaration(block, &span)?
        };

        component.span = SourceSpan::range(block.outer_span.start, block.outer_span.end)
            .with_file_id(&self.file_id);
        Ok(component)
    }

    fn global_vars(&mut self, text: &str, span: &SourceSpan) -> Result<Component, Diagnostic> {
        let name = format!("globalVars_{}", self.global_count);
        self.global_count += 1;

        let (qualifiers, offset) = leading_qualifiers(text);
        let variables = parse_variables(&text[offset..], &span.sub(offset, text.len()))?;

        Ok(Component::new(
            &name,
            ComponentKind::GlobalVars {
                qualifiers,
                variables,
            },
        ))
    }

    /// Parses a block that has sections, a header and possibly a body.
    fn declaration(
        &self,
        block: &Block<TopLevel>,
        span: &SourceSpan,
    ) -> Result<Component, Diagnostic> {
        let sections = extract_masked(&block.inner, &block.inner_mask, &FIELD_DELIMITERS);

        if let Some((kind, range)) = sections.unterminated.first() {
            return Err(Diagnostic::problem(
                Problem::UnterminatedBlock,
                Label::span(
                    &span.sub(range.start, range.end),
                    format!("{} has no matching end keyword", kind.keyword()),
                ),
            )
            .with_secondary(Label::span(
                span,
                format!("Section is inside this {}", block.kind.keyword()),
            )));
        }

        let mut fields = sections
            .blocks
            .iter()
            .map(|section| parse_field(section, span))
            .collect::<Result<Vec<Field>, Diagnostic>>()?;
        fields.sort_by_key(|field| field.span.start);

        // The residual has the same coordinates as the block.
        let residual = sections.residual.as_str();
        let mut cursor = Cursor::new(residual, span);
        let name = component_name(&mut cursor, block.kind)?;

        let (kind, body) = match block.kind {
            TopLevel::FunctionBlock | TopLevel::Program => {
                skip_inheritance(&mut cursor);
                let kind = if block.kind == TopLevel::Program {
                    ComponentKind::Program
                } else {
                    ComponentKind::FunctionBlock
                };
                (kind, statements(&residual[cursor.consumed_end()..]))
            }
            TopLevel::Function => {
                if !cursor.eat(TokenType::Colon) {
                    return Err(cursor
                        .error(
                            Problem::MissingReturnType,
                            "Expected ':' and the return type after the function name",
                        )
                        .with_context("function", &name));
                }
                let spec = parse_type_spec(&mut cursor)?;
                let return_type = VarDecl::unnamed(spec);
                (
                    ComponentKind::Function { return_type },
                    statements(&residual[cursor.consumed_end()..]),
                )
            }
            TopLevel::Type => (type_kind(&mut cursor, &name, &fields)?, String::new()),
            TopLevel::GlobalVars => {
                return Err(Diagnostic::internal_error(file!(), line!()));
            }
        };

        debug!("{} {} with {} fields", kind.keyword(), name, fields.len());

        Ok(Component::new(&name, kind).with_fields(fields).with_body(&body))
    }
}

/// Returns the statements that follow the header. Sections are blanked out
/// of the residual, so the lines that they leave behind are dropped.
fn statements(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads the component name, the first identifier of the header.
fn component_name(cursor: &mut Cursor, kind: TopLevel) -> Result<String, Diagnostic> {
    match cursor.peek() {
        Some(token) if token.token_type == TokenType::Identifier => {
            let name = token.text.to_string();
            cursor.bump();
            Ok(name)
        }
        _ => Err(cursor.error(
            Problem::MissingName,
            &format!("Expected the name after {}", kind.keyword()),
        )),
    }
}

/// Skips `EXTENDS Base` and `IMPLEMENTS I1, I2` in the header.
fn skip_inheritance(cursor: &mut Cursor) {
    while cursor
        .peek()
        .is_some_and(|t| t.is_keyword("EXTENDS") || t.is_keyword("IMPLEMENTS"))
    {
        cursor.bump();
        while cursor.eat(TokenType::Identifier) {
            while cursor.eat(TokenType::Period) {
                cursor.eat(TokenType::Identifier);
            }
            if !cursor.eat(TokenType::Comma) {
                break;
            }
        }
    }
}

/// Decides what a type declaration is from the text that remains after the
/// name.
fn type_kind(
    cursor: &mut Cursor,
    name: &str,
    fields: &[Field],
) -> Result<ComponentKind, Diagnostic> {
    let has_struct = fields.iter().any(|f| f.kind == FieldKind::Struct);

    if cursor.eat(TokenType::Colon) && cursor.peek_type() == Some(TokenType::LeftParen) {
        cursor.bump();
        let start = cursor.consumed_end();
        let mut depth: usize = 0;
        loop {
            match cursor.peek_type() {
                None => {
                    return Err(cursor
                        .error(Problem::InvalidDeclaration, "Expected ')' after the values")
                        .with_context("type", name))
                }
                Some(TokenType::RightParen) if depth == 0 => break,
                Some(t) if t.is_open() => depth += 1,
                Some(t) if t.is_close() => depth = depth.saturating_sub(1),
                _ => {}
            }
            cursor.bump();
        }
        let end = cursor.next_start();
        cursor.bump();

        let values = parse_enum_values(&cursor.text()[start..end], &cursor.span().sub(start, end))?;
        cursor.eat(TokenType::Semicolon);
        if cursor.is_done() {
            return Ok(ComponentKind::Enum { values });
        }
    } else {
        cursor.eat(TokenType::Semicolon);
        if cursor.is_done() && has_struct {
            return Ok(ComponentKind::Type);
        }
    }

    Err(cursor
        .error(
            Problem::UnsupportedTypeDeclaration,
            "Only structure and enumeration types are supported",
        )
        .with_context("type", name))
}

/// Parses one section of a component.
fn parse_field(section: &Block<FieldKind>, component_span: &SourceSpan) -> Result<Field, Diagnostic> {
    let span = component_span.sub(section.inner_span.start, section.inner_span.end);
    debug!("{} section at {}..{}", section.kind.keyword(), span.start, span.end);

    let mut field = Field::new(section.kind, vec![]);
    field.text = section.inner.clone();
    field.span = span.clone();

    if section.kind.has_declarations() {
        let (qualifiers, offset) = leading_qualifiers(&section.inner);
        field.qualifiers = qualifiers;
        field.variables = parse_variables(
            &section.inner[offset..],
            &span.sub(offset, section.inner.len()),
        )?;
    }

    Ok(field)
}

/// Parses the declarations of a variable list.
fn parse_variables(text: &str, span: &SourceSpan) -> Result<Vec<VarDecl>, Diagnostic> {
    let mut variables = vec![];
    for range in split_declarations(text) {
        let mut decls = parse_declaration(&text[range.clone()], &span.sub(range.start, range.end))?;
        variables.append(&mut decls);
    }
    Ok(variables)
}

/// Reads the qualifiers at the start of a variable list. Returns the
/// qualifiers and the offset of the text after them.
fn leading_qualifiers(text: &str) -> (Qualifiers, usize) {
    let tokens = tokenize(text);
    let mut qualifiers = Qualifiers::default();
    let mut offset = 0;

    for (index, token) in tokens.iter().enumerate() {
        if token.token_type != TokenType::Identifier {
            break;
        }
        let qualifier = match QUALIFIERS.get(token.text.to_ascii_uppercase().as_str()) {
            Some(qualifier) => qualifier,
            None => break,
        };
        // A variable whose name is the same as a qualifier
        if matches!(
            tokens.get(index + 1).map(|t| t.token_type),
            Some(TokenType::Colon) | Some(TokenType::Comma)
        ) {
            break;
        }

        match qualifier {
            Qualifier::Constant => qualifiers.constant = true,
            Qualifier::Retain => qualifiers.retain = true,
            Qualifier::NonRetain => qualifiers.non_retain = true,
            Qualifier::Persistent => qualifiers.persistent = true,
        }
        offset = token.span.end;
    }

    (qualifiers, offset)
}

//! Intermediate representation of Structured Text declarations.
//!
//! The parser produces a list of [`Component`] items, one for each top-level
//! declaration block. The XML generator consumes the same list. Nothing in
//! this representation depends on the output format.
//!
//! The representation keeps text where the converter does not
//! need more structure: the statement body and initial values remain the
//! raw text from the source.
use core::fmt;

use serde::Serialize;

use crate::core::SourceSpan;

/// Width of the characters in a string type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StringWidth {
    /// Single byte characters (`STRING`)
    String,
    /// Double byte characters (`WSTRING`)
    WString,
}

/// Lower and upper bound (inclusive) of one array dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Subrange {
    pub lower: i64,
    pub upper: i64,
}

impl Subrange {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }
}

/// An array type such as `ARRAY[0..2, 1..4] OF INT`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArraySpec {
    /// One item for each dimension, in declaration order.
    pub bounds: Vec<Subrange>,
    /// The name of the element type (the identifier after `OF`).
    pub element: String,
}

/// The type of a declared variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TypeSpec {
    /// A named type, either elementary (`INT`) or user defined (`MyStruct`).
    Elementary(String),
    /// A string with optional length (`STRING[20]`, `WSTRING`).
    String {
        width: StringWidth,
        length: Option<String>,
    },
    Array(ArraySpec),
}

/// Dimension information of a variable, either the length of a string or
/// the bounds of an array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dimensions {
    Length(String),
    Bounds(Vec<(i64, i64)>),
}

impl TypeSpec {
    pub fn elementary(name: &str) -> Self {
        TypeSpec::Elementary(name.to_string())
    }

    pub fn string(length: Option<&str>) -> Self {
        TypeSpec::String {
            width: StringWidth::String,
            length: length.map(String::from),
        }
    }

    pub fn array(bounds: Vec<Subrange>, element: &str) -> Self {
        TypeSpec::Array(ArraySpec {
            bounds,
            element: element.to_string(),
        })
    }

    /// Returns the label of the type: the type name for named types,
    /// `STRING`/`WSTRING` for strings and `ARRAY <element>` for arrays.
    pub fn label(&self) -> String {
        match self {
            TypeSpec::Elementary(name) => name.clone(),
            TypeSpec::String { width, .. } => match width {
                StringWidth::String => String::from("STRING"),
                StringWidth::WString => String::from("WSTRING"),
            },
            TypeSpec::Array(array) => format!("ARRAY {}", array.element),
        }
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        match self {
            TypeSpec::Elementary(_) => None,
            TypeSpec::String { length, .. } => length.clone().map(Dimensions::Length),
            TypeSpec::Array(array) => Some(Dimensions::Bounds(
                array.bounds.iter().map(|b| (b.lower, b.upper)).collect(),
            )),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeSpec::Array(_))
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One declared identifier: a variable, a structure member, an enumeration
/// value or (unnamed) the return type of a function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VarDecl {
    /// The declared name. Only a function return type has no name.
    pub name: Option<String>,
    /// Direct address for located variables (`x AT %IX0.0 : BOOL`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// The type. Enumeration values have no type.
    pub spec: Option<TypeSpec>,
    /// Raw text of the initial value (or the explicit value of an
    /// enumeration value).
    pub initial_value: Option<String>,
    #[serde(skip)]
    pub span: SourceSpan,
}

impl VarDecl {
    /// Creates an enumeration value (a name without a type).
    pub fn bare(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            address: None,
            spec: None,
            initial_value: None,
            span: SourceSpan::default(),
        }
    }

    /// Creates a typed variable.
    pub fn typed(name: &str, spec: TypeSpec) -> Self {
        Self {
            name: Some(name.to_string()),
            address: None,
            spec: Some(spec),
            initial_value: None,
            span: SourceSpan::default(),
        }
    }

    /// Creates a typed descriptor without a name (a return type).
    pub fn unnamed(spec: TypeSpec) -> Self {
        Self {
            name: None,
            address: None,
            spec: Some(spec),
            initial_value: None,
            span: SourceSpan::default(),
        }
    }

    pub fn with_initial_value(mut self, value: &str) -> Self {
        self.initial_value = Some(value.to_string());
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// The label of the type (see [`TypeSpec::label`]).
    pub fn base_type(&self) -> Option<String> {
        self.spec.as_ref().map(TypeSpec::label)
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.spec.as_ref().and_then(TypeSpec::dimensions)
    }

    /// True when this is an enumeration value rather than a variable.
    pub fn is_enum_value(&self) -> bool {
        self.spec.is_none()
    }
}

/// Qualifiers that apply to all variables of a variable section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Qualifiers {
    pub constant: bool,
    pub retain: bool,
    pub non_retain: bool,
    pub persistent: bool,
}

impl Qualifiers {
    pub fn is_empty(&self) -> bool {
        !(self.constant || self.retain || self.non_retain || self.persistent)
    }
}

/// The kind of section inside a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    VarInput,
    VarOutput,
    VarInOut,
    VarTemp,
    Var,
    Struct,
    Method,
}

impl FieldKind {
    /// The keyword that starts the section.
    pub fn keyword(&self) -> &'static str {
        match self {
            FieldKind::VarInput => "VAR_INPUT",
            FieldKind::VarOutput => "VAR_OUTPUT",
            FieldKind::VarInOut => "VAR_IN_OUT",
            FieldKind::VarTemp => "VAR_TEMP",
            FieldKind::Var => "VAR",
            FieldKind::Struct => "STRUCT",
            FieldKind::Method => "METHOD",
        }
    }

    /// True when the section contains variable declarations.
    pub fn has_declarations(&self) -> bool {
        !matches!(self, FieldKind::Method)
    }
}

/// A variable section or structure layout inside a component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Qualifiers::is_empty")]
    pub qualifiers: Qualifiers,
    pub variables: Vec<VarDecl>,
    /// The raw text between the section keywords.
    #[serde(skip)]
    pub text: String,
    #[serde(skip)]
    pub span: SourceSpan,
}

impl Field {
    pub fn new(kind: FieldKind, variables: Vec<VarDecl>) -> Self {
        Self {
            kind,
            qualifiers: Qualifiers::default(),
            variables,
            text: String::new(),
            span: SourceSpan::default(),
        }
    }
}

/// The kind of a top-level declaration, with the information that only
/// applies to that kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ComponentKind {
    FunctionBlock,
    Function {
        return_type: VarDecl,
    },
    Program,
    /// A type declaration that is not an enumeration. The layout is in a
    /// `STRUCT` field when the type is a structure.
    Type,
    /// A type declaration whose body is a parenthesized list of values.
    Enum {
        values: Vec<VarDecl>,
    },
    /// A global variable list.
    GlobalVars {
        qualifiers: Qualifiers,
        variables: Vec<VarDecl>,
    },
}

impl ComponentKind {
    /// The keyword that identifies the kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            ComponentKind::FunctionBlock => "FUNCTION_BLOCK",
            ComponentKind::Function { .. } => "FUNCTION",
            ComponentKind::Program => "PROGRAM",
            ComponentKind::Type => "TYPE",
            ComponentKind::Enum { .. } => "ENUM",
            ComponentKind::GlobalVars { .. } => "VAR_GLOBAL",
        }
    }
}

/// One top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    /// Sections in source order.
    pub fields: Vec<Field>,
    /// Residual statement text after the declarations are removed.
    pub body: String,
    #[serde(skip)]
    pub span: SourceSpan,
}

impl Component {
    pub fn new(name: &str, kind: ComponentKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fields: vec![],
            body: String::new(),
            span: SourceSpan::default(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Returns the structure layout of a type declaration.
    pub fn struct_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == FieldKind::Struct)
    }
}

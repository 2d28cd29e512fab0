//! Parser for the declarations in Structured Text source files.
//!
//! The parser is shallow: it understands the structure of
//! declarations (components, variable sections, variables and their types)
//! and keeps statements and initial values as text.

// Allow large errors because diagnostics carry labels and context.
#![allow(clippy::result_large_err)]

extern crate st2plcopen_dsl as dsl;

pub mod decl;
pub mod extract;
mod parser;
mod preprocessor;
pub mod token;

pub use crate::parser::{parse_program, parse_sources};

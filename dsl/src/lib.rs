//! Provides the intermediate representation of Structured Text declarations
//! and the diagnostics that describe problems with those declarations.

pub mod core;
pub mod diagnostic;
pub mod ir;
pub mod json_export;

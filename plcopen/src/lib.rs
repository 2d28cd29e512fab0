//! Generates PLCopen XML documents from the intermediate representation.
//!
//! The shape of the output comes from an exemplar document: elements are
//! created by copying content-erased fragments of the exemplar and then
//! populated with the declarations.
#![allow(clippy::result_large_err)]

mod mapper;
pub mod schema;
pub mod template;
pub mod tree;
mod writer;

pub use crate::mapper::map_components;
pub use crate::schema::SchemaDocument;
pub use crate::template::TemplateStore;
pub use crate::writer::OutputProject;

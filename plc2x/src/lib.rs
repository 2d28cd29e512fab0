// Allow large errors because diagnostics carry labels and context.
#![allow(clippy::result_large_err)]

extern crate st2plcopen_dsl;
extern crate st2plcopen_parser;
extern crate st2plcopen_plcopen;

pub mod cli;
pub mod logger;
pub mod source;

//! Problem codes for the converter. The set of problems is defined in
//! `resources/problem-codes.csv` and turned into the `Problem` enumeration
//! by the build script.
include!(concat!(env!("OUT_DIR"), "/problems.rs"));

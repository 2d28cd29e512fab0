//! Implements capabilities to read source files from disk.
//!
//! This module handles source encodings.

use std::path::Path;

use log::{debug, trace};
use st2plcopen_dsl::{
    core::FileId,
    diagnostic::{Diagnostic, Label},
};
use st2plcopen_problems::Problem;

/// The contents of a source file (or of the exemplar document).
#[derive(Debug)]
pub struct Source {
    file_id: FileId,
    data: String,
}

impl Source {
    pub fn new(source: String, file_id: &FileId) -> Self {
        Self {
            file_id: file_id.clone(),
            data: source,
        }
    }

    /// Reads the source from the file at the path.
    pub fn try_from_path(path: &Path) -> Result<Source, Diagnostic> {
        path_to_source(path).map(|src| Source::new(src, &FileId::from_path(path)))
    }

    pub fn as_string(&self) -> &str {
        &self.data
    }

    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }
}

/// Reads the file and decodes the content.
fn path_to_source(path: &Path) -> Result<String, Diagnostic> {
    debug!("Reading file {}", path.display());

    let bytes = std::fs::read(path)
        .map_err(|e| diagnostic(Problem::CannotReadFile, path, e.to_string()))?;

    // The first decoder without errors wins. Exports from older tools are
    // commonly latin1 rather than UTF-8.
    let decoders: [&'static encoding_rs::Encoding; 2] =
        [encoding_rs::UTF_8, encoding_rs::WINDOWS_1252];

    let result = decoders.into_iter().find_map(|d| {
        let (res, encoding_used, had_errors) = d.decode(&bytes);
        if had_errors {
            trace!(
                "Path {} did not match encoding {}",
                path.display(),
                encoding_used.name()
            );
            return None;
        }
        trace!(
            "Path {} matched encoding {}",
            path.display(),
            encoding_used.name()
        );
        Some(res.to_string())
    });

    match result {
        Some(res) => Ok(res),
        None => Err(diagnostic(
            Problem::UnsupportedEncoding,
            path,
            String::from("The file is not UTF-8 or latin1"),
        )),
    }
}

fn diagnostic(problem: Problem, path: &Path, message: String) -> Diagnostic {
    Diagnostic::problem(problem, Label::file(FileId::from_path(path), message))
}

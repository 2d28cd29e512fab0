//! Implements the command line behavior.

use codespan_reporting::{
    diagnostic::{Diagnostic, Label, LabelStyle, Severity},
    files::SimpleFiles,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream},
    },
};
use log::info;
use st2plcopen_dsl::{
    core::FileId,
    diagnostic::Label as SourceLabel,
    ir::Component,
    json_export::{to_json, JsonExportOptions},
};
use st2plcopen_parser::parse_sources;
use st2plcopen_plcopen::{map_components, SchemaDocument, TemplateStore};
use st2plcopen_problems::Problem;
use std::{
    collections::HashMap,
    fs::{metadata, read_dir},
    ops::Range,
    path::{Path, PathBuf},
};

use crate::source::Source;

/// The exemplar document that is used when no template is given.
const DEFAULT_TEMPLATE: &str = include_str!("../../resources/templates/ecockpit.xml");
const DEFAULT_TEMPLATE_NAME: &str = "ecockpit.xml";

/// Converts the files to one PLCopen document. The document is written to
/// the output file or to standard output.
pub fn convert(
    paths: Vec<PathBuf>,
    template: Option<PathBuf>,
    output: Option<PathBuf>,
    suppress_output: bool,
) -> Result<(), String> {
    let files = enumerate_all(paths)?;

    let mut sources = vec![];
    let result = convert_sources(&files, template.as_deref(), &mut sources)
        .and_then(|xml| write_output(&xml, output.as_deref(), suppress_output));

    result.map_err(|diagnostic| {
        handle_diagnostic(diagnostic, &sources, suppress_output);
        String::from("Error during conversion")
    })
}

/// Prints the components in the files as JSON.
pub fn parse(paths: Vec<PathBuf>, suppress_output: bool) -> Result<(), String> {
    let files = enumerate_all(paths)?;

    let mut sources = vec![];
    let components = read_and_parse(&files, &mut sources).map_err(|diagnostic| {
        handle_diagnostic(diagnostic, &sources, suppress_output);
        String::from("Error during parsing")
    })?;

    let json = to_json(&components, &JsonExportOptions::default()).map_err(|e| e.to_string())?;
    if !suppress_output {
        println!("{}", json);
    }
    Ok(())
}

fn read_and_parse(
    files: &[PathBuf],
    sources: &mut Vec<Source>,
) -> Result<Vec<Component>, st2plcopen_dsl::diagnostic::Diagnostic> {
    for path in files {
        sources.push(Source::try_from_path(path)?);
    }
    let components = parse_sources(sources.iter().map(|s| (s.as_string(), s.file_id())))?;
    info!(
        "Parsed {} components from {} files",
        components.len(),
        sources.len()
    );
    Ok(components)
}

/// Runs the conversion. Every source that is read is added to the sources
/// so that diagnostics can show the text.
fn convert_sources(
    files: &[PathBuf],
    template: Option<&Path>,
    sources: &mut Vec<Source>,
) -> Result<String, st2plcopen_dsl::diagnostic::Diagnostic> {
    let components = read_and_parse(files, sources)?;

    let template = match template {
        Some(path) => Source::try_from_path(path)?,
        None => Source::new(
            String::from(DEFAULT_TEMPLATE),
            &FileId::from_string(DEFAULT_TEMPLATE_NAME),
        ),
    };
    info!("Using exemplar document {}", template.file_id());
    sources.push(template);
    let template = sources
        .last()
        .ok_or_else(|| st2plcopen_dsl::diagnostic::Diagnostic::internal_error(file!(), line!()))?;

    let document = SchemaDocument::parse(template.as_string(), template.file_id())?;
    let store = TemplateStore::load(&document)?;
    let project = map_components(&store, &components)?;
    project.to_xml()
}

fn write_output(
    xml: &str,
    output: Option<&Path>,
    suppress_output: bool,
) -> Result<(), st2plcopen_dsl::diagnostic::Diagnostic> {
    match output {
        Some(path) => {
            info!("Writing {}", path.display());
            std::fs::write(path, xml).map_err(|e| {
                st2plcopen_dsl::diagnostic::Diagnostic::problem(
                    Problem::CannotWriteFile,
                    SourceLabel::file(FileId::from_path(path), e.to_string()),
                )
            })
        }
        None => {
            if !suppress_output {
                println!("{}", xml);
            }
            Ok(())
        }
    }
}

fn enumerate_all(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>, String> {
    let mut files: Vec<PathBuf> = vec![];
    for path in paths {
        files.append(&mut enumerate_files(&path)?);
    }
    Ok(files)
}

/// Returns the path when the path is a file and the files in the directory
/// (in name order) when the path is a directory.
fn enumerate_files(path: &PathBuf) -> Result<Vec<PathBuf>, String> {
    let metadata = metadata(path).map_err(|e| format!("error: {} {}", path.display(), e))?;
    if metadata.is_dir() {
        let paths = read_dir(path).map_err(|e| e.to_string())?;
        let mut paths: Vec<PathBuf> = paths
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(_) => None,
            })
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        return Ok(paths);
    }
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    Ok(vec![])
}

fn handle_diagnostic(
    diagnostic: st2plcopen_dsl::diagnostic::Diagnostic,
    sources: &[Source],
    suppress_output: bool,
) {
    if suppress_output {
        return;
    }

    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = codespan_reporting::term::Config::default();

    let mut files: SimpleFiles<String, &str> = SimpleFiles::new();
    let mut ids = HashMap::new();
    for source in sources {
        let id = files.add(source.file_id().to_string(), source.as_string());
        ids.insert(source.file_id().clone(), id);
    }

    let diagnostic = map_diagnostic(diagnostic, &ids);

    let _ = term::emit(&mut writer.lock(), &config, &files, &diagnostic).map_err(|err| {
        eprintln!("Failed writing to terminal: {}", err);
        1usize
    });
}

fn map_label(label: SourceLabel, style: LabelStyle, file: usize) -> Label<usize> {
    let range = match label.location {
        st2plcopen_dsl::diagnostic::Location::QualifiedPosition(pos) => Range {
            start: pos.offset,
            end: pos.offset,
        },
        st2plcopen_dsl::diagnostic::Location::OffsetRange(offset) => Range {
            start: offset.start,
            end: offset.end,
        },
    };
    Label::new(style, file, range).with_message(label.message)
}

/// Converts the diagnostic. Labels in files that were never read (such as
/// a file that does not exist) become notes.
fn map_diagnostic(
    diagnostic: st2plcopen_dsl::diagnostic::Diagnostic,
    ids: &HashMap<FileId, usize>,
) -> Diagnostic<usize> {
    let description = diagnostic.description();

    let mut labels = vec![];
    let mut notes = vec![];
    let all = std::iter::once((diagnostic.primary, LabelStyle::Primary)).chain(
        diagnostic
            .secondary
            .into_iter()
            .map(|lbl| (lbl, LabelStyle::Secondary)),
    );
    for (label, style) in all {
        match ids.get(&label.file_id) {
            Some(file) => labels.push(map_label(label, style, *file)),
            None => notes.push(format!("{}: {}", label.file_id, label.message)),
        }
    }

    Diagnostic::new(Severity::Error)
        .with_code(diagnostic.code)
        .with_message(description)
        .with_labels(labels)
        .with_notes(notes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use st2plcopen_dsl::{
        core::{FileId, SourceSpan},
        diagnostic::{Diagnostic, Label},
    };
    use st2plcopen_problems::Problem;
    use st2plcopen_test::shared_resource_path;
    use tempfile::tempdir;

    use crate::cli::{convert, map_diagnostic, parse};

    #[test]
    fn convert_when_valid_file_then_ok() {
        let paths = vec![shared_resource_path("conveyor.st")];
        let result = convert(paths, None, None, true);
        assert!(result.is_ok())
    }

    #[test]
    fn convert_when_output_then_writes_document() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.xml");

        let result = convert(
            vec![shared_resource_path("motor.st")],
            None,
            Some(output.clone()),
            true,
        );

        assert!(result.is_ok());
        let xml = std::fs::read_to_string(output).unwrap();
        assert!(xml.contains("<pou name=\"Motor\" pouType=\"functionBlock\">"));
    }

    #[test]
    fn convert_when_unterminated_block_then_error() {
        let paths = vec![shared_resource_path("unterminated.st")];
        let result = convert(paths, None, None, true);
        assert!(result.is_err())
    }

    #[test]
    fn convert_when_template_missing_then_error() {
        let result = convert(
            vec![shared_resource_path("motor.st")],
            Some(shared_resource_path("does_not_exist.xml")),
            None,
            true,
        );
        assert!(result.is_err())
    }

    #[test]
    fn parse_when_valid_file_then_ok() {
        let paths = vec![shared_resource_path("conveyor.st")];
        let result = parse(paths, true);
        assert!(result.is_ok())
    }

    #[test]
    fn parse_when_not_a_file_then_err() {
        let result = parse(vec!["test/file/doesnt/exist".into()], true);
        assert!(result.is_err())
    }

    #[test]
    fn map_diagnostic_when_file_not_read_then_note() {
        let diagnostic = Diagnostic::problem(
            Problem::CannotReadFile,
            Label::file(FileId::from_string("missing.st"), "No such file"),
        );

        let mapped = map_diagnostic(diagnostic, &HashMap::new());

        assert!(mapped.labels.is_empty());
        assert_eq!(vec![String::from("missing.st: No such file")], mapped.notes);
    }

    #[test]
    fn map_diagnostic_when_file_read_then_label() {
        let file_id = FileId::from_string("a.st");
        let diagnostic = Diagnostic::problem(
            Problem::UnrecognizedText,
            Label::span(&SourceSpan::range(3, 7).with_file_id(&file_id), "here"),
        );
        let ids = HashMap::from([(file_id, 0usize)]);

        let mapped = map_diagnostic(diagnostic, &ids);

        assert_eq!(1, mapped.labels.len());
        assert_eq!(3..7, mapped.labels[0].range);
        assert_eq!(Some(String::from("P0001")), mapped.code);
    }
}

use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use st2plcopen_test::{shared_resource_path, template_path};
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn convert_when_not_a_file_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("convert").arg("test/file/doesnt/exist");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error"));

    Ok(())
}

#[test]
fn convert_when_trace_log_and_not_a_file_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("-v")
        .arg("-v")
        .arg("-v")
        .arg("-v")
        .arg("convert")
        .arg("test/file/doesnt/exist");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error"));

    Ok(())
}

#[test]
fn convert_when_too_verbose_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("-vvvvv")
        .arg("convert")
        .arg(shared_resource_path("motor.st"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Don't be crazy with verbose"));

    Ok(())
}

#[test]
fn convert_when_valid_file_then_document_on_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("convert").arg(shared_resource_path("conveyor.st"));
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"))
        .stdout(predicate::str::contains(
            "<pou name=\"Clamp\" pouType=\"function\">",
        ))
        .stdout(predicate::str::contains("<dataType name=\"Position\">"));

    Ok(())
}

#[test]
fn convert_when_template_and_output_then_writes_file() -> Result<(), Box<dyn std::error::Error>> {
    let output = NamedTempFile::new()?;
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("convert")
        .arg(shared_resource_path("motor.st"))
        .arg("--template")
        .arg(template_path())
        .arg("--output")
        .arg(output.path());
    cmd.assert().success().stdout(predicate::str::is_empty());

    let xml = std::fs::read_to_string(output.path())?;
    assert!(xml.contains("<pou name=\"Motor\" pouType=\"functionBlock\">"));

    Ok(())
}

#[test]
fn convert_when_latin1_file_then_ok() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("convert").arg(shared_resource_path("latin1.st"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<dataType name=\"Temp\">"));

    Ok(())
}

#[test]
fn convert_when_unterminated_block_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("convert")
        .arg(shared_resource_path("unterminated.st"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("P0002"));

    Ok(())
}

#[test]
fn convert_when_alias_type_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("convert").arg(shared_resource_path("alias.st"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("P0003"));

    Ok(())
}

#[test]
fn convert_when_log_file_then_log_written() -> Result<(), Box<dyn std::error::Error>> {
    let log = NamedTempFile::new()?;
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("-vvv")
        .arg("--log-file")
        .arg(log.path())
        .arg("convert")
        .arg(shared_resource_path("motor.st"));
    cmd.assert().success();

    let content = std::fs::read_to_string(log.path())?;
    assert!(content.contains("DEBUG"));

    Ok(())
}

#[test]
fn parse_when_valid_file_then_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("st2plcopen"));

    cmd.arg("parse").arg(shared_resource_path("conveyor.st"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"schema_version\": \"1\""))
        .stdout(predicate::str::contains("\"name\": \"globalVars_0\""));

    Ok(())
}

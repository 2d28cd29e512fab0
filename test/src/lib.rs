use std::{fs, path::PathBuf};

/// Reads a Structured Text or template resource shared by the crates.
pub fn read_shared_resource(name: &'static str) -> String {
    fs::read_to_string(shared_resource_path(name)).expect("Unable to read file")
}

pub fn shared_resource_path(name: &'static str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("..");
    path.push("resources");
    path.push("test");
    path.push(name);
    path
}

/// Path of the exemplar document bundled with the converter.
pub fn template_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("..");
    path.push("resources");
    path.push("templates");
    path.push("ecockpit.xml");
    path
}

pub fn read_template() -> String {
    fs::read_to_string(template_path()).expect("Unable to read template")
}

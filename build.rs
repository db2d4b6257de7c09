//! Build script to generate the bundled model manifest
//!
//! Scans assets/models/ and writes manifest.txt listing every bundled file
//! (forward slashes, relative to the models dir), since some targets can't
//! enumerate directories at runtime.

use std::fs;
use std::path::Path;

const MODELS_DIR: &str = "assets/models";
const MANIFEST: &str = "manifest.txt";

fn main() {
    println!("cargo:rerun-if-changed={}", MODELS_DIR);

    let models_dir = Path::new(MODELS_DIR);
    if !models_dir.is_dir() {
        return;
    }

    let mut files = Vec::new();
    collect(models_dir, "", &mut files);
    files.sort();

    let mut manifest = String::from("# Generated by build.rs\n");
    for file in files {
        manifest.push_str(&file);
        manifest.push('\n');
    }

    // Only touch the file when it changes, so rerun-if-changed settles
    let manifest_path = models_dir.join(MANIFEST);
    if fs::read_to_string(&manifest_path).ok().as_deref() == Some(manifest.as_str()) {
        return;
    }
    if let Err(e) = fs::write(&manifest_path, manifest) {
        println!("cargo:warning=could not write {}: {}", manifest_path.display(), e);
    }
}

fn collect(dir: &Path, prefix: &str, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        let path = entry.path();
        if path.is_dir() {
            collect(&path, &relative, out);
        } else if path.is_file() && name != MANIFEST {
            out.push(relative);
        }
    }
}

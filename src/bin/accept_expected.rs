//! Binary to generate/update .expected.* files for the fixtures
//!
//! Usage:
//!   cargo run --bin accept_expected            # Update all
//!   cargo run --bin accept_expected -- basic   # Update only fixtures matching "basic"

use std::fs;
use std::path::Path;
use walkdir::WalkDir;
use web_minifier::{Options, SourceKind, minify};

fn main() {
    let filter: Option<String> = std::env::args().nth(1);
    let fixture_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");

    let mut updated = 0;
    let mut skipped = 0;

    for entry in WalkDir::new(&fixture_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| SourceKind::from_path(e.path()).is_some())
        .filter(|e| !e.path().to_string_lossy().contains(".expected."))
    {
        let path = entry.path();
        let path_str = path.to_string_lossy();

        // Apply filter if provided
        if let Some(ref f) = filter {
            if !path_str.contains(f) {
                skipped += 1;
                continue;
            }
        }

        process_file(path);
        updated += 1;
    }

    println!("Updated {} files, skipped {}", updated, skipped);
}

fn process_file(path: &Path) {
    let Some(kind) = SourceKind::from_path(path) else {
        return;
    };

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", path, e);
            return;
        }
    };

    let sidecar = path.with_extension("options.json");
    let options: Options = match fs::read_to_string(&sidecar) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Invalid options in {:?}: {}", sidecar, e);
                return;
            }
        },
        Err(_) => Options::default(),
    };

    let output = minify(kind, &source, &options);
    let expected = path.with_extension(format!("expected.{}", kind.extension()));
    if let Err(e) = fs::write(&expected, format!("{output}\n")) {
        eprintln!("Failed to write {:?}: {}", expected, e);
    } else {
        println!("  wrote {}", expected.display());
    }
}

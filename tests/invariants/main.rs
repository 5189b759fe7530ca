//! Properties every minifier must hold on every fixture:
//!
//! - idempotence: minifying minified output changes nothing
//! - determinism: the same input always gives the same output
//! - minification never grows the input
//!
//! Run with: cargo test --test invariants

use libtest_mimic::{Arguments, Failed, Trial};
use std::fs;
use std::path::{Path, PathBuf};
use web_minifier::{Options, SourceKind, minify};

fn fixtures() -> Vec<PathBuf> {
    let pattern = format!("{}/tests/fixtures/**/*", env!("CARGO_MANIFEST_DIR"));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .expect("valid glob pattern")
        .filter_map(|entry| entry.ok())
        .filter(|path| SourceKind::from_path(path).is_some())
        .filter(|path| !path.to_string_lossy().contains(".expected."))
        .collect();
    files.sort();
    files
}

fn options_for(path: &Path) -> Options {
    fs::read_to_string(path.with_extension("options.json"))
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

fn read(path: &Path) -> Result<(SourceKind, String, Options), Failed> {
    let kind = SourceKind::from_path(path).ok_or("not a fixture")?;
    let source = fs::read_to_string(path).map_err(|e| e.to_string())?;
    Ok((kind, source, options_for(path)))
}

fn check_idempotent(path: &Path) -> Result<(), Failed> {
    let (kind, source, options) = read(path)?;
    let once = minify(kind, &source, &options);
    let twice = minify(kind, &once, &options);
    if once != twice {
        return Err(format!("not idempotent\n--- once ---\n{once}\n--- twice ---\n{twice}").into());
    }
    Ok(())
}

fn check_deterministic(path: &Path) -> Result<(), Failed> {
    let (kind, source, options) = read(path)?;
    let first = minify(kind, &source, &options);
    for _ in 0..3 {
        if minify(kind, &source, &options) != first {
            return Err("output differs between runs".into());
        }
    }
    Ok(())
}

fn check_not_larger(path: &Path) -> Result<(), Failed> {
    let (kind, source, options) = read(path)?;
    let minified = minify(kind, &source, &options);
    if minified.len() > source.len() {
        return Err(format!("output grew from {} to {} bytes", source.len(), minified.len()).into());
    }
    Ok(())
}

fn main() {
    let args = Arguments::from_args();
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");

    let mut trials = Vec::new();
    for path in fixtures() {
        let name = path
            .strip_prefix(&root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        let idempotent = path.clone();
        trials.push(Trial::test(format!("idempotent::{name}"), move || check_idempotent(&idempotent)));
        let deterministic = path.clone();
        trials.push(Trial::test(format!("deterministic::{name}"), move || {
            check_deterministic(&deterministic)
        }));
        trials.push(Trial::test(format!("not_larger::{name}"), move || check_not_larger(&path)));
    }

    libtest_mimic::run(&args, trials).exit();
}

//! File driver tests against temporary directories
//!
//! Run with: cargo test --test driver_tests

use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use web_minifier::driver::{DriverOptions, collect_sources, content_hash, process_file, process_path};
use web_minifier::{Error, Options};

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn gunzip(path: &Path) -> String {
    let mut decoder = GzDecoder::new(fs::File::open(path).unwrap());
    let mut text = String::new();
    decoder.read_to_string(&mut text).unwrap();
    text
}

#[test]
fn test_single_file_writes_min_sibling() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.css", "a { color : red ; }\n");

    let processed = process_file(&dir.path().join("app.css"), &DriverOptions::default()).unwrap();

    assert_eq!(processed.output, dir.path().join("app.min.css"));
    assert_eq!(fs::read_to_string(&processed.output).unwrap(), "a{color:red}");
    assert_eq!(processed.original_size, 20);
    assert_eq!(processed.minified_size, 12);
    assert!(processed.gzip.is_none());
    // Source is left alone
    assert_eq!(fs::read_to_string(dir.path().join("app.css")).unwrap(), "a { color : red ; }\n");
}

#[test]
fn test_overwrite_replaces_source() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.js", "var a = 1 ;\n");

    let options = DriverOptions { overwrite: true, ..DriverOptions::default() };
    let processed = process_file(&dir.path().join("app.js"), &options).unwrap();

    assert_eq!(processed.output, dir.path().join("app.js"));
    assert_eq!(fs::read_to_string(dir.path().join("app.js")).unwrap(), "var a=1;");
    assert!(!dir.path().join("app.min.js").exists());
}

#[test]
fn test_prefix_and_hash_in_output_name() {
    let dir = TempDir::new().unwrap();
    let source = "a { b : c }";
    write(dir.path(), "site.css", source);

    let options = DriverOptions {
        prefix: "v1.".to_string(),
        add_hash: true,
        ..DriverOptions::default()
    };
    let processed = process_file(&dir.path().join("site.css"), &options).unwrap();

    let expected = dir.path().join(format!("v1.site-{}.min.css", content_hash(source)));
    assert_eq!(processed.output, expected);
    assert!(expected.exists());
}

#[test]
fn test_timestamp_only_for_css_and_js() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.css", "a { b : c }");
    write(dir.path(), "a.html", "<p> x </p>");

    let options = DriverOptions { timestamp: true, ..DriverOptions::default() };
    let css = process_file(&dir.path().join("a.css"), &options).unwrap();
    let html = process_file(&dir.path().join("a.html"), &options).unwrap();

    let css_text = fs::read_to_string(css.output).unwrap();
    assert!(css_text.starts_with("/* "), "{css_text}");
    assert!(css_text.ends_with(" */ a{b:c}"), "{css_text}");
    assert_eq!(fs::read_to_string(html.output).unwrap(), "<p>x</p>");
}

#[test]
fn test_gzip_writes_compressed_sibling() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.css", "a { b : c }");

    let options = DriverOptions { gzip: true, ..DriverOptions::default() };
    let processed = process_file(&dir.path().join("app.css"), &options).unwrap();

    let gzip = processed.gzip.unwrap();
    assert_eq!(gzip, dir.path().join("app.min.css.gz"));
    assert_eq!(gunzip(&gzip), "a{b:c}");
    assert_eq!(fs::read_to_string(dir.path().join("app.min.css")).unwrap(), "a{b:c}");
}

#[test]
fn test_explicit_output_with_gzip_writes_one_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.js", "f( 1 ) ;");
    let output = dir.path().join("bundle.js.gz");

    let options = DriverOptions {
        gzip: true,
        output: Some(output.clone()),
        ..DriverOptions::default()
    };
    let processed = process_file(&dir.path().join("app.js"), &options).unwrap();

    assert_eq!(processed.output, output);
    assert_eq!(gunzip(&output), "f(1);");
    assert!(!dir.path().join("app.min.js").exists());
}

#[test]
fn test_options_reach_the_minifier() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.css", "/*! license */ a { z: 1; b: 2 }");

    let options = DriverOptions {
        minify: Options { sort: true, preserve_comments: true, wrap: None },
        ..DriverOptions::default()
    };
    let processed = process_file(&dir.path().join("app.css"), &options).unwrap();

    assert_eq!(fs::read_to_string(processed.output).unwrap(), "/*! license */a{b:2;z:1}");
}

#[test]
fn test_directory_skips_minified_and_unsupported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "style.css", "a { b : c }");
    write(dir.path(), "js/app.js", "var a = 1 ;");
    write(dir.path(), "js/vendor.min.js", "var b = 2 ;");
    write(dir.path(), "index.htm", "<p> hi </p>");
    write(dir.path(), "logo.svg", "<svg/>");

    let sources = collect_sources(dir.path());
    assert_eq!(
        sources,
        vec![
            dir.path().join("index.htm"),
            dir.path().join("js/app.js"),
            dir.path().join("style.css"),
        ]
    );

    let processed = process_path(dir.path(), &DriverOptions::default()).unwrap();
    assert_eq!(processed.len(), 3);
    assert_eq!(fs::read_to_string(dir.path().join("js/app.min.js")).unwrap(), "var a=1;");
    assert_eq!(fs::read_to_string(dir.path().join("index.min.htm")).unwrap(), "<p>hi</p>");
    assert_eq!(fs::read_to_string(dir.path().join("js/vendor.min.js")).unwrap(), "var b = 2 ;");
}

#[test]
fn test_errors() {
    let dir = TempDir::new().unwrap();

    let missing = process_path(&dir.path().join("nope.css"), &DriverOptions::default());
    assert!(matches!(missing, Err(Error::NotFound(_))));

    let empty = process_path(dir.path(), &DriverOptions::default());
    assert!(matches!(empty, Err(Error::NoFiles(_))));

    write(dir.path(), "notes.txt", "hello");
    let unsupported = process_file(&dir.path().join("notes.txt"), &DriverOptions::default());
    assert!(matches!(unsupported, Err(Error::Unsupported(_))));
}

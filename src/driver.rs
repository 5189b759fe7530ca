//! File handling around the minifiers.
//!
//! Reads a source file, minifies it, names the output and writes it, with the
//! optional timestamp comment, content hash, prefix and gzip copy. Directories
//! are walked and their files minified in parallel.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use chrono::Local;
use flate2::Compression;
use flate2::write::GzEncoder;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::{Options, SourceKind};

/// Hex digits of the content hash appended to output names.
const HASH_LEN: usize = 11;

/// What to do with each file besides minifying it.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub minify: Options,
    /// Prepend a `/* yyyy-mm-ddthh:mm:ss */ ` comment (CSS and JavaScript only).
    pub timestamp: bool,
    /// Write `name.ext` instead of `name.min.ext`.
    pub overwrite: bool,
    /// Also write a gzip-compressed copy next to the output.
    pub gzip: bool,
    /// Prepended to the output file name.
    pub prefix: String,
    /// Append a hash of the original content to the output file name.
    pub add_hash: bool,
    /// Explicit output file; only honoured for single files.
    pub output: Option<PathBuf>,
}

/// One minified file.
#[derive(Debug, Clone, Serialize)]
pub struct Processed {
    pub source: PathBuf,
    pub output: PathBuf,
    pub gzip: Option<PathBuf>,
    pub kind: SourceKind,
    pub original_size: usize,
    pub minified_size: usize,
}

/// Name of the minified file for `path`.
///
/// `dir/app.css` becomes `dir/app.min.css`, or `dir/app.css` with
/// `overwrite`. The prefix goes before the stem and the hash after it:
/// `dir/<prefix>app-<hash>.min.css`.
pub fn output_path(path: &Path, kind: SourceKind, content: &str, options: &DriverOptions) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| kind.extension().to_string());

    let mut name = format!("{}{}", options.prefix, stem);
    if options.add_hash {
        name.push('-');
        name.push_str(&content_hash(content));
    }
    if !options.overwrite {
        name.push_str(".min");
    }
    name.push('.');
    name.push_str(&extension);

    path.with_file_name(name)
}

/// Short hex digest identifying `content`, for cache-busting file names.
pub fn content_hash(content: &str) -> String {
    let mut hash = hex::encode(Sha256::digest(content.as_bytes()));
    hash.truncate(HASH_LEN);
    hash
}

fn timestamp_comment() -> String {
    format!("/* {} */ ", Local::now().format("%Y-%m-%dt%H:%M:%S"))
}

fn gzip_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::io("write", path, e))
}

fn write_gzip(path: &Path, content: &str) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io("create", path, e))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(content.as_bytes())
        .and_then(|_| encoder.finish().map(|_| ()))
        .map_err(|e| Error::io("compress", path, e))
}

/// Minify one file and write the result.
pub fn process_file(path: &Path, options: &DriverOptions) -> Result<Processed> {
    let kind = SourceKind::from_path(path).ok_or_else(|| Error::Unsupported(path.to_path_buf()))?;
    let source = fs::read_to_string(path).map_err(|e| Error::io("read", path, e))?;

    let mut code = crate::minify(kind, &source, &options.minify);
    if options.timestamp && kind != SourceKind::Html {
        code.insert_str(0, &timestamp_comment());
    }

    let (output, gzip) = match &options.output {
        Some(output) if options.gzip => {
            write_gzip(output, &code)?;
            (output.clone(), Some(output.clone()))
        }
        Some(output) => {
            write_text(output, &code)?;
            (output.clone(), None)
        }
        None => {
            let output = output_path(path, kind, &source, options);
            write_text(&output, &code)?;
            let gzip = if options.gzip {
                let gzip = gzip_path(&output);
                write_gzip(&gzip, &code)?;
                Some(gzip)
            } else {
                None
            };
            (output, gzip)
        }
    };

    debug!(
        source = %path.display(),
        output = %output.display(),
        original = source.len(),
        minified = code.len(),
        "minified file"
    );

    Ok(Processed {
        source: path.to_path_buf(),
        output,
        gzip,
        kind,
        original_size: source.len(),
        minified_size: code.len(),
    })
}

/// Minify a single file, or every source file under a directory.
pub fn process_path(path: &Path, options: &DriverOptions) -> Result<Vec<Processed>> {
    if path.is_file() {
        return Ok(vec![process_file(path, options)?]);
    }
    if !path.is_dir() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let files = collect_sources(path);
    if files.is_empty() {
        return Err(Error::NoFiles(path.to_path_buf()));
    }

    let mut options = options.clone();
    if options.output.take().is_some() {
        warn!("an output file only applies to single files, ignoring it for {}", path.display());
    }

    info!(dir = %path.display(), files = files.len(), "minifying directory");
    files.par_iter().map(|file| process_file(file, &options)).collect()
}

/// Source files under `dir`, skipping already minified ones, in path order.
pub fn collect_sources(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| SourceKind::from_path(path).is_some() && !is_minified(path))
        .collect();
    files.sort();
    files
}

/// `app.min.css`, `app.min.js.gz` and the like.
pub fn is_minified(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().split('.').any(|part| part == "min"))
        .unwrap_or(false)
}

/// Minify `path` (a file, or every source file under a directory) again
/// whenever it changes. Runs until the watcher fails.
pub fn watch(path: &Path, options: &DriverOptions, mut on_change: impl FnMut(Result<Processed>)) -> Result<()> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    let mode = if path.is_dir() { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
    watcher.watch(path, mode)?;
    info!(path = %path.display(), "watching for changes");

    // Content of every file we wrote, so our own writes don't retrigger.
    let mut written: HashMap<PathBuf, String> = HashMap::new();

    for res in rx {
        let event = res?;
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }

        for changed in &event.paths {
            if SourceKind::from_path(changed).is_none() || is_minified(changed) || !changed.is_file() {
                continue;
            }
            let Some(current) = read_watched(changed) else {
                continue;
            };
            if written.get(changed) == Some(&current) {
                continue;
            }

            let result = process_file(changed, options);
            if let Ok(processed) = &result {
                if let Some(content) = read_watched(&processed.output) {
                    written.insert(processed.output.clone(), content);
                }
            }
            on_change(result);
        }
    }

    Ok(())
}

/// Text of a watched file, or `None` (with a warning) when it can't be read.
fn read_watched(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(path = %path.display(), "skipping unreadable file: {e}");
            None
        }
    }
}

use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use web_minifier::driver::{self, DriverOptions, Processed};
use web_minifier::{Error, Options, Result, SourceKind, minify_with};

#[derive(Parser)]
#[command(name = "minify")]
#[command(about = "Minify - CSS, JavaScript and HTML minifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Minify a .css, .js or .html file, or every such file in a directory
    Minify {
        /// Path to a source file or directory
        #[arg(required_unless_present = "stdin")]
        path: Option<PathBuf>,

        /// Read from stdin and write to stdout
        #[arg(long)]
        stdin: bool,

        /// Source kind for stdin: css, js or html (default html)
        #[arg(long, requires = "stdin")]
        kind: Option<SourceKind>,

        /// Output a JSON report (stdin only)
        #[arg(long)]
        json: bool,

        /// Wrap CSS rules after this column
        #[arg(long, value_name = "COLUMN", num_args = 0..=1, default_missing_value = "80")]
        wrap: Option<usize>,

        /// Keep /*! */ comments in CSS and all comments in HTML
        #[arg(long)]
        comments: bool,

        /// Sort CSS declarations by property name
        #[arg(long)]
        sort: bool,

        /// Prepend a `/* yyyy-mm-ddthh:mm:ss */` local-time comment to CSS and JavaScript output
        #[arg(long)]
        timestamp: bool,

        /// Write over the source file instead of creating .min files
        #[arg(long)]
        overwrite: bool,

        /// Also write a gzip-compressed copy
        #[arg(long)]
        gzip: bool,

        /// Prefix for output file names
        #[arg(long, default_value = "")]
        prefix: String,

        /// Append a content hash to output file names
        #[arg(long)]
        hash: bool,

        /// Output file (single file only)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Minify again whenever the path changes
        #[arg(long)]
        watch: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Minify {
            path,
            stdin,
            kind,
            json,
            wrap,
            comments,
            sort,
            timestamp,
            overwrite,
            gzip,
            prefix,
            hash,
            output,
            watch,
        } => {
            let minify = Options { wrap, preserve_comments: comments, sort };
            if stdin {
                minify_stdin(kind.unwrap_or(SourceKind::Html), &minify, json)
            } else if let Some(path) = path {
                let options = DriverOptions {
                    minify,
                    timestamp,
                    overwrite,
                    gzip,
                    prefix,
                    add_hash: hash,
                    output,
                };
                if watch { watch_path(&path, &options) } else { minify_path(&path, &options) }
            } else {
                eprintln!("Error: provide a file/directory or use --stdin");
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn minify_stdin(kind: SourceKind, options: &Options, json_output: bool) -> Result<()> {
    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .map_err(|e| Error::Io { action: "read", path: PathBuf::from("<stdin>"), source: e })?;

    let result = minify_with(kind, &source, options);

    if json_output {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        print!("{}", result.code);
    }
    Ok(())
}

fn minify_path(path: &Path, options: &DriverOptions) -> Result<()> {
    let start = Instant::now();
    let processed = driver::process_path(path, options)?;
    for file in &processed {
        print_generated(file);
    }
    print_summary(&processed, start.elapsed());
    Ok(())
}

fn watch_path(path: &Path, options: &DriverOptions) -> Result<()> {
    minify_path(path, options)?;
    driver::watch(path, options, |result| match result {
        Ok(file) => print_generated(&file),
        Err(e) => eprintln!("Error: {e}"),
    })
}

fn print_generated(file: &Processed) {
    let is_tty = io::stderr().is_terminal();
    let saved = format_savings(file.original_size, file.minified_size);
    if is_tty {
        eprintln!("  \x1b[32m✓\x1b[0m {} \x1b[2m({})\x1b[0m", file.output.display(), saved);
    } else {
        eprintln!("  ✓ {} ({})", file.output.display(), saved);
    }
    if let Some(gzip) = file.gzip.as_ref().filter(|gzip| *gzip != &file.output) {
        eprintln!("  ✓ {}", gzip.display());
    }
}

fn print_summary(processed: &[Processed], elapsed: std::time::Duration) {
    let is_tty = io::stderr().is_terminal();
    let time_str = format_duration(elapsed);
    let count = processed.len();
    let files_word = if count == 1 { "file" } else { "files" };
    let original: usize = processed.iter().map(|file| file.original_size).sum();
    let minified: usize = processed.iter().map(|file| file.minified_size).sum();
    let saved = format_savings(original, minified);

    if is_tty {
        eprintln!("\n\x1b[1m✨ Minified {} {} in {} ({})\x1b[0m", count, files_word, time_str, saved);
    } else {
        eprintln!("\n✨ Minified {} {} in {} ({})", count, files_word, time_str, saved);
    }
}

fn format_savings(original: usize, minified: usize) -> String {
    if original == 0 {
        return format!("{} → {} bytes", original, minified);
    }
    let percent = 100.0 - (minified as f64 * 100.0 / original as f64);
    format!("{} → {} bytes, -{:.1}%", original, minified, percent)
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

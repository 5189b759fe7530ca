use std::path::{Path, PathBuf};

/// Errors from reading, writing and watching files.
///
/// The minifiers themselves cannot fail; every variant here comes from the
/// file driver or the command line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a .css, .js or .html file", .0.display())]
    Unsupported(PathBuf),

    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("no .css, .js or .html files found in {}", .0.display())]
    NoFiles(PathBuf),

    #[error("file watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Error::Io { action, path: path.to_path_buf(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::io(
            "read",
            Path::new("site/app.css"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "failed to read site/app.css: missing");
        assert_eq!(
            Error::Unsupported(PathBuf::from("logo.png")).to_string(),
            "logo.png is not a .css, .js or .html file"
        );
    }
}

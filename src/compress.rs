//! Precompresses textual build artifacts so the hosting edge can serve them
//! with `Content-Encoding: gzip` without compressing on the fly.

use flate2::read::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension appended to the compressed sibling of an artifact.
pub const SUFFIX: &str = "gz";

/// Gzip-compresses `data` at the maximum level.
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(data, Compression::best());
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed)?;
    Ok(compressed)
}

/// The path of the compressed sibling of `path` (`index.html` →
/// `index.html.gz`).
pub fn sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(SUFFIX);
    PathBuf::from(name)
}

/// Walks `directory` in file-name order and writes a gzip sibling next to
/// every file whose extension is in `extensions`. The originals are kept.
/// Returns the number of siblings written.
pub fn compress_tree(directory: &Path, extensions: &[String]) -> Result<usize> {
    let mut targets = Vec::new();
    for result in WalkDir::new(directory).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|wanted| wanted == ext))
            .unwrap_or(false);
        if matches {
            targets.push(entry.into_path());
        }
    }

    for path in &targets {
        compress_file(path)?;
    }
    Ok(targets.len())
}

fn compress_file(path: &Path) -> Result<()> {
    let annotate = |e| Error::Io(path.to_owned(), e);
    let data = std::fs::read(path).map_err(annotate)?;
    let compressed = gzip(&data).map_err(annotate)?;
    std::fs::write(sibling(path), compressed).map_err(annotate)
}

/// The result of a fallible compression.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error compressing the output tree.
#[derive(Debug)]
pub enum Error {
    /// An error reading, compressing or writing a file.
    Io(PathBuf, std::io::Error),

    /// An error walking the output directory.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(path, err) => write!(f, "compressing `{}`: {}", path.display(), err),
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(_, err) => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while walking directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

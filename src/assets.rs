//! Copies the site's fixed top-level pages and static assets into the build
//! directory. Anything missing from the source directory is logged and
//! skipped; only the blog posts are required to produce a site.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::budget::kib;
use crate::log;
use crate::minify::{self, Minifier};

/// What the asset pass produced, by file name.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Copied {
    pub pages: Vec<String>,
    pub assets: Vec<String>,
    pub service_worker: bool,
}

/// Inputs for [`copy_assets`], all relative to `source_directory`.
pub struct Assets<'a> {
    pub source_directory: &'a Path,
    pub output_directory: &'a Path,

    /// Top-level HTML pages, minified on the way.
    pub pages: &'a [String],

    /// Binary assets, copied byte for byte.
    pub assets: &'a [String],

    /// Optional service worker script, minified on the way.
    pub service_worker: &'a str,
}

impl Assets<'_> {
    pub fn copy(&self, minifier: &Minifier) -> Result<Copied> {
        let mut copied = Copied::default();

        for page in self.pages {
            if self.copy_page(page, minifier)? {
                copied.pages.push(page.clone());
            }
        }

        for asset in self.assets {
            let src = self.source_directory.join(asset);
            let dst = self.output_directory.join(asset);
            match std::fs::copy(&src, &dst) {
                Ok(_) => {
                    log!("asset"; "{}", asset);
                    copied.assets.push(asset.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log!("skip"; "{}: not found", asset);
                }
                Err(e) => return Err(Error::Io(src, e)),
            }
        }

        copied.service_worker = self.copy_service_worker(minifier)?;
        Ok(copied)
    }

    fn copy_page(&self, page: &str, minifier: &Minifier) -> Result<bool> {
        let src = self.source_directory.join(page);
        let content = match read_optional(&src)? {
            Some(content) => content,
            None => {
                log!("skip"; "{}: not found", page);
                return Ok(false);
            }
        };
        let minified = minifier.minify_document(&content)?;
        write(&self.output_directory.join(page), &minified)?;
        log!("page"; "{} ({})", page, kib(minified.len()));
        Ok(true)
    }

    fn copy_service_worker(&self, minifier: &Minifier) -> Result<bool> {
        let name = self.service_worker;
        let src = self.source_directory.join(name);
        let script = match read_optional(&src)? {
            Some(script) => script,
            None => {
                log!("skip"; "{}: no service worker", name);
                return Ok(false);
            }
        };
        let script = match minifier.minify_script(&script) {
            Ok(minified) => minified,
            Err(failure) => {
                log!("warn"; "{}: {}; copying unminified", name, failure);
                script
            }
        };
        write(&self.output_directory.join(name), &script)?;
        log!("asset"; "{} ({})", name, kib(script.len()));
        Ok(true)
    }
}

/// Reads a file that may legitimately be absent.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(path.to_owned(), e)),
    }
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| Error::Io(path.to_owned(), e))
}

/// The result of a fallible asset operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a fatal error copying assets. Missing files are not errors.
#[derive(Debug)]
pub enum Error {
    /// A page's stylesheet couldn't be minified.
    Minify(minify::Error),

    /// An I/O error other than a missing source file.
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Minify(err) => err.fmt(f),
            Error::Io(path, err) => write!(f, "copying `{}`: {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Minify(err) => Some(err),
            Error::Io(_, err) => Some(err),
        }
    }
}

impl From<minify::Error> for Error {
    fn from(err: minify::Error) -> Error {
        Error::Minify(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minify::MinifyOptions;
    use tempfile::TempDir;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_files_are_skipped() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let src = TempDir::new()?;
        let out = TempDir::new()?;
        std::fs::write(src.path().join("index.html"), "<p>  home  </p>")?;
        std::fs::write(src.path().join("tiny.jpg"), [1u8, 2, 3])?;

        let pages = names(&["index.html", "profile.html"]);
        let assets = names(&["tiny.jpg", "favicon.ico"]);
        let copied = Assets {
            source_directory: src.path(),
            output_directory: out.path(),
            pages: &pages,
            assets: &assets,
            service_worker: "sw.js",
        }
        .copy(&Minifier::new(MinifyOptions::default()))?;

        assert_eq!(
            copied,
            Copied {
                pages: names(&["index.html"]),
                assets: names(&["tiny.jpg"]),
                service_worker: false,
            }
        );
        assert_eq!(std::fs::read(out.path().join("tiny.jpg"))?, vec![1u8, 2, 3]);
        assert!(!out.path().join("profile.html").exists());
        assert!(!out.path().join("sw.js").exists());
        let home = std::fs::read_to_string(out.path().join("index.html"))?;
        assert!(home.len() < "<p>  home  </p>".len());
        Ok(())
    }

    #[test]
    fn test_service_worker_is_minified() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let src = TempDir::new()?;
        let out = TempDir::new()?;
        let script = "self.addEventListener('install', function (event) {\n    self.skipWaiting();\n});\n";
        std::fs::write(src.path().join("sw.js"), script)?;

        let copied = Assets {
            source_directory: src.path(),
            output_directory: out.path(),
            pages: &[],
            assets: &[],
            service_worker: "sw.js",
        }
        .copy(&Minifier::new(MinifyOptions::default()))?;

        assert!(copied.service_worker);
        let written = std::fs::read_to_string(out.path().join("sw.js"))?;
        assert!(written.len() < script.len());
        Ok(())
    }

    #[test]
    fn test_broken_service_worker_is_copied_verbatim() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let src = TempDir::new()?;
        let out = TempDir::new()?;
        let script = "function (\n";
        std::fs::write(src.path().join("sw.js"), script)?;

        Assets {
            source_directory: src.path(),
            output_directory: out.path(),
            pages: &[],
            assets: &[],
            service_worker: "sw.js",
        }
        .copy(&Minifier::new(MinifyOptions::default()))?;

        assert_eq!(std::fs::read_to_string(out.path().join("sw.js"))?, script);
        Ok(())
    }
}

//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: rendering post pages
//! ([`crate::post`], [`crate::render`]), writing the manifest
//! ([`crate::manifest`]), copying pages and assets ([`crate::assets`]),
//! precompressing the output ([`crate::compress`]) and writing the cache
//! policy ([`crate::headers`]).
//!
//! The steps run strictly in order and any error aborts the build:
//!
//! ```text
//! Clean → PostsBuilt → ManifestsBuilt → AssetsCopied → Compressed → HeadersWritten → Done
//! ```
//!
//! A failure in any stage moves the build to [`Stage::Failed`].

use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assets::{self, Assets};
use crate::budget::{self, kib, PageTooLarge};
use crate::compress;
use crate::config::Config;
use crate::headers::HeaderPolicy;
use crate::log;
use crate::manifest::{self, Manifest};
use crate::minify::{self, Minifier, MinifyOptions};
use crate::post::{self, Post};
use crate::render::render_post;

/// The stages of a build, in the order they are reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Clean,
    PostsBuilt,
    ManifestsBuilt,
    AssetsCopied,
    Compressed,
    HeadersWritten,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Stage::Clean => "clean",
            Stage::PostsBuilt => "posts built",
            Stage::ManifestsBuilt => "manifests built",
            Stage::AssetsCopied => "assets copied",
            Stage::Compressed => "compressed",
            Stage::HeadersWritten => "headers written",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

/// What a successful build produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildSummary {
    pub posts: usize,
    pub chunks: usize,
    pub compressed: usize,
}

/// A post rendered and minified in memory, not yet written.
struct RenderedPost {
    post: Post,
    html: String,
}

/// Builds the site described by `config`.
pub fn build_site(config: &Config) -> Result<BuildSummary> {
    let mut stage = Stage::Clean;
    match run(config, &mut stage) {
        Ok(summary) => Ok(summary),
        Err(err) => {
            advance(stage, Stage::Failed);
            Err(err)
        }
    }
}

/// Runs every stage in order, recording in `stage` the last one completed.
fn run(config: &Config, stage: &mut Stage) -> Result<BuildSummary> {
    config
        .validate()
        .map_err(|e| Error::Config(format!("{:#}", e)))?;
    let minifier = Minifier::new(MinifyOptions::default());
    let out = &config.build_directory;

    log!("build"; "cleaning {}", out.display());
    clean(out)?;

    let rendered = render_posts(config, &minifier)?;
    write_posts(out, &rendered)?;
    *stage = advance(*stage, Stage::PostsBuilt);

    let mut posts: Vec<Post> = rendered.into_iter().map(|r| r.post).collect();
    post::sort_posts(&mut posts);
    let manifest = Manifest::build(&posts, config.chunk_size, Utc::now());
    manifest.write(&out.join("blog").join("manifests"))?;
    log!(
        "manifest";
        "{} manifest chunks ({} posts)",
        manifest.index.total_chunks,
        manifest.index.total_posts
    );
    *stage = advance(*stage, Stage::ManifestsBuilt);

    Assets {
        source_directory: &config.source_directory,
        output_directory: out,
        pages: &config.pages,
        assets: &config.assets,
        service_worker: &config.service_worker,
    }
    .copy(&minifier)?;
    *stage = advance(*stage, Stage::AssetsCopied);

    let compressed = compress::compress_tree(out, &config.compress_extensions)?;
    log!("compress"; "{} gzip artifacts", compressed);
    *stage = advance(*stage, Stage::Compressed);

    write_headers(config)?;
    *stage = advance(*stage, Stage::HeadersWritten);

    *stage = advance(*stage, Stage::Done);
    Ok(BuildSummary {
        posts: posts.len(),
        chunks: manifest.index.total_chunks,
        compressed,
    })
}

fn advance(from: Stage, to: Stage) -> Stage {
    match to {
        Stage::Failed => log!("error"; "{} → {}", from, to),
        _ => log!("stage"; "{} → {}", from, to),
    }
    to
}

/// Loads every post, renders it into the template, minifies it and checks it
/// against the page budget. Nothing is written, so a single bad post leaves no
/// post output behind.
fn render_posts(config: &Config, minifier: &Minifier) -> Result<Vec<RenderedPost>> {
    log!("blog"; "processing blog posts...");
    let template_path = config.template_path();
    let template = std::fs::read_to_string(&template_path).map_err(|err| Error::Template {
        path: template_path.clone(),
        err,
    })?;

    let posts = post::load_posts(&config.posts_directory())?;
    let mut rendered = Vec::with_capacity(posts.len());
    for post in posts {
        let html = minifier.minify_document(&render_post(&template, &post))?;
        budget::check(&post.slug, &html, config.page_budget)?;
        rendered.push(RenderedPost { post, html });
    }
    Ok(rendered)
}

fn write_posts(out: &Path, rendered: &[RenderedPost]) -> Result<()> {
    for r in rendered {
        let dir = out.join("blog").join(&r.post.slug);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("index.html"), &r.html)?;
        log!("blog"; "blog/{}/ ({})", r.post.slug, kib(r.html.len()));
    }
    Ok(())
}

fn write_headers(config: &Config) -> Result<()> {
    let policy = HeaderPolicy::for_pages(&config.pages);
    let override_path = config.source_directory.join(&config.headers_override);
    let contents = match assets::read_optional(&override_path)? {
        Some(extra) => {
            log!("headers"; "appending rules from {}", config.headers_override);
            policy.render_with_override(&extra)
        }
        None => policy.render(),
    };
    std::fs::write(config.build_directory.join("_headers"), contents)?;
    log!("headers"; "_headers ({} rules)", policy.rules.len());
    Ok(())
}

/// Removes `dir` and everything in it, then recreates it empty.
fn clean(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            })
        }
    }
    std::fs::create_dir_all(dir).map_err(|err| Error::Clean {
        path: dir.to_owned(),
        err,
    })
}

/// The result of a build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant is fatal.
#[derive(Debug)]
pub enum Error {
    /// Returned before anything is touched when the configuration is invalid.
    Config(String),

    /// Returned for errors loading posts.
    Post(post::Error),

    /// Returned when a post page is over budget.
    PageTooLarge(PageTooLarge),

    /// Returned when a stylesheet can't be minified.
    Minify(minify::Error),

    /// Returned for errors writing the manifest.
    Manifest(manifest::Error),

    /// Returned for errors copying pages and assets.
    Assets(assets::Error),

    /// Returned for errors compressing the output.
    Compress(compress::Error),

    /// Returned for I/O problems while cleaning the build directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while reading the template file.
    Template { path: PathBuf, err: std::io::Error },

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(reason) => write!(f, "Invalid configuration: {}", reason),
            Error::Post(err) => err.fmt(f),
            Error::PageTooLarge(err) => err.fmt(f),
            Error::Minify(err) => err.fmt(f),
            Error::Manifest(err) => err.fmt(f),
            Error::Assets(err) => err.fmt(f),
            Error::Compress(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Template { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(_) => None,
            Error::Post(err) => Some(err),
            Error::PageTooLarge(err) => Some(err),
            Error::Minify(err) => Some(err),
            Error::Manifest(err) => Some(err),
            Error::Assets(err) => Some(err),
            Error::Compress(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::Template { path: _, err } => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<post::Error> for Error {
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<PageTooLarge> for Error {
    fn from(err: PageTooLarge) -> Error {
        Error::PageTooLarge(err)
    }
}

impl From<minify::Error> for Error {
    fn from(err: minify::Error) -> Error {
        Error::Minify(err)
    }
}

impl From<manifest::Error> for Error {
    fn from(err: manifest::Error) -> Error {
        Error::Manifest(err)
    }
}

impl From<assets::Error> for Error {
    fn from(err: assets::Error) -> Error {
        Error::Assets(err)
    }
}

impl From<compress::Error> for Error {
    fn from(err: compress::Error) -> Error {
        Error::Compress(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let out = dir.path().join("build");

        clean(&out)?;
        assert!(out.is_dir());

        std::fs::write(out.join("stale.html"), "old")?;
        clean(&out)?;
        assert!(out.is_dir());
        assert!(!out.join("stale.html").exists());
        Ok(())
    }

    #[test]
    fn test_overlapping_directories_are_never_cleaned() -> Result<()> {
        let dir = TempDir::new()?;
        let mut config = Config::rooted_at(dir.path());
        std::fs::create_dir_all(config.posts_directory())?;
        let post = config.posts_directory().join("a.md");
        std::fs::write(&post, "---\ntitle: T\nslug: t\ndate: 2021-01-01\n---\n")?;

        config.build_directory = dir.path().join(".");
        match build_site(&config) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other),
        }
        assert!(post.exists());

        config.build_directory = config.source_directory.clone();
        assert!(matches!(build_site(&config), Err(Error::Config(_))));
        assert!(post.exists());
        Ok(())
    }

    #[test]
    fn test_missing_template() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::rooted_at(dir.path());
        std::fs::create_dir_all(config.posts_directory())?;
        match build_site(&config) {
            Err(Error::Template { path, .. }) => assert_eq!(path, config.template_path()),
            other => panic!("expected Template error, got {:?}", other),
        }
        Ok(())
    }
}

//! Project configuration. Every setting has a default matching the standard
//! site layout; a `roundtrip.yaml` file in the project directory (or any of
//! its ancestors) can override any of them.

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::budget::PAGE_BUDGET;
use crate::manifest::CHUNK_SIZE;

/// The project file name searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "roundtrip.yaml";

/// The optional project file. Every key is optional.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Project {
    source_directory: Option<PathBuf>,
    build_directory: Option<PathBuf>,
    chunk_size: Option<usize>,
    page_budget: Option<usize>,
    pages: Option<Vec<String>>,
    assets: Option<Vec<String>>,
    service_worker: Option<String>,
    headers_override: Option<String>,
    compress_extensions: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Root of the site sources.
    pub source_directory: PathBuf,

    /// Where the site is written. Deleted at the start of every build.
    pub build_directory: PathBuf,

    /// Posts per manifest chunk.
    pub chunk_size: usize,

    /// Maximum size of a post page in bytes.
    pub page_budget: usize,

    /// Top-level HTML pages, relative to `source_directory`.
    pub pages: Vec<String>,

    /// Binary assets, relative to `source_directory`.
    pub assets: Vec<String>,

    /// Optional service worker, relative to `source_directory`.
    pub service_worker: String,

    /// Optional extra `_headers` rules, relative to `source_directory`.
    pub headers_override: String,

    /// Extensions of the artifacts that get a gzip sibling.
    pub compress_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config::rooted_at(Path::new("."))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// The default configuration with relative paths resolved against `root`.
    pub fn rooted_at(root: &Path) -> Config {
        Config {
            source_directory: root.join("site"),
            build_directory: root.join("build"),
            chunk_size: CHUNK_SIZE,
            page_budget: PAGE_BUDGET,
            pages: strings(&["index.html", "profile.html", "projects.html", "blog.html"]),
            assets: strings(&["tiny.jpg", "normal.jpg", "favicon.ico"]),
            service_worker: "sw.js".to_owned(),
            headers_override: "_headers".to_owned(),
            compress_extensions: strings(&["html", "json"]),
        }
    }

    /// Directory containing the Markdown posts.
    pub fn posts_directory(&self) -> PathBuf {
        self.source_directory.join("blog")
    }

    /// The post page template.
    pub fn template_path(&self) -> PathBuf {
        self.source_directory.join("templates").join("blog-template.html")
    }

    /// Looks for [`PROJECT_FILE`] in `dir` and then in each of its ancestors.
    /// Falls back to the defaults rooted at `dir` if there is none.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(d) = current {
            let path = d.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .map_err(|e| anyhow!("Loading configuration `{}`: {:#}", path.display(), e));
            }
            current = d.parent();
        }
        let config = Config::rooted_at(dir);
        config.validate()?;
        Ok(config)
    }

    /// Loads a project file. Relative paths in it resolve against the file's
    /// directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let root = match path.parent() {
            Some(root) => root,
            None => bail!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            ),
        };
        let contents = std::fs::read_to_string(path)?;
        let project: Project = match contents.trim().is_empty() {
            true => Project::default(),
            false => serde_yaml::from_str(&contents)?,
        };

        let mut config = Config::rooted_at(root);
        if let Some(dir) = project.source_directory {
            config.source_directory = root.join(dir);
        }
        if let Some(dir) = project.build_directory {
            config.build_directory = root.join(dir);
        }
        config.chunk_size = project.chunk_size.unwrap_or(config.chunk_size);
        config.page_budget = project.page_budget.unwrap_or(config.page_budget);
        config.pages = project.pages.unwrap_or(config.pages);
        config.assets = project.assets.unwrap_or(config.assets);
        config.service_worker = project.service_worker.unwrap_or(config.service_worker);
        config.headers_override = project.headers_override.unwrap_or(config.headers_override);
        config.compress_extensions = project
            .compress_extensions
            .unwrap_or(config.compress_extensions);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be at least 1");
        }
        if self.page_budget == 0 {
            bail!("page_budget must be at least 1");
        }
        // The build directory is deleted at the start of every build, so it
        // must not contain the sources and must not live inside them.
        let source = resolve(&self.source_directory);
        let build = resolve(&self.build_directory);
        if source.starts_with(&build) {
            bail!(
                "build_directory `{}` contains source_directory `{}`",
                self.build_directory.display(),
                self.source_directory.display()
            );
        }
        if build.starts_with(&source) {
            bail!(
                "build_directory `{}` is inside source_directory `{}`",
                self.build_directory.display(),
                self.source_directory.display()
            );
        }
        Ok(())
    }
}

/// Makes `path` absolute, drops `.` and `..` components and resolves symlinks
/// in the longest prefix that exists on disk.
fn resolve(path: &Path) -> PathBuf {
    let absolute = match path.is_absolute() {
        true => path.to_owned(),
        false => match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_owned(),
        },
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }

    let mut missing: Vec<OsString> = Vec::new();
    let mut existing = lexical.as_path();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_owned());
                existing = parent;
            }
            _ => break,
        }
    }
    lexical
}

//! Defines the [`Post`] type and the logic for loading posts from the file
//! system into memory.

use std::{
    collections::HashSet,
    fmt,
    fs::read_dir,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{frontmatter, markdown};

const MARKDOWN_EXTENSION: &str = ".md";

/// Format in which post dates are displayed and serialized.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents a validated blog post.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The title of the post.
    pub title: String,

    /// The post's output directory name (`blog/{slug}/index.html`).
    pub slug: String,

    /// The date of the post. Posts are ordered by this field, newest first.
    pub date: NaiveDateTime,

    /// Optional one-line description, used in `<meta>` tags.
    pub description: String,

    /// Optional introductory paragraph shown above the body.
    pub lead: String,

    /// The tags associated with the post, in authoring order.
    pub tags: Vec<String>,

    /// Estimated minutes to read the body.
    pub read_time: u32,

    /// The rendered body HTML.
    pub body_html: String,

    /// The source file the post was parsed from.
    pub source: PathBuf,
}

impl Post {
    /// Parses a single [`Post`] from the contents of a source file. `source`
    /// is only used for error reporting.
    pub fn from_source(source: &Path, input: &str) -> Result<Post> {
        let (frontmatter, body) = frontmatter::split(input)?;
        let header = frontmatter.validate()?;

        let date = parse_date(&header.date).ok_or_else(|| Error::InvalidDate(header.date.clone()))?;
        if slug::slugify(&header.slug) != header.slug {
            return Err(Error::InvalidSlug(header.slug));
        }

        Ok(Post {
            title: header.title,
            slug: header.slug,
            date,
            description: header.description,
            lead: header.lead,
            tags: header.tags,
            read_time: markdown::read_time(markdown::word_count(body)),
            body_html: markdown::to_html(body),
            source: source.to_owned(),
        })
    }

    /// The post date as displayed on the page and in manifests.
    pub fn display_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` (or with a space separator), or
/// RFC 3339 timestamps. Timestamps with an offset are normalized to UTC.
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Searches `source_directory` for post files (extension = `.md`) and parses
/// them in lexicographic file-name order. The returned posts are in that
/// discovery order; see [`sort_posts`] for the published order. Fails on the
/// first invalid post and when two posts share a slug.
pub fn load_posts(source_directory: &Path) -> Result<Vec<Post>> {
    let mut paths = Vec::new();
    for result in read_dir(source_directory)? {
        let entry = result?;
        let os_file_name = entry.file_name();
        let file_name = os_file_name.to_string_lossy();
        if file_name.ends_with(MARKDOWN_EXTENSION) && entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut posts = Vec::with_capacity(paths.len());
    let mut seen = HashSet::new();
    for path in paths {
        let post = load_post(&path)?;
        if !seen.insert(post.slug.clone()) {
            return Err(Error::Annotated(
                path,
                Box::new(Error::DuplicateSlug(post.slug)),
            ));
        }
        posts.push(post);
    }
    Ok(posts)
}

fn load_post(path: &Path) -> Result<Post> {
    let annotate = |e: Error| Error::Annotated(path.to_owned(), Box::new(e));
    let contents = std::fs::read_to_string(path).map_err(|e| annotate(e.into()))?;
    Post::from_source(path, &contents).map_err(annotate)
}

/// Sorts posts by date, most recent first. The sort is stable: posts with the
/// same date keep their discovery order.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Represents the result of a [`Post`]-load operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the frontmatter is malformed or incomplete.
    Frontmatter(frontmatter::Error),

    /// Returned when the `date` field can't be parsed.
    InvalidDate(String),

    /// Returned when the `slug` isn't safe to use as a directory name.
    InvalidSlug(String),

    /// Returned when two posts share a slug.
    DuplicateSlug(String),

    /// Returned for I/O errors.
    Io(std::io::Error),

    /// An error annotated with the source file it occurred in.
    Annotated(PathBuf, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Frontmatter(err) => err.fmt(f),
            Error::InvalidDate(date) => write!(f, "invalid date: `{}`", date),
            Error::InvalidSlug(slug) => write!(
                f,
                "invalid slug `{}`: use lowercase letters, digits and dashes",
                slug
            ),
            Error::DuplicateSlug(slug) => write!(f, "duplicate slug: `{}`", slug),
            Error::Io(err) => err.fmt(f),
            Error::Annotated(path, err) => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Frontmatter(err) => Some(err),
            Error::InvalidDate(_) => None,
            Error::InvalidSlug(_) => None,
            Error::DuplicateSlug(_) => None,
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl Error {
    /// Strips [`Error::Annotated`] layers and returns the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Annotated(_, err) => err.root(),
            _ => self,
        }
    }
}

impl From<frontmatter::Error> for Error {
    fn from(err: frontmatter::Error) -> Error {
        Error::Frontmatter(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::Field;
    use tempfile::TempDir;

    fn source(slug: &str, date: &str) -> String {
        format!(
            "---\ntitle: Post {slug}\nslug: {slug}\ndate: {date}\ntags: [rust]\nreadTime: 99\n---\nSome words here.\n",
            slug = slug,
            date = date
        )
    }

    #[test]
    fn test_from_source() -> Result<()> {
        let post = Post::from_source(Path::new("a.md"), &source("first", "2021-04-16"))?;
        assert_eq!(post.title, "Post first");
        assert_eq!(post.display_date(), "2021-04-16");
        assert_eq!(post.tags, vec!["rust"]);
        assert_eq!(post.read_time, 1);
        assert_eq!(post.body_html, "<p>Some words here.</p>\n");
        Ok(())
    }

    #[test]
    fn test_empty_body_has_zero_read_time() -> Result<()> {
        let post = Post::from_source(
            Path::new("a.md"),
            "---\ntitle: T\nslug: t\ndate: 2021-04-16\n---\n",
        )?;
        assert_eq!(post.read_time, 0);
        Ok(())
    }

    #[test]
    fn test_parse_date_forms() {
        let midnight = NaiveDate::from_ymd_opt(2021, 4, 16)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_date("2021-04-16"), Some(midnight));
        assert_eq!(parse_date("2021-04-16T00:00:00"), Some(midnight));
        assert_eq!(parse_date("2021-04-16T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_date("2021-04-16 00:00"), Some(midnight));
        assert_eq!(parse_date("April 16th"), None);
    }

    #[test]
    fn test_invalid_date() {
        match Post::from_source(Path::new("a.md"), &source("a", "yesterday")) {
            Err(Error::InvalidDate(date)) => assert_eq!(date, "yesterday"),
            other => panic!("expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_slug() {
        for slug in &["Has Spaces", "../escape", "UPPER", "a/b"] {
            let input = format!("---\ntitle: T\nslug: \"{}\"\ndate: 2021-01-01\n---\n", slug);
            match Post::from_source(Path::new("a.md"), &input) {
                Err(Error::InvalidSlug(_)) => {}
                other => panic!("expected InvalidSlug for {:?}, got {:?}", slug, other),
            }
        }
    }

    #[test]
    fn test_missing_slug_is_reported() {
        let input = "---\ntitle: T\n---\nbody";
        match Post::from_source(Path::new("a.md"), input) {
            Err(Error::Frontmatter(frontmatter::Error::MissingRequiredField(Field::Slug))) => {}
            other => panic!("expected missing slug, got {:?}", other),
        }
    }

    #[test]
    fn test_load_posts_in_file_name_order() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("b.md"), source("bravo", "2021-01-01"))?;
        std::fs::write(dir.path().join("a.md"), source("alpha", "2021-01-01"))?;
        std::fs::write(dir.path().join("c.md"), source("charlie", "2021-01-01"))?;
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let posts = load_posts(dir.path())?;
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["alpha", "bravo", "charlie"]);
        Ok(())
    }

    #[test]
    fn test_load_posts_rejects_duplicate_slugs() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("a.md"), source("same", "2021-01-01"))?;
        std::fs::write(dir.path().join("b.md"), source("same", "2021-01-02"))?;

        match load_posts(dir.path()) {
            Err(e) => match e.root() {
                Error::DuplicateSlug(slug) => assert_eq!(slug, "same"),
                other => panic!("expected DuplicateSlug, got {:?}", other),
            },
            Ok(_) => panic!("expected an error"),
        }
        Ok(())
    }

    #[test]
    fn test_load_posts_annotates_path() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("broken.md"), "no frontmatter")?;
        let err = load_posts(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken.md"));
        assert!(matches!(
            err.root(),
            Error::Frontmatter(frontmatter::Error::MalformedDocument(_))
        ));
        Ok(())
    }

    #[test]
    fn test_sort_posts_is_stable_and_descending() -> Result<()> {
        let mut posts = vec![
            Post::from_source(Path::new("a.md"), &source("a", "2021-01-01"))?,
            Post::from_source(Path::new("b.md"), &source("b", "2021-03-01"))?,
            Post::from_source(Path::new("c.md"), &source("c", "2021-01-01"))?,
            Post::from_source(Path::new("d.md"), &source("d", "2021-03-01"))?,
        ];
        sort_posts(&mut posts);
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "d", "a", "c"]);
        Ok(())
    }
}

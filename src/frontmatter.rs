//! Splits post source files into their YAML frontmatter and Markdown body,
//! and validates the frontmatter fields every post must carry.

use serde::Deserialize;
use std::fmt;

const FENCE: &str = "---";

/// The frontmatter exactly as the author wrote it. Every field is optional at
/// this stage; see [`Frontmatter::validate`] for the required ones.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub lead: Option<String>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Frontmatter whose required fields are known to be present and non-empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub title: String,
    pub slug: String,
    pub date: String,
    pub description: String,
    pub lead: String,
    pub tags: Vec<String>,
}

impl Frontmatter {
    /// Checks the required fields in the order `title`, `slug`, `date` and
    /// reports the first one that is absent or empty.
    pub fn validate(self) -> Result<Header> {
        fn required(value: Option<String>, field: Field) -> Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(Error::MissingRequiredField(field)),
            }
        }

        Ok(Header {
            title: required(self.title, Field::Title)?,
            slug: required(self.slug, Field::Slug)?,
            date: required(self.date, Field::Date)?,
            description: self.description.unwrap_or_default(),
            lead: self.lead.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
        })
    }
}

/// Splits `input` into its parsed frontmatter and the remaining body text. The
/// input must be structured as follows:
///
/// 1. Opening fence line (`---`)
/// 2. YAML frontmatter
/// 3. Closing fence line (`---`)
/// 4. Markdown body, returned verbatim
pub fn split(input: &str) -> Result<(Frontmatter, &str)> {
    let (yaml_start, yaml_stop, body_start) = fence_indices(input)?;
    let yaml = &input[yaml_start..yaml_stop];
    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((frontmatter, &input[body_start..]))
}

/// Returns `(yaml_start, yaml_stop, body_start)` byte offsets into `input`.
fn fence_indices(input: &str) -> Result<(usize, usize, usize)> {
    let start = if input.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };

    let mut lines = LineOffsets::new(input, start);
    match lines.next() {
        Some((_, line, _)) if is_fence(line) => {}
        _ => return Err(Error::MalformedDocument("document must begin with `---`")),
    }

    let yaml_start = match lines.peek_offset() {
        Some(offset) => offset,
        None => return Err(Error::MalformedDocument("missing closing `---`")),
    };

    for (line_start, line, next_start) in lines {
        if is_fence(line) {
            return Ok((yaml_start, line_start, next_start));
        }
    }
    Err(Error::MalformedDocument("missing closing `---`"))
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == FENCE
}

/// Iterates over the lines of a string as `(line_start, line, next_start)`,
/// where `line` excludes its terminating newline.
struct LineOffsets<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> LineOffsets<'a> {
    fn new(input: &'a str, offset: usize) -> Self {
        LineOffsets { input, offset }
    }

    fn peek_offset(&self) -> Option<usize> {
        match self.offset < self.input.len() {
            true => Some(self.offset),
            false => None,
        }
    }
}

impl<'a> Iterator for LineOffsets<'a> {
    type Item = (usize, &'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.peek_offset()?;
        let rest = &self.input[start..];
        let (line, next) = match rest.find('\n') {
            Some(i) => (&rest[..i], start + i + 1),
            None => (rest, self.input.len()),
        };
        self.offset = next;
        Some((start, line, next))
    }
}

/// The frontmatter fields every post must define.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Slug,
    Date,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "title",
            Field::Slug => "slug",
            Field::Date => "date",
        })
    }
}

/// Represents the result of a frontmatter operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error splitting or validating frontmatter.
#[derive(Debug)]
pub enum Error {
    /// Returned when the opening or closing fence is missing.
    MalformedDocument(&'static str),

    /// Returned when a required field is absent or empty.
    MissingRequiredField(Field),

    /// Returned when the frontmatter is not valid YAML.
    Yaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedDocument(reason) => {
                write!(f, "malformed document: {}", reason)
            }
            Error::MissingRequiredField(field) => {
                write!(f, "missing required field: {}", field)
            }
            Error::Yaml(err) => write!(f, "invalid frontmatter: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedDocument(_) => None,
            Error::MissingRequiredField(_) => None,
            Error::Yaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

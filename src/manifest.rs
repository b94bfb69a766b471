//! Builds the paginated JSON manifest that the blog index page loads.
//!
//! The sorted posts are cut into fixed-size chunks written as
//! `chunk_1.json`, `chunk_2.json`, etc. Every chunk carries the totals, so a
//! client holding any single chunk knows where it sits in the whole. An
//! `index.json` summary records the same totals plus the build time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::post::Post;

/// Default number of posts per chunk.
pub const CHUNK_SIZE: usize = 5;

/// A post without its body, as listed on index pages.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub title: String,
    pub slug: String,
    pub date: String,
    pub description: String,
    pub lead: String,
    pub tags: Vec<String>,
    pub read_time: u32,
}

impl From<&Post> for PostSummary {
    fn from(p: &Post) -> PostSummary {
        PostSummary {
            title: p.title.clone(),
            slug: p.slug.clone(),
            date: p.display_date(),
            description: p.description.clone(),
            lead: p.lead.clone(),
            tags: p.tags.clone(),
            read_time: p.read_time,
        }
    }
}

/// One page of the manifest.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    #[serde(rename = "chunk")]
    pub chunk_number: usize,
    pub total_chunks: usize,
    pub posts: Vec<PostSummary>,
    pub total_posts: usize,
}

/// The manifest summary written to `index.json`.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub total_posts: usize,
    pub total_chunks: usize,
    pub posts_per_chunk: usize,
    pub last_updated: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    pub chunks: Vec<Chunk>,
    pub index: IndexSummary,
}

impl Manifest {
    /// Partitions `posts`, which must already be in published order, into
    /// chunks of `chunk_size`. Panics if `chunk_size` is zero; configuration
    /// validation rules that out.
    pub fn build(posts: &[Post], chunk_size: usize, now: DateTime<Utc>) -> Manifest {
        assert!(chunk_size > 0, "chunk size must be positive");
        let total_posts = posts.len();
        let total_chunks = total_chunks(total_posts, chunk_size);

        let chunks = posts
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, chunk)| Chunk {
                chunk_number: i + 1,
                total_chunks,
                posts: chunk.iter().map(PostSummary::from).collect(),
                total_posts,
            })
            .collect();

        Manifest {
            chunks,
            index: IndexSummary {
                total_posts,
                total_chunks,
                posts_per_chunk: chunk_size,
                last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }

    /// Writes `chunk_<N>.json` for every chunk and `index.json` into
    /// `directory`, creating it if needed.
    pub fn write(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory).map_err(|e| Error::Io(directory.to_owned(), e))?;
        for chunk in &self.chunks {
            write_json(&directory.join(chunk_file_name(chunk.chunk_number)), chunk)?;
        }
        write_json(&directory.join("index.json"), &self.index)
    }
}

/// `ceil(total_posts / chunk_size)`
pub fn total_chunks(total_posts: usize, chunk_size: usize) -> usize {
    match total_posts % chunk_size {
        0 => total_posts / chunk_size,
        _ => total_posts / chunk_size + 1,
    }
}

pub fn chunk_file_name(chunk_number: usize) -> String {
    format!("chunk_{}.json", chunk_number)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json).map_err(|e| Error::Io(path.to_owned(), e))
}

/// The result of a fallible manifest-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing the manifest.
#[derive(Debug)]
pub enum Error {
    /// An error serializing a chunk or the summary.
    Json(serde_json::Error),

    /// An error writing a manifest file.
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Json(err) => err.fmt(f),
            Error::Io(path, err) => {
                write!(f, "writing manifest `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::Io(_, err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

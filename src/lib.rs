//! The library code for the `roundtrip` static blog builder. Every post page
//! it emits is checked to fit in roughly one TCP congestion window (14 KiB),
//! so a first visit renders after a single round trip.
//!
//! A build ([`crate::build`]) runs these steps in order:
//!
//! 1. Parsing posts from Markdown files with a YAML header
//!    ([`crate::frontmatter`], [`crate::post`], [`crate::markdown`])
//! 2. Rendering each post into the page template ([`crate::render`]),
//!    minifying it ([`crate::minify`]) and checking its size
//!    ([`crate::budget`])
//! 3. Writing the paginated JSON manifest the blog index loads
//!    ([`crate::manifest`])
//! 4. Copying the top-level pages and static assets ([`crate::assets`])
//! 5. Writing a gzip sibling for every text artifact ([`crate::compress`])
//! 6. Writing the `_headers` cache policy ([`crate::headers`])
//!
//! Posts are all rendered and checked before any of them is written, so an
//! oversized or invalid post leaves no post pages behind.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod assets;
pub mod budget;
pub mod build;
pub mod compress;
pub mod config;
pub mod frontmatter;
pub mod headers;
pub mod log;
pub mod manifest;
pub mod markdown;
pub mod minify;
pub mod post;
pub mod render;

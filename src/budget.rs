//! The per-page byte budget. A page no larger than the initial congestion
//! window of a fresh TCP connection (10 segments, about 14 KiB) can be served
//! in a single round trip.

use std::fmt;

/// Default budget in bytes.
pub const PAGE_BUDGET: usize = 14 * 1024;

/// Fails when the UTF-8 length of `document` is strictly greater than
/// `budget` bytes. A document of exactly `budget` bytes passes.
pub fn check(slug: &str, document: &str, budget: usize) -> Result<(), PageTooLarge> {
    let size = document.len();
    if size > budget {
        return Err(PageTooLarge {
            slug: slug.to_owned(),
            size,
            budget,
        });
    }
    Ok(())
}

/// Size in KiB with one decimal, for log lines.
pub fn kib(bytes: usize) -> String {
    format!("{:.1}KB", bytes as f64 / 1024.0)
}

/// Returned when a rendered page exceeds its byte budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTooLarge {
    pub slug: String,
    pub size: usize,
    pub budget: usize,
}

impl fmt::Display for PageTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "post `{}` is {} bytes ({}), over the {} byte budget; it can't be delivered in an initial TCP round trip",
            self.slug,
            self.size,
            kib(self.size),
            self.budget
        )
    }
}

impl std::error::Error for PageTooLarge {}

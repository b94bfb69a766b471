//! Adapter over [`pulldown_cmark`]: renders post bodies to HTML and estimates
//! how long they take to read.

use pulldown_cmark::{html, Event, Options, Parser, Tag};

/// Reading speed used for the read-time estimate.
pub const WORDS_PER_MINUTE: usize = 220;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Converts markdown to HTML. The output is trusted and is never escaped again
/// downstream.
pub fn to_html(markdown: &str) -> String {
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, Parser::new_ext(markdown, options()));
    body
}

/// Counts the words a reader sees: the text content of the rendered markdown,
/// split on whitespace. Block boundaries and line breaks separate words;
/// inline markup (emphasis, links) does not.
pub fn word_count(markdown: &str) -> usize {
    let mut text = String::with_capacity(markdown.len());
    for ev in Parser::new_ext(markdown, options()) {
        match ev {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak | Event::Rule => text.push(' '),
            Event::End(
                Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link(..) | Tag::Image(..),
            ) => {}
            Event::End(_) => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().count()
}

/// Minutes needed to read `words` words, rounded up.
pub fn read_time(words: usize) -> u32 {
    ((words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE) as u32
}

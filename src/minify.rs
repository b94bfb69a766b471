//! Minification of HTML documents and their embedded styles and scripts.
//!
//! A document goes through three passes, in this order:
//!
//! 1. every `<style>` block through a [`CssMinifier`],
//! 2. every non-empty `<script>` block through a [`JsMinifier`],
//! 3. the names in every `class` attribute sorted,
//! 4. the whole document through `minify-html`, with its own CSS/JS handling
//!    switched off so nothing is minified twice. It also sorts attributes.
//!
//! A script that fails to minify is logged and left as written; a stylesheet
//! that fails to minify aborts the document.

use lightningcss::stylesheet::{MinifyOptions as CssOptions, ParserOptions, PrinterOptions, StyleSheet};
use regex::{Captures, Regex};
use std::convert::Infallible;
use std::fmt;

/// Something that can minify a standalone stylesheet.
pub trait CssMinifier {
    fn minify_css(&self, css: &str) -> std::result::Result<String, String>;
}

/// Something that can minify a standalone script.
pub trait JsMinifier {
    fn minify_js(&self, js: &str) -> std::result::Result<String, String>;
}

/// [`CssMinifier`] backed by `lightningcss`.
pub struct LightningCss;

impl CssMinifier for LightningCss {
    fn minify_css(&self, css: &str) -> std::result::Result<String, String> {
        let mut sheet =
            StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
        sheet
            .minify(CssOptions::default())
            .map_err(|e| e.to_string())?;
        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| e.to_string())?;
        Ok(printed.code)
    }
}

/// [`JsMinifier`] backed by `minify-js`.
pub struct MinifyJs;

impl JsMinifier for MinifyJs {
    fn minify_js(&self, js: &str) -> std::result::Result<String, String> {
        let session = minify_js::Session::new();
        let mut out = Vec::with_capacity(js.len());
        minify_js::minify(
            &session,
            minify_js::TopLevelMode::Global,
            js.as_bytes(),
            &mut out,
        )
        .map_err(|e| format!("{:?}", e))?;
        String::from_utf8(out).map_err(|e| e.to_string())
    }
}

/// Switches for the minifier. Passed explicitly to every [`Minifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinifyOptions {
    /// Minify `<style>` blocks.
    pub css: bool,

    /// Minify `<script>` blocks.
    pub js: bool,

    /// Keep HTML comments.
    pub keep_comments: bool,

    /// Keep optional closing tags and the `<html>`/`<head>` opening tags.
    pub keep_optional_tags: bool,

    /// Sort the names inside `class` attributes, so equal class sets read the
    /// same and compress together.
    pub sort_class_names: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        MinifyOptions {
            css: true,
            js: true,
            keep_comments: false,
            keep_optional_tags: false,
            sort_class_names: true,
        }
    }
}

/// Minifies documents using explicit [`MinifyOptions`] and pluggable CSS and
/// JS engines.
pub struct Minifier {
    options: MinifyOptions,
    css: Box<dyn CssMinifier>,
    js: Box<dyn JsMinifier>,
    html: minify_html::Cfg,
    style_block: Regex,
    script_block: Regex,
    tag_or_raw_block: Regex,
    class_attribute: Regex,
}

impl Minifier {
    /// Creates a minifier using `lightningcss` and `minify-js`.
    pub fn new(options: MinifyOptions) -> Minifier {
        Minifier::with_engines(options, Box::new(LightningCss), Box::new(MinifyJs))
    }

    pub fn with_engines(
        options: MinifyOptions,
        css: Box<dyn CssMinifier>,
        js: Box<dyn JsMinifier>,
    ) -> Minifier {
        let mut html = minify_html::Cfg::new();
        html.keep_closing_tags = options.keep_optional_tags;
        html.keep_html_and_head_opening_tags = options.keep_optional_tags;
        html.keep_comments = options.keep_comments;
        html.minify_css = false;
        html.minify_js = false;
        html.remove_bangs = true;
        html.remove_processing_instructions = true;

        Minifier {
            options,
            css,
            js,
            html,
            style_block: Regex::new(r"(?is)<style([^>]*)>(.*?)</style>").unwrap(),
            script_block: Regex::new(r"(?is)<script([^>]*)>(.*?)</script>").unwrap(),
            tag_or_raw_block: Regex::new(
                r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>|<[a-z][a-z0-9-]*\s[^>]*>",
            )
            .unwrap(),
            class_attribute: Regex::new(r#"(?i)(\sclass\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap(),
        }
    }

    /// Runs the CSS, JS and HTML passes over `html`.
    pub fn minify_document(&self, html: &str) -> Result<String> {
        let mut document = html.to_owned();
        if self.options.css {
            document = self.minify_styles(&document)?;
        }
        if self.options.js {
            document = self.minify_scripts(&document);
        }
        if self.options.sort_class_names {
            document = self.sort_class_names(&document);
        }
        let minified = minify_html::minify(document.as_bytes(), &self.html);
        Ok(String::from_utf8_lossy(&minified).into_owned())
    }

    /// Minifies a standalone script, such as a service worker.
    pub fn minify_script(&self, js: &str) -> std::result::Result<String, ScriptMinifyFailure> {
        self.js
            .minify_js(js)
            .map_err(|reason| ScriptMinifyFailure { reason })
    }

    fn minify_styles(&self, html: &str) -> Result<String> {
        replace_block_bodies(&self.style_block, html, |_, css| {
            if css.trim().is_empty() {
                return Ok(None);
            }
            self.css.minify_css(css).map(Some).map_err(Error::Css)
        })
    }

    fn minify_scripts(&self, html: &str) -> String {
        let replaced = replace_block_bodies(&self.script_block, html, |attrs, js| {
            if js.trim().is_empty() || !is_javascript(attrs) {
                return Ok::<_, Infallible>(None);
            }
            match self.minify_script(js) {
                Ok(minified) => Ok(Some(minified)),
                Err(failure) => {
                    crate::log!("warn"; "{}; keeping original script", failure);
                    Ok(None)
                }
            }
        });
        match replaced {
            Ok(document) => document,
            Err(never) => match never {},
        }
    }

    /// Sorts the names in the `class` attribute of every start tag. The raw
    /// text of `<script>` and `<style>` blocks is copied unchanged.
    fn sort_class_names(&self, html: &str) -> String {
        self.tag_or_raw_block
            .replace_all(html, |tag: &Captures| {
                let tag = &tag[0];
                let lower = tag.to_ascii_lowercase();
                if lower.starts_with("<script") || lower.starts_with("<style") {
                    if let Some(end) = tag.find('>') {
                        let (open, rest) = tag.split_at(end + 1);
                        return format!("{}{}", self.sort_classes_in_tag(open), rest);
                    }
                }
                self.sort_classes_in_tag(tag)
            })
            .into_owned()
    }

    fn sort_classes_in_tag(&self, tag: &str) -> String {
        self.class_attribute
            .replace_all(tag, |caps: &Captures| {
                let (quote, names) = match (caps.get(2), caps.get(3)) {
                    (Some(names), _) => ('"', names.as_str()),
                    (_, Some(names)) => ('\'', names.as_str()),
                    _ => return caps[0].to_owned(),
                };
                format!("{}{}{}{}", &caps[1], quote, sorted_class_list(names), quote)
            })
            .into_owned()
    }
}

/// `"b a  c"` → `"a b c"`.
fn sorted_class_list(names: &str) -> String {
    let mut names: Vec<&str> = names.split_whitespace().collect();
    names.sort_unstable();
    names.join(" ")
}

/// Whether a `<script>` tag's attributes describe JavaScript. Data blocks such
/// as `application/ld+json` are left alone.
fn is_javascript(attrs: &str) -> bool {
    let attrs = attrs.to_ascii_lowercase();
    match attrs.find("type=") {
        None => true,
        Some(i) => {
            let value = attrs[i + 5..].trim_start_matches(|c| c == '"' || c == '\'');
            value.starts_with("text/javascript")
                || value.starts_with("module")
                || value.starts_with("application/javascript")
        }
    }
}

/// Replaces the body (capture group 2) of every match of `re` with whatever
/// `f` returns for it. `f` receives the tag attributes (group 1) and the body;
/// returning `None` keeps the body unchanged.
fn replace_block_bodies<E, F>(re: &Regex, html: &str, mut f: F) -> std::result::Result<String, E>
where
    F: FnMut(&str, &str) -> std::result::Result<Option<String>, E>,
{
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for caps in re.captures_iter(html) {
        let (attrs, body) = match (caps.get(1), caps.get(2)) {
            (Some(attrs), Some(body)) => (attrs, body),
            _ => continue,
        };
        if let Some(replacement) = f(attrs.as_str(), body.as_str())? {
            out.push_str(&html[last..body.start()]);
            out.push_str(&replacement);
            last = body.end();
        }
    }
    out.push_str(&html[last..]);
    Ok(out)
}

/// A script that couldn't be minified. Recoverable: the caller keeps the
/// original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptMinifyFailure {
    pub reason: String,
}

impl fmt::Display for ScriptMinifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "JS minify failed: {}", self.reason)
    }
}

impl std::error::Error for ScriptMinifyFailure {}

/// The result of a fallible minification.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a fatal minification error.
#[derive(Debug)]
pub enum Error {
    /// A stylesheet couldn't be minified.
    Css(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Css(reason) => write!(f, "CSS minify failed: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

//! Renders [`Post`]s into complete HTML documents by substituting
//! `{{placeholder}}` tokens in the post template.

use std::collections::HashMap;

use crate::post::Post;

/// The placeholders a post template may use. Any other `{{...}}` text is
/// copied to the output as written.
pub const PLACEHOLDERS: &[&str] = &[
    "title",
    "description",
    "date",
    "readTime",
    "tags",
    "lead",
    "content",
];

/// Escapes the five HTML-reserved characters. This is a single pass, so the
/// `&` of an entity produced here is never escaped a second time.
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders one `<span class="tag">` marker per tag.
pub fn tags_html(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!(r#"<span class="tag">{}</span>"#, escape_html(tag)))
        .collect()
}

/// A mapping of placeholder names to substitution values. Values are stored
/// exactly as they will appear in the output; use [`Substitutions::text`] for
/// values that need escaping and [`Substitutions::raw`] for trusted markup.
#[derive(Debug, Default)]
pub struct Substitutions {
    values: HashMap<&'static str, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to the HTML-escaped `value`.
    pub fn text(mut self, key: &'static str, value: &str) -> Self {
        self.values.insert(key, escape_html(value));
        self
    }

    /// Sets `key` to `value` verbatim.
    pub fn raw(mut self, key: &'static str, value: String) -> Self {
        self.values.insert(key, value);
        self
    }

    /// Builds the substitutions for a post page.
    pub fn for_post(post: &Post) -> Self {
        Self::new()
            .text("title", &post.title)
            .text("description", &post.description)
            .text("date", &post.display_date())
            .text("readTime", &post.read_time.to_string())
            .raw("tags", tags_html(&post.tags))
            .text("lead", &post.lead)
            .raw("content", post.body_html.clone())
    }

    /// Replaces every `{{key}}` in `template` in a single left-to-right scan.
    /// Known [`PLACEHOLDERS`] without a value become the empty string. Every
    /// other token is copied through untouched, and substituted values are
    /// never scanned again.
    pub fn apply(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + self.len_hint());
        let mut rest = template;
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            match after_open.find("}}") {
                Some(close) if PLACEHOLDERS.contains(&&after_open[..close]) => {
                    if let Some(value) = self.values.get(&after_open[..close]) {
                        out.push_str(value);
                    }
                    rest = &after_open[close + 2..];
                }
                _ => {
                    out.push_str("{{");
                    rest = after_open;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn len_hint(&self) -> usize {
        self.values.values().map(String::len).sum()
    }
}

/// Renders `post` into `template`.
pub fn render_post(template: &str, post: &Post) -> String {
    Substitutions::for_post(post).apply(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_escape_html_all_reserved() {
        assert_eq!(escape_html(r#"&"'<>"#), "&amp;&quot;&#39;&lt;&gt;");
    }

    #[test]
    fn test_escape_html_leaves_no_reserved_characters() {
        let escaped = escape_html(r#"Tom & "Jerry" <b>'s</b> &lt;"#);
        for c in &['"', '\'', '<', '>'] {
            assert!(!escaped.contains(*c), "found {:?} in {}", c, escaped);
        }
        assert_eq!(
            escaped,
            "Tom &amp; &quot;Jerry&quot; &lt;b&gt;&#39;s&lt;/b&gt; &amp;lt;"
        );
    }

    #[test]
    fn test_tags_html() {
        let tags = vec!["rust".to_owned(), "<web>".to_owned()];
        assert_eq!(
            tags_html(&tags),
            r#"<span class="tag">rust</span><span class="tag">&lt;web&gt;</span>"#
        );
        assert_eq!(tags_html(&[]), "");
    }

    #[test]
    fn test_apply_replaces_every_occurrence() {
        let subs = Substitutions::new().text("title", "Hi");
        assert_eq!(subs.apply("{{title}} and {{title}}"), "Hi and Hi");
    }

    #[test]
    fn test_apply_missing_key_is_empty() {
        let subs = Substitutions::new();
        assert_eq!(subs.apply("<p>{{lead}}</p>"), "<p></p>");
    }

    #[test]
    fn test_apply_keeps_unknown_placeholders() {
        let subs = Substitutions::new().text("title", "T");
        assert_eq!(
            subs.apply("<p>{{title}}</p><script>var t='{{user}}'</script>"),
            "<p>T</p><script>var t='{{user}}'</script>"
        );
    }

    #[test]
    fn test_apply_does_not_rescan_values() {
        let subs = Substitutions::new()
            .text("title", "{{content}}")
            .raw("content", "BODY".to_owned());
        assert_eq!(subs.apply("{{title}}|{{content}}"), "{{content}}|BODY");
    }

    #[test]
    fn test_apply_leaves_non_placeholders() {
        let subs = Substitutions::new().text("title", "T");
        assert_eq!(subs.apply("a {{ b {{title}} }} {{"), "a {{ b T }} {{");
    }

    #[test]
    fn test_render_post() {
        let post = Post::from_source(
            Path::new("a.md"),
            "---\ntitle: Cats & Dogs\nslug: cats\ndate: 2021-04-16\ndescription: \"<b>\"\ntags: [a, b]\n---\nHello <em>there</em>\n",
        )
        .unwrap();
        let template = "<title>{{title}}</title><meta content=\"{{description}}\">\
                        <time>{{date}}</time>{{readTime}}|{{tags}}|{{lead}}|{{content}}|{{title}}";
        assert_eq!(
            render_post(template, &post),
            "<title>Cats &amp; Dogs</title><meta content=\"&lt;b&gt;\">\
             <time>2021-04-16</time>1|<span class=\"tag\">a</span><span class=\"tag\">b</span>||\
             <p>Hello <em>there</em></p>\n|Cats &amp; Dogs"
        );
    }
}

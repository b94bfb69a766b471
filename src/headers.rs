//! Generates the `_headers` file: URL path patterns mapped to the cache and
//! security headers the hosting edge attaches to responses.

const ONE_YEAR: &str = "public, max-age=31536000";
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const NO_CACHE: &str = "no-cache";
/// Five minutes in browsers, fifteen at the edge.
const MANIFEST_CACHE: &str = "public, max-age=300, s-maxage=900";

/// Post pages only. A `:slug` placeholder matches a single path segment, so
/// these never match anything under `/blog/manifests/`.
const POST_PATTERNS: &[&str] = &["/blog/:slug/", "/blog/:slug/index.html"];

const IMAGE_PATTERNS: &[&str] = &[
    "/*.jpg", "/*.jpeg", "/*.png", "/*.webp", "/*.avif", "/*.svg", "/*.ico",
];

/// A URL path pattern and the headers attached to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub headers: Vec<(String, String)>,
}

impl Rule {
    fn new(pattern: &str) -> Self {
        Rule {
            pattern: pattern.to_owned(),
            headers: Vec::new(),
        }
    }

    fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    fn cache(self, value: &str) -> Self {
        self.header("Cache-Control", value)
    }
}

/// The ordered rule set written to `_headers`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub rules: Vec<Rule>,
}

impl HeaderPolicy {
    /// The site's fixed rule set. `pages` are the top-level page file names;
    /// the home page hints the browser to prefetch every page other than
    /// `index.html`.
    pub fn for_pages(pages: &[String]) -> HeaderPolicy {
        let prefetch = pages
            .iter()
            .filter(|page| page.as_str() != "index.html")
            .map(|page| format!("</{}>; rel=prefetch", page))
            .collect::<Vec<_>>()
            .join(", ");

        let home = |pattern: &str| {
            let rule = Rule::new(pattern).cache(IMMUTABLE);
            match prefetch.is_empty() {
                true => rule,
                false => rule.header("Link", &prefetch),
            }
        };

        let mut rules = vec![
            Rule::new("/*")
                .header("X-Content-Type-Options", "nosniff")
                .header("X-Frame-Options", "DENY")
                .header(
                    "Strict-Transport-Security",
                    "max-age=31536000; includeSubDomains; preload",
                )
                .header("Referrer-Policy", "strict-origin-when-cross-origin")
                .header(
                    "Permissions-Policy",
                    "camera=(), microphone=(), geolocation=()",
                ),
            home("/"),
            home("/index.html"),
            Rule::new("/blog.html").cache(NO_CACHE),
            Rule::new("/blog/manifests/*").cache(MANIFEST_CACHE),
        ];
        rules.extend(POST_PATTERNS.iter().map(|p| Rule::new(p).cache(ONE_YEAR)));
        rules.extend(IMAGE_PATTERNS.iter().map(|p| Rule::new(p).cache(IMMUTABLE)));
        rules.push(Rule::new("/sw.js").cache(NO_CACHE));

        HeaderPolicy { rules }
    }

    /// Renders the policy in `_headers` syntax: the pattern on its own line,
    /// each header indented below it, rules separated by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&rule.pattern);
            out.push('\n');
            for (name, value) in &rule.headers {
                out.push_str(&format!("  {}: {}\n", name, value));
            }
        }
        out
    }

    /// Renders the policy followed by site-specific rules from an override
    /// file.
    pub fn render_with_override(&self, extra: &str) -> String {
        let mut out = self.render();
        if !extra.trim().is_empty() {
            out.push('\n');
            out.push_str(extra.trim_end());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Vec<String> {
        ["index.html", "profile.html", "projects.html", "blog.html"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn rule<'a>(policy: &'a HeaderPolicy, pattern: &str) -> &'a Rule {
        policy
            .rules
            .iter()
            .find(|r| r.pattern == pattern)
            .unwrap_or_else(|| panic!("no rule for {}", pattern))
    }

    fn header<'a>(rule: &'a Rule, name: &str) -> Option<&'a str> {
        rule.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_security_headers_apply_globally() {
        let policy = HeaderPolicy::for_pages(&pages());
        let global = rule(&policy, "/*");
        assert_eq!(header(global, "X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(header(global, "X-Frame-Options"), Some("DENY"));
        assert!(header(global, "Strict-Transport-Security").is_some());
        assert!(header(global, "Referrer-Policy").is_some());
        assert!(header(global, "Permissions-Policy").is_some());
    }

    #[test]
    fn test_home_prefetches_other_pages() {
        let policy = HeaderPolicy::for_pages(&pages());
        for pattern in &["/", "/index.html"] {
            let home = rule(&policy, pattern);
            assert_eq!(header(home, "Cache-Control"), Some(IMMUTABLE));
            assert_eq!(
                header(home, "Link"),
                Some("</profile.html>; rel=prefetch, </projects.html>; rel=prefetch, </blog.html>; rel=prefetch")
            );
        }
    }

    #[test]
    fn test_cache_rules() {
        let policy = HeaderPolicy::for_pages(&pages());
        let cache = |pattern: &str| header(rule(&policy, pattern), "Cache-Control");
        assert_eq!(cache("/blog.html"), Some("no-cache"));
        assert_eq!(cache("/blog/manifests/*"), Some("public, max-age=300, s-maxage=900"));
        assert_eq!(cache("/blog/:slug/"), Some("public, max-age=31536000"));
        assert_eq!(cache("/blog/:slug/index.html"), Some("public, max-age=31536000"));
        assert!(policy.rules.iter().all(|r| r.pattern != "/blog/*"));
        assert_eq!(cache("/*.jpg"), Some(IMMUTABLE));
        assert_eq!(cache("/*.ico"), Some(IMMUTABLE));
        assert_eq!(cache("/sw.js"), Some("no-cache"));
    }

    /// Matches a URL path against a `_headers` pattern: `*` matches any run of
    /// characters, `:name` matches one path segment.
    fn matches(pattern: &str, path: &str) -> bool {
        fn go(pattern: &[u8], path: &[u8]) -> bool {
            match pattern.split_first() {
                None => path.is_empty(),
                Some((&b'*', rest)) => (0..=path.len()).any(|i| go(rest, &path[i..])),
                Some((&b':', rest)) => {
                    let name = rest
                        .iter()
                        .position(|c| !c.is_ascii_alphanumeric() && *c != b'_')
                        .unwrap_or(rest.len());
                    let segment = path.iter().position(|c| *c == b'/').unwrap_or(path.len());
                    segment > 0 && go(&rest[name..], &path[segment..])
                }
                Some((c, rest)) => path.first() == Some(c) && go(rest, &path[1..]),
            }
        }
        go(pattern.as_bytes(), path.as_bytes())
    }

    #[test]
    fn test_matches() {
        assert!(matches("/blog/*", "/blog/manifests/chunk_1.json"));
        assert!(matches("/blog/:slug/", "/blog/hello-world/"));
        assert!(!matches("/blog/:slug/index.html", "/blog/manifests/chunk_1.json"));
        assert!(matches("/*.jpg", "/tiny.jpg"));
    }

    #[test]
    fn test_manifests_get_only_the_short_cache() {
        let policy = HeaderPolicy::for_pages(&pages());
        let cache_rules = |path: &str| {
            policy
                .rules
                .iter()
                .filter(|r| matches(&r.pattern, path))
                .filter_map(|r| header(r, "Cache-Control"))
                .collect::<Vec<_>>()
        };
        for path in &["/blog/manifests/chunk_1.json", "/blog/manifests/index.json"] {
            assert_eq!(cache_rules(path), vec![MANIFEST_CACHE], "{}", path);
        }
        for path in &["/blog/hello-world/", "/blog/hello-world/index.html"] {
            assert_eq!(cache_rules(path), vec![ONE_YEAR], "{}", path);
        }
    }

    #[test]
    fn test_render_format() {
        let policy = HeaderPolicy {
            rules: vec![
                Rule::new("/a").cache("no-cache"),
                Rule::new("/b").header("X-One", "1").header("X-Two", "2"),
            ],
        };
        assert_eq!(
            policy.render(),
            "/a\n  Cache-Control: no-cache\n\n/b\n  X-One: 1\n  X-Two: 2\n"
        );
    }

    #[test]
    fn test_render_with_override() {
        let policy = HeaderPolicy {
            rules: vec![Rule::new("/a").cache("no-cache")],
        };
        assert_eq!(
            policy.render_with_override("/extra\n  X-Extra: yes\n\n"),
            "/a\n  Cache-Control: no-cache\n\n/extra\n  X-Extra: yes\n"
        );
        assert_eq!(policy.render_with_override("  \n"), policy.render());
    }
}

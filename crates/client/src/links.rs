//! Link harvesting from content bodies.

use regex::Regex;

/// Default pattern: the value of any `href` or `src` attribute.
pub const DEFAULT_LINK_PATTERN: &str = r#"(?i)\b(href|src)\s*=\s*["']([^"']+)["']"#;

/// A compiled link-matching pattern.
///
/// The link is taken from the capture group named `link` when the pattern
/// has one, otherwise from the last capture group, otherwise from the whole
/// match.
#[derive(Debug, Clone)]
pub struct LinkPattern {
    regex: Regex,
}

impl LinkPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { regex: Regex::new(pattern)? })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Links found in `content`, in order of first appearance, without
    /// duplicates.
    pub fn extract_links<'a>(&self, content: &'a str) -> Vec<&'a str> {
        let mut links: Vec<&str> = Vec::new();
        for captures in self.regex.captures_iter(content) {
            let Some(link) = captures
                .name("link")
                .or_else(|| captures.iter().skip(1).flatten().last())
                .or_else(|| captures.get(0))
            else {
                continue;
            };

            let link = link.as_str();
            if !link.is_empty() && !links.contains(&link) {
                links.push(link);
            }
        }
        links
    }
}

impl Default for LinkPattern {
    fn default() -> Self {
        Self { regex: Regex::new(DEFAULT_LINK_PATTERN).expect("default link pattern is valid") }
    }
}

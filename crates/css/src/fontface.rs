use crate::declaration::Declarations;
use crate::stylesheet::AtRule;
use std::collections::BTreeMap;

/// Everything one `@font-face` rule says about a font resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontFaceRecord {
    /// Primary family name; empty when the rule has no `font-family`.
    pub family: String,
    /// Resolved `src` URL; empty when the rule has no usable `src`.
    pub url: String,
    /// `format()` hint of the `src` URL.
    pub format: Option<String>,
    /// Names from `local()` entries.
    pub local: Vec<String>,
    /// Verbatim `unicode-range` value.
    pub unicode_range: Option<String>,
    /// URL of the stylesheet this rule was read from.
    pub stylesheet: String,
    /// Remaining descriptors (`font-weight`, `font-style`, ...), serialized.
    pub descriptors: BTreeMap<String, String>,
}

impl FontFaceRecord {
    /// Build a record from a `@font-face` rule read from `stylesheet`.
    pub fn from_rule(rule: &AtRule, stylesheet: &str) -> Self {
        let declarations = Declarations::parse(rule.content.as_deref().unwrap_or_default());
        let family = declarations.get("font-family").and_then(|d| d.family()).unwrap_or_else(|| {
            tracing::warn!(stylesheet, "@font-face rule without font-family");
            String::new()
        });
        let src = declarations.get("src").and_then(|d| d.src()).cloned().unwrap_or_default();
        let url = match src.url.as_deref() {
            Some(url) => resolve_url(stylesheet, url),
            None => {
                tracing::warn!(stylesheet, family = %family, "@font-face rule without src url");
                String::new()
            },
        };
        let descriptors = declarations.iter().filter_map(|(name, d)| Some((name.to_string(), d.text()?))).collect();
        Self {
            family,
            url,
            format: src.format,
            local: src.local,
            unicode_range: declarations.get("unicode-range").and_then(|d| d.unicode_range()),
            stylesheet: stylesheet.to_string(),
            descriptors,
        }
    }
}

/// Resolve `value` against the URL of the stylesheet it appeared in.
///
/// Values with a scheme or a leading `/` are kept as-is. Anything else is
/// appended to the stylesheet URL truncated after its last `/`; `../` and
/// query strings are not interpreted.
pub fn resolve_url(stylesheet: &str, value: &str) -> String {
    if value.is_empty() || value.starts_with('/') || url::Url::parse(value).is_ok() {
        return value.to_string();
    }
    match stylesheet.rfind('/') {
        Some(idx) => format!("{}{}", &stylesheet[..=idx], value),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("file:/x/y.css", "foo.woff2", "file:/x/foo.woff2")]
    #[case("https://host/css/fonts.css", "f/a.ttf", "https://host/css/f/a.ttf")]
    #[case("https://host/css/fonts.css", "../a.ttf", "https://host/css/../a.ttf")]
    #[case("https://host/css/fonts.css", "/abs/a.ttf", "/abs/a.ttf")]
    #[case("https://host/css/fonts.css", "https://cdn/a.ttf", "https://cdn/a.ttf")]
    #[case("https://host/css/fonts.css", "data:font/woff2;base64,AAAA", "data:font/woff2;base64,AAAA")]
    #[case("fonts.css", "a.ttf", "a.ttf")]
    #[case("file:/x/y.css", "", "")]
    fn test_resolve_url(#[case] stylesheet: &str, #[case] value: &str, #[case] expected: &str) {
        assert_eq!(resolve_url(stylesheet, value), expected);
    }
}

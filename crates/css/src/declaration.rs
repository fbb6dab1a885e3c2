//! Declaration lists inside an at-rule body.
//!
//! Each `name: value` group is found by splitting the body on top-level `;`
//! literals. The value tokens are then fed one at a time into an
//! [`Accumulator`] picked by declaration name, which interprets them.

use crate::token::Token;
use std::collections::BTreeMap;

/// Split a rule body into declaration groups on top-level `;` literals.
///
/// Whitespace tokens are dropped. Nested blocks are not looked into. A final
/// group without a closing `;` is still returned, as the last declaration in
/// a block usually leaves it out.
pub fn split_declarations(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token.is_whitespace() {
            continue;
        }
        if token.is_literal(";") {
            groups.push(std::mem::take(&mut current));
        } else {
            current.push(token.clone());
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Interpreted value of the `src` descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Src {
    pub url: Option<String>,
    pub format: Option<String>,
    pub local: Vec<String>,
}

/// Per-declaration token consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// `first_ended` is set at the first comma after an identifier, so only
    /// the first unquoted name of a family list is kept.
    FontFamily { strings: Vec<String>, idents: Vec<String>, first_ended: bool },
    Src { src: Src, extra_urls: usize },
    UnicodeRange(Vec<String>),
    Generic(Vec<Token>),
}

impl Accumulator {
    pub fn for_name(name: &str) -> Self {
        match name {
            "font-family" => Self::FontFamily { strings: Vec::new(), idents: Vec::new(), first_ended: false },
            "src" => Self::Src { src: Src::default(), extra_urls: 0 },
            "unicode-range" => Self::UnicodeRange(Vec::new()),
            _ => Self::Generic(Vec::new()),
        }
    }

    pub fn feed(&mut self, token: Token) {
        match self {
            Self::FontFamily { strings, idents, first_ended } => match token {
                Token::String(s) => strings.push(s),
                Token::Ident(i) if !*first_ended => idents.push(i),
                t if t.is_literal(",") && !idents.is_empty() => *first_ended = true,
                _ => {},
            },
            Self::Src { src, extra_urls } => feed_src(src, extra_urls, token),
            Self::UnicodeRange(values) => {
                if !matches!(token, Token::Whitespace | Token::Literal(_)) {
                    values.push(token.to_string());
                }
            },
            Self::Generic(tokens) => {
                if !matches!(token, Token::Whitespace | Token::Literal(_)) {
                    tokens.push(token);
                }
            },
        }
    }

    /// Family name: quoted strings when present, otherwise the identifiers of
    /// the first unquoted name.
    pub fn family(&self) -> Option<String> {
        match self {
            Self::FontFamily { strings, .. } if !strings.is_empty() => Some(strings.join(" ")),
            Self::FontFamily { idents, .. } if !idents.is_empty() => Some(idents.join(" ")),
            _ => None,
        }
    }

    pub fn src(&self) -> Option<&Src> {
        match self {
            Self::Src { src, .. } => Some(src),
            _ => None,
        }
    }

    pub fn unicode_range(&self) -> Option<String> {
        match self {
            Self::UnicodeRange(values) if !values.is_empty() => Some(values.join(", ")),
            _ => None,
        }
    }

    /// Serialized value of any other declaration.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Generic(tokens) => Some(tokens.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")),
            _ => None,
        }
    }
}

fn feed_src(src: &mut Src, extra_urls: &mut usize, token: Token) {
    match token {
        Token::Url(url) if src.url.is_none() => src.url = Some(url),
        Token::Url(url) => {
            *extra_urls += 1;
            tracing::debug!(%url, "ignoring additional src url");
        },
        // A format() hint only describes the url it follows.
        Token::Function { name, arguments } if *extra_urls == 0 => match name.to_ascii_lowercase().as_str() {
            "format" => {
                if src.format.is_none() {
                    src.format = function_argument(&arguments);
                }
            },
            "local" => src.local.extend(function_argument(&arguments)),
            _ => tracing::warn!(function = %name, "unknown function in src descriptor"),
        },
        Token::Function { .. } | Token::Whitespace | Token::Literal(_) => {},
        other => tracing::warn!(token = %other, "unexpected token in src descriptor"),
    }
}

/// First string argument, or space-joined identifiers for unquoted values
/// such as `local(Foo Bar)`.
fn function_argument(arguments: &[Token]) -> Option<String> {
    if let Some(s) = arguments.iter().find_map(|t| match t {
        Token::String(s) => Some(s.clone()),
        _ => None,
    }) {
        return Some(s);
    }
    let idents: Vec<&str> = arguments
        .iter()
        .filter_map(|t| match t {
            Token::Ident(i) => Some(i.as_str()),
            _ => None,
        })
        .collect();
    (!idents.is_empty()).then(|| idents.join(" "))
}

/// All declarations of one rule, keyed by lowercased name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    map: BTreeMap<String, Accumulator>,
}

impl Declarations {
    /// Interpret a rule body.
    ///
    /// Per group the first identifier is the declaration name and everything
    /// up to and including the first `:` is skipped. A name that shows up a
    /// second time in the same rule is ignored.
    pub fn parse(content: &[Token]) -> Self {
        let mut map = BTreeMap::new();
        for group in split_declarations(content) {
            let mut tokens = group.into_iter();
            let Some(name) = tokens.by_ref().find_map(|t| match t {
                Token::Ident(name) => Some(name.to_ascii_lowercase()),
                _ => None,
            }) else {
                continue;
            };
            if map.contains_key(&name) {
                tracing::debug!(declaration = %name, "ignoring repeated declaration");
                continue;
            }
            let mut acc = Accumulator::for_name(&name);
            if tokens.by_ref().any(|t| t.is_literal(":")) {
                tokens.for_each(|t| acc.feed(t));
            }
            map.insert(name, acc);
        }
        Self { map }
    }

    pub fn get(&self, name: &str) -> Option<&Accumulator> {
        self.map.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Accumulator)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

use crate::token::{Token, tokenize};
use cssparser::{Parser, ParserInput};
use std::borrow::Cow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One `@keyword prelude { content }` (or `@keyword prelude;`) rule.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Lowercased keyword, without the `@`.
    pub name: String,
    pub prelude: Vec<Token>,
    /// `None` for statement at-rules such as `@import "x.css";`.
    pub content: Option<Vec<Token>>,
}

/// Top-level rules of a stylesheet. Qualified (style) rules are of no
/// interest and are skipped entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<AtRule>,
}

impl Stylesheet {
    /// Tokenize stylesheet bytes.
    ///
    /// A leading UTF-8 byte order mark is ignored and invalid UTF-8 sequences
    /// become U+FFFD. The tokenizer never fails: garbage simply ends up as
    /// tokens nobody asks for.
    pub fn parse(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = String::from_utf8_lossy(bytes);
        if let Cow::Owned(_) = text {
            let valid_up_to = std::str::from_utf8(bytes).err().map_or(0, |e| e.valid_up_to());
            tracing::warn!(valid_up_to, "stylesheet is not valid UTF-8, replacing invalid bytes");
        }
        let mut input = ParserInput::new(&text);
        let mut parser = Parser::new(&mut input);
        Self { rules: group_rules(tokenize(&mut parser)) }
    }

    /// At-rules named `name` (case-insensitive, without `@`), in source order.
    pub fn at_rules<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AtRule> + 'a {
        self.rules.iter().filter(move |rule| rule.name.eq_ignore_ascii_case(name.trim_start_matches('@')))
    }
}

fn group_rules(tokens: Vec<Token>) -> Vec<AtRule> {
    let mut rules = Vec::new();
    let mut current: Option<AtRule> = None;
    for token in tokens {
        let Some(rule) = current.as_mut() else {
            // Anything else at the top level belongs to a qualified rule.
            if let Token::AtKeyword(name) = token {
                current = Some(AtRule { name: name.to_ascii_lowercase(), prelude: Vec::new(), content: None });
            }
            continue;
        };
        match token {
            Token::Block { open: '{', content } => {
                rule.content = Some(content);
                rules.extend(current.take());
            },
            t if t.is_literal(";") => rules.extend(current.take()),
            t => rule.prelude.push(t),
        }
    }
    // Unterminated statement at-rule at end of input.
    rules.extend(current);
    rules
}
